use serde::Serialize;

/// A message on the board.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    /// Local id of the author, set once at creation from the authenticated
    /// caller and never changed afterwards.
    #[serde(rename = "authorId")]
    pub author_id: String,
    pub content: String,
    /// Milliseconds since epoch
    pub created: i64,
    /// Milliseconds since epoch, bumped on every content update
    pub updated: i64,
}

/// Field set persisted when a message is created.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub created: i64,
    pub updated: i64,
}
