use serde::Serialize;

/// Local user record, keyed by the identity provider pair.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Local identifier, assigned by the store on first sign-in and stable
    /// for the lifetime of the record.
    pub id: String,
    /// Identity provider name, e.g. "github"
    pub provider: String,
    /// Subject id assigned by the provider; unique together with `provider`
    #[serde(rename = "providerId")]
    pub provider_id: String,
    /// Display name, overwritten on every sign-in
    pub name: String,
    /// Avatar URL, overwritten on every sign-in
    pub avatar: String,
    /// Role string, "user" unless changed out of band. Never touched by
    /// sign-in updates.
    pub group: String,
    /// Milliseconds since epoch, set once at creation
    pub member_since: i64,
    /// Milliseconds since epoch, updated on every sign-in
    pub last_login: i64,
}

/// Field set persisted when a user is first created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    pub avatar: String,
    pub group: String,
    pub member_since: i64,
    pub last_login: i64,
}

/// Field set persisted on a repeat sign-in. Everything else on the row
/// (id, provider pair, group, member_since) stays untouched.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub avatar: String,
    pub last_login: i64,
}

/// Public view of a user, served to anyone. Provider identity and
/// timestamps stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        PublicProfile {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}
