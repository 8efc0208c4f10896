use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::models::message::{Message, NewMessage};
use crate::models::user::{NewUser, ProfileUpdate, User};

/// SQLite-backed store for users and messages.
///
/// The `users` table carries a uniqueness constraint on the provider
/// identity pair; it is the only thing standing between two concurrent
/// first sign-ins and a duplicated user, so it is part of the schema, not
/// an application-level check.
pub struct Store {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Provider identity already registered")]
    DuplicateIdentity,
    #[error("Inserted row could not be read back")]
    InsertReadback,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl Store {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                name TEXT NOT NULL,
                avatar TEXT NOT NULL,
                \"group\" TEXT NOT NULL DEFAULT 'user',
                member_since INTEGER NOT NULL,
                last_login INTEGER NOT NULL,
                UNIQUE (provider, provider_id)
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                author_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL,
                FOREIGN KEY (author_id) REFERENCES users(id)
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_author_id ON messages(author_id)",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created)",
            [],
        )
        .map_err(db_err)?;

        tracing::info!("Store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))
    }

    // ---- users ----

    pub fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, provider, provider_id, name, avatar, \"group\", member_since, last_login
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(db_err)
    }

    pub fn find_user_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, provider, provider_id, name, avatar, \"group\", member_since, last_login
             FROM users WHERE provider = ?1 AND provider_id = ?2",
            params![provider, provider_id],
            row_to_user,
        )
        .optional()
        .map_err(db_err)
    }

    pub fn insert_user(&self, user: &NewUser) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO users (id, provider, provider_id, name, avatar, \"group\", member_since, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.provider,
                user.provider_id,
                user.name,
                user.avatar,
                user.group,
                user.member_since,
                user.last_login,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) => {
                Err(StoreError::DuplicateIdentity)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    /// Applies the repeat-sign-in field set. Id, provider pair, group and
    /// member_since are not part of the statement.
    pub fn update_user_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET name = ?1, avatar = ?2, last_login = ?3 WHERE id = ?4",
            params![update.name, update.avatar, update.last_login, id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ---- messages ----

    pub fn find_message(&self, id: &str) -> Result<Option<Message>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, author_id, content, created, updated FROM messages WHERE id = ?1",
            params![id],
            row_to_message,
        )
        .optional()
        .map_err(db_err)
    }

    pub fn list_messages(
        &self,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Message>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, author_id, content, created, updated FROM messages
                 ORDER BY created LIMIT ?1 OFFSET ?2",
            )
            .map_err(db_err)?;
        // A negative LIMIT means unlimited in SQLite
        let rows = stmt
            .query_map(params![limit.unwrap_or(-1), skip.unwrap_or(0)], row_to_message)
            .map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    pub fn insert_message(&self, message: &NewMessage) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (id, author_id, content, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.author_id,
                message.content,
                message.created,
                message.updated,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Single filtered existence check: the message exists and is owned by
    /// the given author.
    pub fn is_author(&self, message_id: &str, author_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1 AND author_id = ?2)",
            params![message_id, author_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n != 0)
        .map_err(db_err)
    }

    /// Owner-filtered update. Returns false when no row matched, which
    /// covers both a missing message and an ownership mismatch.
    pub fn update_message_content(
        &self,
        message_id: &str,
        author_id: &str,
        content: &str,
        updated: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE messages SET content = ?1, updated = ?2 WHERE id = ?3 AND author_id = ?4",
                params![content, updated, message_id, author_id],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Owner-filtered delete. Returns false when no row matched.
    pub fn delete_message(&self, message_id: &str, author_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM messages WHERE id = ?1 AND author_id = ?2",
                params![message_id, author_id],
            )
            .map_err(db_err)?;
        Ok(deleted > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        provider: row.get(1)?,
        provider_id: row.get(2)?,
        name: row.get(3)?,
        avatar: row.get(4)?,
        group: row.get(5)?,
        member_since: row.get(6)?,
        last_login: row.get(7)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        author_id: row.get(1)?,
        content: row.get(2)?,
        created: row.get(3)?,
        updated: row.get(4)?,
    })
}
