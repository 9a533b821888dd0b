//! Database row types, mapped directly from SQLite rows.
//! Distinct from citygdp-types models so the password hash stays in this crate.
use std::fmt;

use citygdp_types::models::Account;

pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

impl fmt::Debug for AccountRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRow")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl AccountRow {
    /// Public view of the row, without the hash.
    pub fn to_account(&self) -> Account {
        Account {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug)]
pub struct FeedbackRow {
    pub id: i64,
    pub username: String,
    pub rating: u8,
    pub feedback: String,
    pub contact_email: Option<String>,
    pub created_at: String,
}
