use crate::Database;
use crate::models::{AccountRow, FeedbackRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreateAccountError {
    /// Username or email already taken. Which one is not reported.
    #[error("username or email already registered")]
    Duplicate,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl Database {
    // -- Accounts --

    /// Insert a new account. The UNIQUE constraints on `username` and `email`
    /// are the only uniqueness check: the statement either commits a full row
    /// or fails as a whole, so concurrent signups with the same email cannot
    /// both succeed.
    pub fn insert_account(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountRow, CreateAccountError> {
        self.with_conn(|conn| Ok(insert_account_row(conn, username, email, password_hash)))?
    }

    /// Exact match on the stored email. Comparison is case-sensitive:
    /// `A@x.com` does not find `a@x.com`.
    pub fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, email, password_hash, created_at FROM accounts WHERE email = ?1",
                    [email],
                    map_account_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, email, password_hash, created_at FROM accounts WHERE id = ?1",
                    [id],
                    map_account_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn count_accounts(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
        })
    }

    // -- Feedback --

    pub fn insert_feedback(
        &self,
        username: &str,
        rating: u8,
        feedback: &str,
        contact_email: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (username, rating, feedback, contact_email) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![username, rating, feedback, contact_email],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first.
    pub fn list_feedback_for(&self, username: &str, limit: u32) -> Result<Vec<FeedbackRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, rating, feedback, contact_email, created_at
                 FROM feedback
                 WHERE username = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![username, limit], |row| {
                    Ok(FeedbackRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        rating: row.get(2)?,
                        feedback: row.get(3)?,
                        contact_email: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn insert_account_row(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<AccountRow, CreateAccountError> {
    let res = conn.query_row(
        "INSERT INTO accounts (username, email, password_hash) VALUES (?1, ?2, ?3)
         RETURNING id, username, email, password_hash, created_at",
        (username, email, password_hash),
        map_account_row,
    );

    match res {
        Ok(row) => Ok(row),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(CreateAccountError::Duplicate)
        }
        Err(e) => Err(CreateAccountError::Storage(e.into())),
    }
}

fn map_account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}
