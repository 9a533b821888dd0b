use thiserror::Error;
use tracing::{error, info, warn};

use citygdp_db::Database;
use citygdp_db::models::FeedbackRow;
use citygdp_types::models::Feedback;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("not logged in")]
    Unauthenticated,

    #[error("rating must be between 1 and 5")]
    InvalidRating,

    #[error("please provide feedback before submitting")]
    Empty,

    #[error("storage unavailable")]
    Storage(#[source] anyhow::Error),
}

impl FeedbackError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidRating | Self::Empty => "invalid_input",
            Self::Storage(_) => "internal",
        }
    }
}

/// Store feedback stamped with the session's username. Returns the new row id.
/// A blank contact email is stored as NULL.
pub fn submit(
    db: &Database,
    session: &Session,
    rating: u8,
    text: &str,
    contact_email: Option<&str>,
) -> Result<i64, FeedbackError> {
    let account = session.current().ok_or(FeedbackError::Unauthenticated)?;

    if !(1..=5).contains(&rating) {
        warn!("{} sent feedback with rating {}", account.username, rating);
        return Err(FeedbackError::InvalidRating);
    }
    if text.trim().is_empty() {
        return Err(FeedbackError::Empty);
    }

    let contact_email = contact_email.map(str::trim).filter(|e| !e.is_empty());

    let id = db
        .insert_feedback(&account.username, rating, text, contact_email)
        .map_err(|e| {
            error!("Feedback insert failed: {}", e);
            FeedbackError::Storage(e)
        })?;

    info!("Feedback {} from {} (rating {})", id, account.username, rating);
    Ok(id)
}

/// The session user's own feedback, newest first.
pub fn recent(db: &Database, session: &Session, limit: u32) -> Result<Vec<Feedback>, FeedbackError> {
    let account = session.current().ok_or(FeedbackError::Unauthenticated)?;

    let rows = db
        .list_feedback_for(&account.username, limit.min(100))
        .map_err(FeedbackError::Storage)?;

    Ok(rows.into_iter().map(to_feedback).collect())
}

fn to_feedback(row: FeedbackRow) -> Feedback {
    // SQLite stores "YYYY-MM-DD HH:MM:SS" without a zone; it is UTC.
    let created_at = chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on feedback {}: {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    Feedback {
        id: row.id,
        username: row.username,
        rating: row.rating,
        feedback: row.feedback,
        contact_email: row.contact_email,
        created_at,
    }
}
