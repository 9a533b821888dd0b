use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, info, warn};

use citygdp_crypto::password::{HashError, Hasher};
use citygdp_db::{CreateAccountError, Database};
use citygdp_types::models::Account;

/// Failures of signup, login and session-gated operations.
///
/// Display strings are safe to show to a client: none of them carries a
/// password, a hash, or the underlying storage error text.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username or email already registered")]
    Duplicate,

    /// Unknown email and wrong password are deliberately the same variant.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("not logged in")]
    Unauthenticated,

    #[error("storage unavailable")]
    Storage(#[source] anyhow::Error),

    #[error("password hashing failed")]
    Hashing(#[from] HashError),
}

impl AuthError {
    /// Stable machine-readable code for gateway and REST error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::Storage(_) | Self::Hashing(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Duplicate => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CreateAccountError> for AuthError {
    fn from(e: CreateAccountError) -> Self {
        match e {
            CreateAccountError::Duplicate => Self::Duplicate,
            CreateAccountError::Storage(e) => Self::Storage(e),
        }
    }
}

/// Credential check used to drive a [`Session`](crate::session::Session).
pub trait Authenticator {
    fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError>;
}

/// Account registrar and authenticator over the credential store.
///
/// Both operations block (Argon2 plus SQLite); call them from
/// `spawn_blocking` when on the async runtime.
pub struct Accounts {
    db: Arc<Database>,
    hasher: Hasher,
}

impl Accounts {
    pub fn new(db: Arc<Database>, hasher: Hasher) -> Self {
        Self { db, hasher }
    }

    /// Create an account. Uniqueness is decided by the store's insert alone;
    /// there is no lookup beforehand, so a rejected signup writes nothing.
    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<Account, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty"));
        }
        if email.trim().is_empty() {
            return Err(AuthError::InvalidInput("email must not be empty"));
        }

        let password_hash = self.hasher.hash(password)?;

        match self.db.insert_account(username, email, &password_hash) {
            Ok(row) => {
                info!("Registered account {} ({})", row.id, row.username);
                Ok(row.to_account())
            }
            Err(CreateAccountError::Duplicate) => {
                warn!("Signup rejected for '{}': username or email taken", username);
                Err(AuthError::Duplicate)
            }
            Err(e) => {
                error!("Signup failed: {}", e);
                Err(e.into())
            }
        }
    }
}

impl Authenticator for Accounts {
    fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let row = self.db.find_account_by_email(email).map_err(|e| {
            error!("Account lookup failed: {}", e);
            AuthError::Storage(e)
        })?;

        let Some(row) = row else {
            info!("Login failed: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &row.password_hash) {
            info!("Login failed: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        info!("Account {} ({}) authenticated", row.id, row.username);
        Ok(row.to_account())
    }
}
