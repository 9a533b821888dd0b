use tracing::info;

use citygdp_types::models::Account;

use crate::accounts::{AuthError, Authenticator};

/// Authentication state of one client connection.
///
/// Owned by the connection that created it and dropped with it; nothing is
/// persisted. Starts `Anonymous`. Only [`Session::login`] moves it to
/// `Authenticated`, only [`Session::logout`] moves it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(Account),
}

impl Session {
    pub fn new() -> Self {
        Self::Anonymous
    }

    /// Verify credentials and, on success, switch to that account.
    ///
    /// On failure the session is left exactly as it was, whether anonymous or
    /// already logged in, and the error is handed back to the caller.
    pub fn login<A>(&mut self, authenticator: &A, email: &str, password: &str) -> Result<Account, AuthError>
    where
        A: Authenticator + ?Sized,
    {
        let account = authenticator.authenticate(email, password)?;
        *self = Self::Authenticated(account.clone());
        Ok(account)
    }

    /// Always succeeds. Returns the account that was logged in, if any.
    pub fn logout(&mut self) -> Option<Account> {
        match std::mem::take(self) {
            Self::Authenticated(account) => {
                info!("Account {} ({}) logged out", account.id, account.username);
                Some(account)
            }
            Self::Anonymous => None,
        }
    }

    pub fn current(&self) -> Option<&Account> {
        match self {
            Self::Authenticated(account) => Some(account),
            Self::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Gate for authenticated-only features.
    pub fn require(&self) -> Result<&Account, AuthError> {
        self.current().ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::accounts;

    /// Accepts exactly one email/password pair.
    struct Fixed(Account, &'static str, &'static str);

    impl Authenticator for Fixed {
        fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
            if email == self.1 && password == self.2 {
                Ok(self.0.clone())
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn dan() -> Fixed {
        Fixed(
            Account {
                id: 7,
                username: "dan".into(),
                email: "d@x.com".into(),
            },
            "d@x.com",
            "secret",
        )
    }

    #[test]
    fn starts_anonymous() {
        let session = Session::new();
        assert_eq!(session, Session::Anonymous);
        assert!(!session.is_authenticated());
        assert!(matches!(session.require(), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn login_then_logout() {
        let auth = dan();
        let mut session = Session::new();

        let account = session.login(&auth, "d@x.com", "secret").unwrap();
        assert_eq!(account.id, 7);
        assert_eq!(session.current().map(|a| a.id), Some(7));
        assert_eq!(session.require().unwrap().username, "dan");

        assert_eq!(session.logout().map(|a| a.id), Some(7));
        assert_eq!(session, Session::Anonymous);
    }

    #[test]
    fn failed_login_stays_anonymous() {
        let auth = dan();
        let mut session = Session::new();

        let err = session.login(&auth, "d@x.com", "wrong").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(session, Session::Anonymous);
    }

    #[test]
    fn failed_login_keeps_existing_identity() {
        let auth = dan();
        let mut session = Session::new();
        session.login(&auth, "d@x.com", "secret").unwrap();

        assert!(session.login(&auth, "d@x.com", "wrong").is_err());
        assert_eq!(session.current().map(|a| a.id), Some(7));
    }

    #[test]
    fn logout_when_anonymous_is_noop() {
        let mut session = Session::new();
        assert!(session.logout().is_none());
        assert_eq!(session, Session::Anonymous);
    }

    #[test]
    fn sessions_are_independent() {
        let accounts = accounts();
        accounts.register("dan", "d@x.com", "secret").unwrap();

        let mut first = Session::new();
        let second = Session::new();
        first.login(&accounts, "d@x.com", "secret").unwrap();

        assert!(first.is_authenticated());
        assert!(!second.is_authenticated());
    }
}
