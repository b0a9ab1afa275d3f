//! Sign-in and sign-up against a user directory.
//!
//! There is no backend, so Ticketdesk ships [`DemoDirectory`]: three fixed
//! demo accounts plus whatever is registered through sign-up while the
//! process runs. Anything that can check credentials can stand in for it
//! by implementing [`Authenticator`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use ticketdesk_model::{Role, User, UserId};
use ticketdesk_session::{Clock, SystemClock};

use crate::ids;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Errors from sign-in and sign-up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately doesn't say which.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account for {0} already exists")]
    EmailTaken(String),

    #[error("{0:?} is not a valid email address")]
    InvalidEmail(String),

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("name is required")]
    MissingName,
}

/// Details a new user provides at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Signup {
    /// Field checks that don't need the directory.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.trim().is_empty() {
            return Err(AuthError::MissingName);
        }
        if !looks_like_email(self.email.trim()) {
            return Err(AuthError::InvalidEmail(self.email.clone()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

/// Checks credentials and registers users.
///
/// `Send + Sync + 'static` so one directory can be shared by every task
/// for the life of the application.
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the user the credentials belong to.
    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<User, AuthError>> + Send;

    /// Creates an account and returns its user record.
    fn register(&self, signup: Signup) -> impl Future<Output = Result<User, AuthError>> + Send;
}

// ---------------------------------------------------------------------------
// DemoDirectory
// ---------------------------------------------------------------------------

struct Account {
    password: String,
    user: User,
}

/// In-memory directory seeded with the demo accounts.
///
/// | email               | password   | role     |
/// |---------------------|------------|----------|
/// | `admin@example.com` | `admin123` | admin    |
/// | `agent@example.com` | `agent123` | agent    |
/// | `user@example.com`  | `user123`  | customer |
///
/// Passwords are compared in plain text. This is a demo fixture, not a
/// credential store.
pub struct DemoDirectory {
    accounts: RwLock<HashMap<String, Account>>,
    clock: Arc<dyn Clock>,
}

impl DemoDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        let demo = [
            ("u1", "admin@example.com", "admin123", "Admin User", Role::Admin),
            ("u2", "agent@example.com", "agent123", "Support Agent", Role::Agent),
            ("u3", "user@example.com", "user123", "Demo Customer", Role::Customer),
        ];
        let accounts = demo
            .into_iter()
            .map(|(id, email, password, name, role)| {
                let user = User {
                    id: UserId::from(id),
                    email: email.to_string(),
                    name: name.to_string(),
                    role,
                    created_at: now,
                };
                (
                    email.to_string(),
                    Account {
                        password: password.to_string(),
                        user,
                    },
                )
            })
            .collect();

        Self {
            accounts: RwLock::new(accounts),
            clock,
        }
    }

    /// Number of known accounts, demo ones included.
    pub fn len(&self) -> usize {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        match accounts.get(&normalize_email(email)) {
            Some(account) if account.password == password => Ok(account.user.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn insert(&self, signup: Signup) -> Result<User, AuthError> {
        signup.validate()?;
        let email = normalize_email(&signup.email);

        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(&email) {
            return Err(AuthError::EmailTaken(email));
        }

        let now = self.clock.now_millis();
        let user = User {
            id: ids::new_user_id(now),
            email: email.clone(),
            name: signup.name.trim().to_string(),
            role: Role::Customer,
            created_at: now,
        };
        accounts.insert(
            email,
            Account {
                password: signup.password,
                user: user.clone(),
            },
        );
        tracing::info!(user_id = %user.id, "account registered");
        Ok(user)
    }
}

impl Default for DemoDirectory {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Authenticator for DemoDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.check(email, password)
    }

    async fn register(&self, signup: Signup) -> Result<User, AuthError> {
        self.insert(signup)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld`: something before the `@`, and a `.` after it with
/// something on both sides.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use ticketdesk_session::ManualClock;

    use super::*;

    fn directory() -> DemoDirectory {
        DemoDirectory::new(Arc::new(ManualClock::new(1_700_000_000_000)))
    }

    fn signup(name: &str, email: &str, password: &str) -> Signup {
        Signup {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_authenticate_demo_accounts() {
        let dir = directory();
        let admin = dir.authenticate("admin@example.com", "admin123").await.unwrap();
        let agent = dir.authenticate("agent@example.com", "agent123").await.unwrap();
        let user = dir.authenticate("user@example.com", "user123").await.unwrap();

        assert_eq!(admin.role, Role::Admin);
        assert_eq!(agent.role, Role::Agent);
        assert_eq!(user.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_authenticate_email_case_and_whitespace_ignored() {
        let dir = directory();
        let user = dir.authenticate("  Admin@Example.COM ", "admin123").await.unwrap();
        assert_eq!(user.id, UserId::from("u1"));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_rejected() {
        let dir = directory();
        let err = dir.authenticate("admin@example.com", "admin124").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email_rejected() {
        let dir = directory();
        let err = dir.authenticate("ghost@example.com", "admin123").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let dir = directory();
        let user = dir
            .register(signup(" Dana ", "Dana@Example.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(user.name, "Dana");
        assert_eq!(user.email, "dana@example.com");
        assert_eq!(user.role, Role::Customer);
        assert!(!user.id.as_str().contains('_'));
        assert_eq!(dir.len(), 4);

        let again = dir.authenticate("dana@example.com", "secret1").await.unwrap();
        assert_eq!(again, user);
    }

    #[tokio::test]
    async fn test_register_taken_email_rejected() {
        let dir = directory();
        let err = dir
            .register(signup("Imposter", "agent@example.com", "password"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailTaken("agent@example.com".into()));
    }

    #[test]
    fn test_signup_validate_rules() {
        assert_eq!(
            signup("  ", "a@b.co", "secret1").validate(),
            Err(AuthError::MissingName)
        );
        assert!(matches!(
            signup("A", "not-an-email", "secret1").validate(),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            signup("A", "a@nodot", "secret1").validate(),
            Err(AuthError::InvalidEmail(_))
        ));
        assert_eq!(
            signup("A", "a@b.co", "12345").validate(),
            Err(AuthError::WeakPassword { min: 6 })
        );
        assert_eq!(signup("A", "a@b.co", "123456").validate(), Ok(()));
    }

    #[test]
    fn test_looks_like_email_edges() {
        assert!(looks_like_email("a@b.c"));
        assert!(!looks_like_email("@b.c"));
        assert!(!looks_like_email("a@.c"));
        assert!(!looks_like_email("a@b."));
        assert!(!looks_like_email("a b@c.d"));
    }
}
