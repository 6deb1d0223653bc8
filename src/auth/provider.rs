use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The signed-in account as the rest of the crate sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub uid: Uuid,
    pub email: String,
}

impl CurrentUser {
    /// "john.smith@x.com" greets as "John"; the part before the first '.'
    /// with its first letter upper-cased.
    pub fn display_name(&self) -> String {
        let first = self.email.split('.').next().unwrap_or_default();
        let mut chars = first.chars();
        match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid email or password. Please try again.")]
    InvalidCredential,

    #[error("Email already in use. Please use a different email.")]
    EmailAlreadyInUse,

    #[error("Invalid email format. Please enter a valid email.")]
    InvalidEmail,

    #[error("Password should be at least 6 characters long.")]
    WeakPassword,

    #[error("Please sign in again.")]
    Unauthenticated,

    #[error("identity backend failed: {0}")]
    Backend(String),
}

impl IdentityError {
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::InvalidCredential => "auth/invalid-credential",
            IdentityError::EmailAlreadyInUse => "auth/email-already-in-use",
            IdentityError::InvalidEmail => "auth/invalid-email",
            IdentityError::WeakPassword => "auth/weak-password",
            IdentityError::Unauthenticated => "auth/unauthenticated",
            IdentityError::Backend(_) => "auth/internal-error",
        }
    }
}

/// Account operations backed by whatever holds the credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<CurrentUser, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, IdentityError>;

    /// `Unauthenticated` when the account no longer exists.
    async fn find_user(&self, uid: Uuid) -> Result<CurrentUser, IdentityError>;

    async fn update_email(&self, uid: Uuid, new_email: &str) -> Result<CurrentUser, IdentityError>;

    /// Re-checks `current` before replacing the hash.
    async fn update_password(
        &self,
        uid: Uuid,
        current: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;
}
