use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::validate::{email_format, normalize_email, password_strength};
use super::{CurrentUser, IdentityError, IdentityProvider};

struct Account {
    email: String,
    password_hash: String,
}

/// Accounts held in process. Used by the `memory` backend and by tests.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<Uuid, Account>> {
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn email_taken(accounts: &HashMap<Uuid, Account>, email: &str, except: Option<Uuid>) -> bool {
        accounts
            .iter()
            .any(|(uid, a)| a.email == email && Some(*uid) != except)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<CurrentUser, IdentityError> {
        let email = normalize_email(email);
        email_format(&email)?;
        password_strength(password)?;
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts();
        if Self::email_taken(&accounts, &email, None) {
            warn!(%email, "email already registered");
            return Err(IdentityError::EmailAlreadyInUse);
        }
        let uid = Uuid::new_v4();
        accounts.insert(
            uid,
            Account {
                email: email.clone(),
                password_hash,
            },
        );
        info!(user_id = %uid, %email, "account created");
        Ok(CurrentUser { uid, email })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, IdentityError> {
        let email = normalize_email(email);
        let found = self
            .accounts()
            .iter()
            .find(|(_, a)| a.email == email)
            .map(|(uid, a)| (*uid, a.password_hash.clone()));
        let (uid, hash) = found.ok_or(IdentityError::InvalidCredential)?;
        if !verify_password(password, &hash)? {
            warn!(user_id = %uid, "sign in with wrong password");
            return Err(IdentityError::InvalidCredential);
        }
        Ok(CurrentUser { uid, email })
    }

    async fn find_user(&self, uid: Uuid) -> Result<CurrentUser, IdentityError> {
        self.accounts()
            .get(&uid)
            .map(|a| CurrentUser {
                uid,
                email: a.email.clone(),
            })
            .ok_or(IdentityError::Unauthenticated)
    }

    async fn update_email(&self, uid: Uuid, new_email: &str) -> Result<CurrentUser, IdentityError> {
        let email = normalize_email(new_email);
        email_format(&email)?;

        let mut accounts = self.accounts();
        if Self::email_taken(&accounts, &email, Some(uid)) {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        let account = accounts.get_mut(&uid).ok_or(IdentityError::Unauthenticated)?;
        account.email = email.clone();
        info!(user_id = %uid, %email, "email updated");
        Ok(CurrentUser { uid, email })
    }

    async fn update_password(
        &self,
        uid: Uuid,
        current: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let hash = self
            .accounts()
            .get(&uid)
            .map(|a| a.password_hash.clone())
            .ok_or(IdentityError::Unauthenticated)?;
        if !verify_password(current, &hash)? {
            return Err(IdentityError::InvalidCredential);
        }
        password_strength(new_password)?;
        let new_hash = hash_password(new_password)?;

        let mut accounts = self.accounts();
        let account = accounts.get_mut(&uid).ok_or(IdentityError::Unauthenticated)?;
        account.password_hash = new_hash;
        info!(user_id = %uid, "password updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let ids = MemoryIdentity::new();
        let created = ids.sign_up(" Cook@Example.com ", "secret1").await.unwrap();
        assert_eq!(created.email, "cook@example.com");

        let signed_in = ids.sign_in("cook@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in, created);
        assert_eq!(ids.find_user(created.uid).await.unwrap(), created);
    }

    #[tokio::test]
    async fn sign_up_rejects_bad_input_and_duplicates() {
        let ids = MemoryIdentity::new();
        assert_eq!(
            ids.sign_up("nope", "secret1").await,
            Err(IdentityError::InvalidEmail)
        );
        assert_eq!(
            ids.sign_up("cook@example.com", "12345").await,
            Err(IdentityError::WeakPassword)
        );
        ids.sign_up("cook@example.com", "secret1").await.unwrap();
        assert_eq!(
            ids.sign_up("cook@example.com", "secret2").await,
            Err(IdentityError::EmailAlreadyInUse)
        );
    }

    #[tokio::test]
    async fn wrong_password_or_unknown_email_is_invalid_credential() {
        let ids = MemoryIdentity::new();
        ids.sign_up("cook@example.com", "secret1").await.unwrap();
        assert_eq!(
            ids.sign_in("cook@example.com", "secret2").await,
            Err(IdentityError::InvalidCredential)
        );
        assert_eq!(
            ids.sign_in("baker@example.com", "secret1").await,
            Err(IdentityError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn account_updates() {
        let ids = MemoryIdentity::new();
        let cook = ids.sign_up("cook@example.com", "secret1").await.unwrap();
        ids.sign_up("baker@example.com", "secret1").await.unwrap();

        assert_eq!(
            ids.update_email(cook.uid, "baker@example.com").await,
            Err(IdentityError::EmailAlreadyInUse)
        );
        let moved = ids.update_email(cook.uid, "chef@example.com").await.unwrap();
        assert_eq!(moved.email, "chef@example.com");

        assert_eq!(
            ids.update_password(cook.uid, "wrong1", "newsecret").await,
            Err(IdentityError::InvalidCredential)
        );
        ids.update_password(cook.uid, "secret1", "newsecret").await.unwrap();
        assert!(ids.sign_in("chef@example.com", "newsecret").await.is_ok());

        assert_eq!(
            ids.find_user(Uuid::nil()).await,
            Err(IdentityError::Unauthenticated)
        );
    }
}
