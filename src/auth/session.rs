use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::validate::{self, confirmation};
use super::{CurrentUser, IdentityProvider};
use crate::error::AppError;

/// A signed-in (or signed-out) client session over an identity provider.
/// Views subscribe to `changes()` to react to sign in and sign out.
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<Option<CurrentUser>>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(None);
        Self { provider, state }
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state.borrow().clone()
    }

    pub fn changes(&self) -> watch::Receiver<Option<CurrentUser>> {
        self.state.subscribe()
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<CurrentUser, AppError> {
        let email = validate::normalize_email(email);
        validate::credentials(&email, password)?;
        let user = self.provider.sign_up(&email, password).await?;
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AppError> {
        let email = validate::normalize_email(email);
        validate::credentials(&email, password)?;
        let user = self.provider.sign_in(&email, password).await?;
        info!(user_id = %user.uid, "session signed in");
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.state.send_replace(None) {
            info!(user_id = %user.uid, "session signed out");
        }
    }

    pub async fn change_email(&self, new_email: &str, confirm: &str) -> Result<CurrentUser, AppError> {
        let user = self.current_user().ok_or(AppError::AuthRequired)?;
        let new_email = validate::normalize_email(new_email);
        confirmation(&new_email, &validate::normalize_email(confirm), "Email")?;
        let updated = self.provider.update_email(user.uid, &new_email).await?;
        self.state.send_replace(Some(updated.clone()));
        Ok(updated)
    }

    pub async fn change_password(
        &self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AppError> {
        let user = self.current_user().ok_or(AppError::AuthRequired)?;
        confirmation(new_password, confirm, "Password")?;
        self.provider
            .update_password(user.uid, current, new_password)
            .await?;
        Ok(())
    }
}
