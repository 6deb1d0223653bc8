use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::validate::{email_format, normalize_email, password_strength};
use super::{CurrentUser, IdentityError, IdentityProvider};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        CurrentUser {
            uid: user.id,
            email: user.email,
        }
    }
}

/// Accounts in the `users` table.
#[derive(Clone)]
pub struct PgIdentity {
    db: PgPool,
}

impl PgIdentity {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)
    }

    async fn find_by_id(&self, uid: Uuid) -> Result<User, IdentityError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?
        .ok_or(IdentityError::Unauthenticated)
    }
}

#[async_trait]
impl IdentityProvider for PgIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<CurrentUser, IdentityError> {
        let email = normalize_email(email);
        email_format(&email)?;
        password_strength(password)?;
        let hash = hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(&email)
        .bind(&hash)
        .fetch_one(&self.db)
        .await
        .map_err(unique_email)?;

        info!(user_id = %user.id, email = %user.email, "account created");
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, IdentityError> {
        let email = normalize_email(email);
        let Some(user) = self.find_by_email(&email).await? else {
            warn!(%email, "sign in with unknown email");
            return Err(IdentityError::InvalidCredential);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "sign in with wrong password");
            return Err(IdentityError::InvalidCredential);
        }
        Ok(user.into())
    }

    async fn find_user(&self, uid: Uuid) -> Result<CurrentUser, IdentityError> {
        Ok(self.find_by_id(uid).await?.into())
    }

    async fn update_email(&self, uid: Uuid, new_email: &str) -> Result<CurrentUser, IdentityError> {
        let email = normalize_email(new_email);
        email_format(&email)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET email = $2
            WHERE id = $1
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(uid)
        .bind(&email)
        .fetch_optional(&self.db)
        .await
        .map_err(unique_email)?
        .ok_or(IdentityError::Unauthenticated)?;

        info!(user_id = %uid, email = %user.email, "email updated");
        Ok(user.into())
    }

    async fn update_password(
        &self,
        uid: Uuid,
        current: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let user = self.find_by_id(uid).await?;
        if !verify_password(current, &user.password_hash)? {
            return Err(IdentityError::InvalidCredential);
        }
        password_strength(new_password)?;
        let hash = hash_password(new_password)?;

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(uid)
            .bind(&hash)
            .execute(&self.db)
            .await
            .map_err(backend)?;

        info!(user_id = %uid, "password updated");
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> IdentityError {
    error!(error = %e, "users query failed");
    IdentityError::Backend(e.to_string())
}

/// Unique violation on `users.email` becomes `EmailAlreadyInUse`.
fn unique_email(e: sqlx::Error) -> IdentityError {
    let duplicate = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505");
    if duplicate {
        IdentityError::EmailAlreadyInUse
    } else {
        backend(e)
    }
}
