use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CurrentUser, IdentityError};
use crate::{config::JwtConfig, error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        TokenKeys::new(&state.config.jwt)
    }
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: Duration::from_secs(config.ttl_minutes.max(0) as u64 * 60),
            refresh_ttl: Duration::from_secs(config.refresh_ttl_minutes.max(0) as u64 * 60),
        }
    }

    fn sign_with_kind(&self, user: &CurrentUser, kind: TokenKind) -> Result<String, IdentityError> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.uid,
            email: user.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| IdentityError::Backend(e.to_string()))?;
        debug!(user_id = %user.uid, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user: &CurrentUser) -> Result<String, IdentityError> {
        self.sign_with_kind(user, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user: &CurrentUser) -> Result<String, IdentityError> {
        self.sign_with_kind(user, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            IdentityError::Unauthenticated
        })?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, IdentityError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            warn!(expected = ?kind, got = ?claims.kind, "wrong token kind");
            return Err(IdentityError::Unauthenticated);
        }
        Ok(claims)
    }
}

/// The caller, taken from a `Bearer` access token.
pub struct AuthUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::AuthRequired)?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(AppError::AuthRequired)?;

        let claims = TokenKeys::from_ref(state).verify_kind(token, TokenKind::Access)?;
        Ok(AuthUser(CurrentUser {
            uid: claims.sub,
            email: claims.email,
        }))
    }
}
