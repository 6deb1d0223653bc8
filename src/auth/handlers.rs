use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    AuthResponse, ChangeEmailRequest, ChangePasswordRequest, CredentialsRequest, PublicUser,
    RefreshRequest,
};
use super::jwt::{AuthUser, TokenKeys, TokenKind};
use super::validate::{self, confirmation};
use super::CurrentUser;
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/email", put(change_email))
        .route("/me/password", put(change_password))
}

fn token_pair(state: &AppState, user: &CurrentUser) -> Result<AuthResponse, AppError> {
    let keys = TokenKeys::from_ref(state);
    Ok(AuthResponse {
        access_token: keys.sign_access(user)?,
        refresh_token: keys.sign_refresh(user)?,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = validate::normalize_email(&payload.email);
    validate::credentials(&email, &payload.password)?;
    let user = state.identity.sign_up(&email, &payload.password).await?;
    info!(user_id = %user.uid, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(token_pair(&state, &user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = validate::normalize_email(&payload.email);
    validate::credentials(&email, &payload.password)?;
    let user = state.identity.sign_in(&email, &payload.password).await?;
    info!(user_id = %user.uid, "user logged in");
    Ok(Json(token_pair(&state, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = TokenKeys::from_ref(&state).verify_kind(&payload.refresh_token, TokenKind::Refresh)?;
    // the account may have changed email or been removed since the token was issued
    let user = state.identity.find_user(claims.sub).await?;
    Ok(Json(token_pair(&state, &user)?))
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.identity.find_user(user.uid).await?;
    Ok(Json((&user).into()))
}

#[instrument(skip(state, user, payload))]
pub async fn change_email(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangeEmailRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = validate::normalize_email(&payload.email);
    confirmation(&email, &validate::normalize_email(&payload.confirm_email), "Email")?;
    let updated = state.identity.update_email(user.uid, &email).await?;
    // tokens embed the email, so hand out a fresh pair
    Ok(Json(token_pair(&state, &updated)?))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    confirmation(&payload.password, &payload.confirm_password, "Password")?;
    state
        .identity
        .update_password(user.uid, &payload.current_password, &payload.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityError;

    fn creds(email: &str, password: &str) -> Json<CredentialsRequest> {
        Json(CredentialsRequest {
            email: email.into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn register_login_refresh() {
        let state = AppState::fake().await;
        let (status, Json(registered)) =
            register(State(state.clone()), creds("John.Smith@example.com", "secret1"))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered.user.email, "john.smith@example.com");
        assert_eq!(registered.user.display_name, "John");

        let Json(logged_in) = login(State(state.clone()), creds("john.smith@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let Json(refreshed) = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: logged_in.refresh_token,
            }),
        )
        .await
        .unwrap();
        assert_eq!(refreshed.user.id, registered.user.id);

        let err = refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: logged_in.access_token,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_errors_map_to_statuses() {
        let state = AppState::fake().await;
        let err = register(State(state.clone()), creds("", "")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = register(State(state.clone()), creds("cook@example.com", "123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Identity(IdentityError::WeakPassword)));

        register(State(state.clone()), creds("cook@example.com", "secret1"))
            .await
            .unwrap();
        let err = register(State(state), creds("cook@example.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn settings_change_email_and_password() {
        let state = AppState::fake().await;
        let (_, Json(auth)) = register(State(state.clone()), creds("cook@example.com", "secret1"))
            .await
            .unwrap();
        let me = CurrentUser {
            uid: auth.user.id,
            email: auth.user.email,
        };

        let err = change_email(
            State(state.clone()),
            AuthUser(me.clone()),
            Json(ChangeEmailRequest {
                email: "chef@example.com".into(),
                confirm_email: "cook@example.com".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let Json(moved) = change_email(
            State(state.clone()),
            AuthUser(me.clone()),
            Json(ChangeEmailRequest {
                email: "chef@example.com".into(),
                confirm_email: "Chef@example.com".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(moved.user.email, "chef@example.com");

        let status = change_password(
            State(state.clone()),
            AuthUser(me.clone()),
            Json(ChangePasswordRequest {
                current_password: "secret1".into(),
                password: "longer1".into(),
                confirm_password: "longer1".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(login(State(state.clone()), creds("chef@example.com", "longer1"))
            .await
            .is_ok());

        let Json(public) = get_me(State(state), AuthUser(me)).await.unwrap();
        assert_eq!(public.email, "chef@example.com");
        assert_eq!(public.display_name, "Chef@example");
    }
}
