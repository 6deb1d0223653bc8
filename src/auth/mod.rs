use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod jwt;
mod memory;
mod password;
mod provider;
mod repo;
mod session;
pub mod validate;

pub use jwt::{AuthUser, TokenKeys};
pub use memory::MemoryIdentity;
pub use provider::{CurrentUser, IdentityError, IdentityProvider};
pub use repo::PgIdentity;
pub use session::AuthSession;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
