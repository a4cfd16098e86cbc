mod auth_handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/logout", post(auth_handlers::logout))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/me", get(auth_handlers::me))
}
