use axum::extract::State;
use axum::Json;

use crate::auth::jwt;
use crate::auth::middleware::AuthUser;
use crate::client::ClientContext;
use crate::dto::*;
use crate::error::AppError;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    client: ClientContext,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let authenticated = state
        .login
        .attempt(&body, &client.addr, client.locale)
        .await
        .map_err(|e| AppError::from_auth(e, client.locale))?;

    let (token, expires_at) = jwt::create_token(
        &state.config.session.jwt_secret,
        state.config.session.jwt_ttl_hours,
        &authenticated.identity,
    )?;

    Ok(Json(LoginResponse::Authenticated {
        identity: authenticated.identity,
        token,
        expires_at,
    }))
}

/// Ends the session behind the bearer token. Safe to call more than once.
pub async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Json<serde_json::Value> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Ok(claims) = jwt::verify_token(&state.config.session.jwt_secret, token) {
            tracing::info!("Session ended for {} (jti: {})", claims.sub, claims.jti);
            state
                .revoked_sessions
                .revoke(claims.jti, claims.exp as u64);
        }
    }

    Json(serde_json::json!({ "success": true }))
}

pub async fn me(user: AuthUser) -> Json<MeResponse> {
    tracing::debug!("Session {} valid until {}", user.jti, user.exp);
    Json(MeResponse { identity: user.sub })
}
