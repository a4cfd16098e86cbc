use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use riskreg_core::Locale;

use crate::error::AppError;
use crate::state::AppState;

/// Who is asking: the client address used for throttling and the display language.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub addr: String,
    pub locale: Locale,
}

impl FromRequestParts<AppState> for ClientContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ConnectInfo(peer) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Internal(format!("missing peer address: {e}")))?;

        let addr = if state.config.trust_forwarded_for {
            forwarded_for(&parts.headers).unwrap_or_else(|| peer.ip().to_string())
        } else {
            peer.ip().to_string()
        };

        let locale = parts
            .headers
            .get("accept-language")
            .and_then(|v| v.to_str().ok())
            .and_then(Locale::from_accept_language)
            .unwrap_or(state.config.login.locale);

        Ok(ClientContext { addr, locale })
    }
}

/// Left-most address of `X-Forwarded-For`, i.e. the original client.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| s.parse::<std::net::IpAddr>().is_ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(forwarded_for(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn forwarded_for_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(forwarded_for(&headers), None);
        assert_eq!(forwarded_for(&HeaderMap::new()), None);
    }
}
