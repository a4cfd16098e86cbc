use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use riskreg_core::{AuthError, Field, FieldErrors, Locale};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    /// Field-keyed rejection of a login form (422).
    Validation { message: String, errors: FieldErrors },
    /// Login lockout (429).
    Throttled {
        message: String,
        errors: FieldErrors,
        retry_after: u64,
        retry_after_minutes: u64,
    },
    Auth(String),
    Unavailable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_minutes: Option<u64>,
}

impl AppError {
    /// Maps a login failure onto the response shown to the user, in `locale`.
    pub fn from_auth(err: AuthError, locale: Locale) -> Self {
        match err {
            AuthError::FieldValidation(errors) => AppError::Validation {
                message: locale.invalid_fields().to_string(),
                errors,
            },
            AuthError::CredentialRejected => AppError::Validation {
                message: locale.failed().to_string(),
                errors: FieldErrors::single(Field::Identity, locale.failed()),
            },
            AuthError::Throttled { seconds, minutes } => {
                let message = locale.throttle(seconds, minutes);
                AppError::Throttled {
                    errors: FieldErrors::single(Field::Identity, message.clone()),
                    message,
                    retry_after: seconds,
                    retry_after_minutes: minutes,
                }
            }
            AuthError::ExternalService(detail) => {
                tracing::error!("Credential directory unavailable: {detail}");
                AppError::Unavailable(locale.service_unavailable().to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_header = None;
        let (status, body) = match self {
            AppError::Validation { message, errors } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    success: false,
                    error: message,
                    errors: Some(errors),
                    retry_after: None,
                    retry_after_minutes: None,
                },
            ),
            AppError::Throttled {
                message,
                errors,
                retry_after,
                retry_after_minutes,
            } => {
                retry_header = Some(retry_after);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    ErrorBody {
                        success: false,
                        error: message,
                        errors: Some(errors),
                        retry_after: Some(retry_after),
                        retry_after_minutes: Some(retry_after_minutes),
                    },
                )
            }
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, plain(msg)),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, plain(msg)),
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    plain("Internal server error".to_string()),
                )
            }
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_header {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

fn plain(error: String) -> ErrorBody {
    ErrorBody {
        success: false,
        error,
        errors: None,
        retry_after: None,
        retry_after_minutes: None,
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", e);
        AppError::Internal("Internal server error".to_string())
    }
}
