use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;
pub type JwksResult<T> = Result<T, JwksError>;

/// Terminal reasons a request fails authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no bearer token provided")]
    MissingToken,
    #[error("signing keys are not loaded; cannot validate token")]
    KeyStoreUnavailable,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("no signing key matches kid '{0}'")]
    UnknownKey(String),
    #[error("token signature is invalid: {0}")]
    InvalidSignature(String),
    #[error("token has expired")]
    Expired,
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// Machine-readable reason code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::KeyStoreUnavailable => "key_store_unavailable",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::UnknownKey(_) => "unknown_key",
            AuthError::InvalidSignature(_) => "invalid_signature",
            AuthError::Expired => "token_expired",
            AuthError::InvalidClaims(_) => "invalid_claims",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::KeyStoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Failures while loading the issuer's key document.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse JWKS response: {0}")]
    Decode(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let body = ErrorBody {
            code,
            message: self.to_string(),
        };

        let mut resp = (status, Json(body)).into_response();
        let headers = resp.headers_mut();
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        headers.insert("X-Error-Code", HeaderValue::from_static(code));
        resp
    }
}
