use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderValue};

use crate::claims::ClaimSet;
use crate::error::AuthError;
use crate::guard::TokenGuard;

/// Claims of the authenticated caller, produced by the shared [`TokenGuard`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: ClaimSet,
    pub token: Option<String>,
}

impl AuthContext {
    pub fn subject(&self) -> Option<&str> {
        self.claims.subject()
    }

    pub fn into_claims(self) -> ClaimSet {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<TokenGuard>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = Arc::<TokenGuard>::from_ref(state);

        let token = parts.headers.get(AUTHORIZATION).and_then(parse_bearer);
        let claims = guard.authenticate(token.as_deref())?;

        Ok(Self { claims, token })
    }
}

/// A header that is not a usable `Bearer` credential counts as no token at all.
fn parse_bearer(value: &HeaderValue) -> Option<String> {
    let raw = value.to_str().ok()?.trim();
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}
