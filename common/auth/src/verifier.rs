use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::claims::ClaimSet;
use crate::error::{AuthError, AuthResult};
use crate::jwks::SigningKey;

/// Tokens above this size are rejected before any decoding.
pub const MAX_TOKEN_BYTES: usize = 8 * 1024;

/// The only signing algorithm accepted. The token header never selects the algorithm.
const ACCEPTED_ALGORITHMS: [Algorithm; 1] = [Algorithm::RS256];

/// Checks signatures and the standard exp/nbf/iss/aud claims. Holds no shared state.
#[derive(Debug, Clone, Default)]
pub struct ClaimsVerifier {
    leeway_seconds: u64,
}

impl ClaimsVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn verify(
        &self,
        token: &str,
        key: &SigningKey,
        expected_audience: &str,
        expected_issuer: &str,
    ) -> AuthResult<ClaimSet> {
        self.verify_at(
            token,
            key,
            expected_audience,
            expected_issuer,
            Utc::now().timestamp(),
        )
    }

    /// Same as [`ClaimsVerifier::verify`] with an explicit clock (unix seconds).
    pub fn verify_at(
        &self,
        token: &str,
        key: &SigningKey,
        expected_audience: &str,
        expected_issuer: &str,
        now: i64,
    ) -> AuthResult<ClaimSet> {
        let header = parse_header(token)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::InvalidSignature(format!(
                "algorithm {:?} is not accepted",
                header.alg
            )));
        }

        let decoding_key = DecodingKey::from_rsa_components(&key.modulus, &key.exponent)
            .map_err(|err| {
                AuthError::InvalidSignature(format!("unusable key '{}': {err}", key.kid))
            })?;

        // Signature only; claim checks below run in a fixed order.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(token, &decoding_key, &validation)
            .map_err(map_decode_error)?;
        let claims = ClaimSet::new(data.claims);

        self.check_claims(&claims, expected_audience, expected_issuer, now)?;
        debug!(kid = %key.kid, "verified token successfully");
        Ok(claims)
    }

    fn check_claims(
        &self,
        claims: &ClaimSet,
        expected_audience: &str,
        expected_issuer: &str,
        now: i64,
    ) -> AuthResult<()> {
        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);

        let exp = claims
            .timestamp("exp")
            .ok_or_else(|| AuthError::InvalidClaims("missing or non-numeric exp".into()))?;
        if now >= exp.saturating_add(leeway) {
            return Err(AuthError::Expired);
        }

        if claims.get("nbf").is_some() {
            let nbf = claims
                .timestamp("nbf")
                .ok_or_else(|| AuthError::InvalidClaims("non-numeric nbf".into()))?;
            if now.saturating_add(leeway) < nbf {
                return Err(AuthError::InvalidClaims("token is not valid yet".into()));
            }
        }

        if claims.issuer() != Some(expected_issuer) {
            return Err(AuthError::InvalidClaims(
                "issuer does not match; check audience and issuer".into(),
            ));
        }

        if !claims.audience().contains(&expected_audience) {
            return Err(AuthError::InvalidClaims(
                "audience does not match; check audience and issuer".into(),
            ));
        }

        Ok(())
    }
}

/// Decode the unverified header after structural checks.
pub fn parse_header(token: &str) -> AuthResult<Header> {
    if token.len() > MAX_TOKEN_BYTES {
        return Err(AuthError::MalformedToken(format!(
            "token exceeds {MAX_TOKEN_BYTES} bytes"
        )));
    }
    if token.split('.').count() != 3 {
        return Err(AuthError::MalformedToken(
            "expected three dot-separated segments".into(),
        ));
    }
    decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::MalformedToken(err.to_string())
        }
        _ => AuthError::InvalidSignature(err.to_string()),
    }
}
