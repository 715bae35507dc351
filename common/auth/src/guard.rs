use tracing::{debug, warn};

use crate::claims::ClaimSet;
use crate::config::{GuardConfig, VerifyConfig};
use crate::error::{AuthError, AuthResult};
use crate::jwks::JwksFetcher;
use crate::key_store::KeyStore;
use crate::verifier::{parse_header, ClaimsVerifier};

#[derive(Clone)]
enum GuardMode {
    Verify {
        keys: KeyStore,
        verifier: ClaimsVerifier,
        audience: String,
        issuer: String,
    },
    Bypass,
}

/// Turns a raw bearer token into verified claims or a terminal [`AuthError`].
/// Each call is independent; the guard is shared across requests behind an `Arc`.
#[derive(Clone)]
pub struct TokenGuard {
    mode: GuardMode,
}

impl TokenGuard {
    pub fn new(
        keys: KeyStore,
        verifier: ClaimsVerifier,
        audience: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            mode: GuardMode::Verify {
                keys,
                verifier,
                audience: audience.into(),
                issuer: issuer.into(),
            },
        }
    }

    pub fn from_config(config: &VerifyConfig, keys: KeyStore) -> Self {
        Self::new(
            keys,
            ClaimsVerifier::new().with_leeway(config.leeway_seconds),
            config.audience.clone(),
            config.issuer(),
        )
    }

    /// Accepts every request as [`ClaimSet::synthetic`]. Local development only.
    pub fn bypass() -> Self {
        warn!("token guard running in BYPASS mode; all requests authenticate as a synthetic user");
        Self {
            mode: GuardMode::Bypass,
        }
    }

    /// Build the guard described by `config`, fetching signing keys when verifying.
    pub async fn initialize(config: &GuardConfig) -> Self {
        match config {
            GuardConfig::Bypass => Self::bypass(),
            GuardConfig::Verify(config) => {
                let fetcher = JwksFetcher::new(config.jwks_url(), config.fetch_timeout);
                let keys = KeyStore::initialize(fetcher).await;
                Self::from_config(config, keys)
            }
        }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self.mode, GuardMode::Bypass)
    }

    pub fn key_store(&self) -> Option<&KeyStore> {
        match &self.mode {
            GuardMode::Verify { keys, .. } => Some(keys),
            GuardMode::Bypass => None,
        }
    }

    pub fn authenticate(&self, raw_token: Option<&str>) -> AuthResult<ClaimSet> {
        let (keys, verifier, audience, issuer) = match &self.mode {
            GuardMode::Bypass => {
                debug!("bypass mode: returning synthetic identity");
                return Ok(ClaimSet::synthetic());
            }
            GuardMode::Verify {
                keys,
                verifier,
                audience,
                issuer,
            } => (keys, verifier, audience, issuer),
        };

        let result = verify_token(raw_token, keys, verifier, audience, issuer);

        if let Err(err) = &result {
            warn!(code = err.code(), error = %err, "rejected bearer token");
        }
        result
    }
}

fn verify_token(
    raw_token: Option<&str>,
    keys: &KeyStore,
    verifier: &ClaimsVerifier,
    audience: &str,
    issuer: &str,
) -> AuthResult<ClaimSet> {
    let token = raw_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let key_set = keys.key_set().ok_or(AuthError::KeyStoreUnavailable)?;

    let header = parse_header(token)?;
    let kid = header
        .kid
        .ok_or_else(|| AuthError::MalformedToken("token header has no kid".into()))?;
    let key = key_set
        .find(&kid)
        .ok_or_else(|| AuthError::UnknownKey(kid.clone()))?;

    verifier.verify(token, key, audience, issuer)
}
