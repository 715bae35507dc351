use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::{JwksError, JwksResult};

const SUPPORTED_ALG: &str = "RS256";

/// Public RSA signing key published by the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub kid: String,
    pub kty: String,
    /// The `use` member, usually `sig`.
    pub usage: Option<String>,
    /// Base64url-encoded RSA modulus.
    pub modulus: String,
    /// Base64url-encoded RSA exponent.
    pub exponent: String,
}

impl SigningKey {
    pub fn rsa(
        kid: impl Into<String>,
        modulus: impl Into<String>,
        exponent: impl Into<String>,
    ) -> Self {
        Self {
            kid: kid.into(),
            kty: "RSA".to_string(),
            usage: Some("sig".to_string()),
            modulus: modulus.into(),
            exponent: exponent.into(),
        }
    }
}

/// Keys in document order. Lookups return the first entry with a matching kid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<SigningKey>,
}

impl KeySet {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SigningKey> {
        self.keys.iter()
    }

    /// Parse a JWKS document, skipping entries that can never verify an RS256 token.
    pub fn from_document(body: &[u8]) -> JwksResult<Self> {
        let document: JwksDocument =
            serde_json::from_slice(body).map_err(|err| JwksError::Decode(err.to_string()))?;

        let mut keys = Vec::with_capacity(document.keys.len());
        for entry in document.keys {
            let Some(kid) = entry.kid else {
                warn!("skipping JWKS entry without kid");
                continue;
            };
            let kty = entry.kty.unwrap_or_else(|| "RSA".to_string());
            if kty != "RSA" {
                warn!(kid, kty, "skipping JWKS entry with unsupported key type");
                continue;
            }
            if let Some(alg) = entry.alg.as_deref() {
                if alg != SUPPORTED_ALG {
                    warn!(kid, alg, "skipping JWKS entry with unsupported alg");
                    continue;
                }
            }
            let (Some(modulus), Some(exponent)) = (entry.n, entry.e) else {
                warn!(kid, "skipping JWKS entry missing RSA components");
                continue;
            };

            keys.push(SigningKey {
                kid,
                kty,
                usage: entry.usage,
                modulus,
                exponent,
            });
        }

        Ok(Self { keys })
    }
}

#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(Client::new(), url, timeout)
    }

    pub fn with_client(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> JwksResult<KeySet> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| JwksError::Fetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Status {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| JwksError::Fetch(err.to_string()))?;
        KeySet::from_document(&body)
    }
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    usage: Option<String>,
    n: Option<String>,
    e: Option<String>,
}
