use std::sync::{Arc, PoisonError, RwLock};

use tracing::{error, info, warn};

use crate::error::JwksResult;
use crate::jwks::{JwksFetcher, KeySet, SigningKey};

#[derive(Debug, Clone)]
enum Snapshot {
    Ready(Arc<KeySet>),
    Unavailable(Arc<str>),
}

/// Holds the issuer's signing keys. Published key sets are never mutated;
/// a refresh swaps in a new `Arc<KeySet>` so readers see the old or new set whole.
#[derive(Clone)]
pub struct KeyStore {
    state: Arc<RwLock<Snapshot>>,
    fetcher: Option<JwksFetcher>,
}

impl KeyStore {
    /// Fetch the key document once. A failed fetch leaves the store unavailable
    /// instead of returning an error so the guard can still be built and fail closed.
    pub async fn initialize(fetcher: JwksFetcher) -> Self {
        let snapshot = match fetcher.fetch().await {
            Ok(keys) => {
                if keys.is_empty() {
                    warn!(jwks_url = %fetcher.url(), "JWKS document contains no usable keys");
                } else {
                    info!(count = keys.len(), jwks_url = %fetcher.url(), "Loaded JWKS keys");
                }
                Snapshot::Ready(Arc::new(keys))
            }
            Err(err) => {
                error!(error = %err, jwks_url = %fetcher.url(), "Could not fetch JWKS; every token will be rejected");
                Snapshot::Unavailable(Arc::from(err.to_string()))
            }
        };

        Self {
            state: Arc::new(RwLock::new(snapshot)),
            fetcher: Some(fetcher),
        }
    }

    pub fn from_key_set(keys: KeySet) -> Self {
        Self {
            state: Arc::new(RwLock::new(Snapshot::Ready(Arc::new(keys)))),
            fetcher: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(Snapshot::Unavailable(Arc::from(reason.into())))),
            fetcher: None,
        }
    }

    pub fn fetcher(&self) -> Option<&JwksFetcher> {
        self.fetcher.as_ref()
    }

    /// Current key set, or `None` while unavailable.
    pub fn key_set(&self) -> Option<Arc<KeySet>> {
        match &*self.read() {
            Snapshot::Ready(keys) => Some(Arc::clone(keys)),
            Snapshot::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.key_set().is_some()
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        match &*self.read() {
            Snapshot::Ready(_) => None,
            Snapshot::Unavailable(reason) => Some(reason.to_string()),
        }
    }

    pub fn resolve(&self, kid: &str) -> Option<SigningKey> {
        self.key_set()?.find(kid).cloned()
    }

    /// Re-fetch the key document and publish it. On failure the previous
    /// snapshot stays in place. Returns the number of keys now held.
    pub async fn refresh(&self) -> JwksResult<usize> {
        let Some(fetcher) = &self.fetcher else {
            return Ok(self.key_set().map_or(0, |keys| keys.len()));
        };

        let keys = fetcher.fetch().await?;
        let count = keys.len();
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Snapshot::Ready(Arc::new(keys));
        Ok(count)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
