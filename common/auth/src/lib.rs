pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod jwks;
pub mod key_store;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use claims::ClaimSet;
pub use config::{ConfigError, GuardConfig, VerifyConfig};
pub use error::{AuthError, AuthResult, JwksError, JwksResult};
pub use extractors::AuthContext;
pub use guard::TokenGuard;
pub use jwks::{JwksFetcher, KeySet, SigningKey};
pub use key_store::KeyStore;
pub use verifier::{ClaimsVerifier, MAX_TOKEN_BYTES};
