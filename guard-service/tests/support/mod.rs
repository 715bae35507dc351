#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use common_auth::{ClaimsVerifier, KeySet, KeyStore, SigningKey, TokenGuard};
use guard_service::{build_router, AppState, GuardMetrics};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const KID: &str = "service-key";
pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "https://api.example.com";

pub struct Issuer {
    encoding: EncodingKey,
    modulus: String,
    exponent: String,
}

impl Issuer {
    /// One key pair shared by every test in the binary.
    pub fn shared() -> &'static Self {
        static ISSUER: OnceLock<Issuer> = OnceLock::new();
        ISSUER.get_or_init(Issuer::generate)
    }

    fn generate() -> Self {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem");

        Self {
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    pub fn key_store(&self) -> KeyStore {
        KeyStore::from_key_set(KeySet::new(vec![SigningKey::rsa(
            KID,
            self.modulus.clone(),
            self.exponent.clone(),
        )]))
    }

    pub fn token(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KID.to_string());
        encode(&header, claims, &self.encoding).expect("sign token")
    }
}

pub fn claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "auth0|svc-test",
        "email": "svc@example.com",
        "name": "Service Test",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 600,
    })
}

pub fn verifying_guard(keys: KeyStore) -> TokenGuard {
    TokenGuard::new(keys, ClaimsVerifier::new(), AUDIENCE, ISSUER)
}

pub fn app(guard: TokenGuard) -> (Router, Arc<GuardMetrics>) {
    let metrics = Arc::new(GuardMetrics::new().expect("metrics"));
    let state = AppState {
        guard: Arc::new(guard),
        metrics: metrics.clone(),
    };
    (build_router(state), metrics)
}

pub async fn get(app: &Router, uri: &str, bearer: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
