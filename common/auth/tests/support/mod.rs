#![allow(dead_code)]

use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub const ISSUER_DOMAIN: &str = "tenant.example.com";
pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "https://api.example.com";

pub struct TestKey {
    encoding: EncodingKey,
    pub modulus: String,
    pub exponent: String,
}

fn generate() -> TestKey {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = private_key.to_public_key();
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");

    TestKey {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
}

pub fn published_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(generate)
}

pub fn unpublished_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(generate)
}

impl TestKey {
    pub fn jwk(&self, kid: &str) -> Value {
        json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.modulus,
            "e": self.exponent,
        })
    }

    pub fn sign(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding).expect("sign token")
    }
}

pub fn jwks_document(keys: &[Value]) -> String {
    json!({ "keys": keys }).to_string()
}

pub fn claims_expiring_in(seconds: i64) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "auth0|5f1e",
        "email": "casey@example.com",
        "name": "Casey",
        "iss": ISSUER,
        "aud": [AUDIENCE, "https://tenant.example.com/userinfo"],
        "iat": now,
        "exp": now + seconds,
        "scope": "openid profile email",
    })
}

pub fn tamper_payload(token: &str) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let payload = &mut parts[1];
    let idx = payload.len() / 3;
    let original = payload.as_bytes()[idx];
    let replacement = if original == b'x' { 'y' } else { 'x' };
    payload.replace_range(idx..idx + 1, &replacement.to_string());
    parts.join(".")
}
