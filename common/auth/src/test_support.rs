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

use crate::jwks::SigningKey;

pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "https://api.example.com";

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub modulus: String,
    pub exponent: String,
}

impl KeyMaterial {
    pub fn signing_key(&self, kid: &str) -> SigningKey {
        SigningKey::rsa(kid, self.modulus.clone(), self.exponent.clone())
    }
}

fn generate() -> KeyMaterial {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = private_key.to_public_key();
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");

    KeyMaterial {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
}

/// Key generation is slow in debug builds, so tests share two key pairs.
pub fn primary_key() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(generate)
}

pub fn other_key() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(generate)
}

pub fn standard_claims(expires_in: i64) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "auth0|user-1",
        "email": "user@example.com",
        "name": "Test User",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + expires_in,
    })
}

pub fn sign(material: &KeyMaterial, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &material.encoding).expect("sign token")
}

/// Replace one character of the payload segment with a different base64url character.
pub fn tamper_payload(token: &str) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let payload = &mut parts[1];
    let idx = payload.len() / 2;
    let original = payload.as_bytes()[idx];
    let replacement = if original == b'A' { 'B' } else { 'A' };
    payload.replace_range(idx..idx + 1, &replacement.to_string());
    parts.join(".")
}
