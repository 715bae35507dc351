use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed identity returned while the guard runs in bypass mode.
pub const BYPASS_SUBJECT: &str = "dev-user-123";
const BYPASS_EMAIL: &str = "dev@example.com";
const BYPASS_NAME: &str = "Development User";
const BYPASS_ISSUED_AT: i64 = 1_234_567_890;
const BYPASS_EXPIRES_AT: i64 = 9_999_999_999;

/// Verified token claims, kept exactly as the issuer sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Synthetic identity for bypass mode. Never produced by verification.
    pub fn synthetic() -> Self {
        let mut claims = Map::new();
        claims.insert("sub".into(), Value::from(BYPASS_SUBJECT));
        claims.insert("email".into(), Value::from(BYPASS_EMAIL));
        claims.insert("name".into(), Value::from(BYPASS_NAME));
        claims.insert("iat".into(), Value::from(BYPASS_ISSUED_AT));
        claims.insert("exp".into(), Value::from(BYPASS_EXPIRES_AT));
        Self(claims)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim("email")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_claim("name")
    }

    pub fn issuer(&self) -> Option<&str> {
        self.str_claim("iss")
    }

    /// `aud` may be a single string or an array of strings.
    pub fn audience(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(item)) => vec![item.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("exp")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("iat")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// NumericDate claim in whole seconds. Fractional values are truncated.
    pub(crate) fn timestamp(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}
