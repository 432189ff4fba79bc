//! Identity tokens, the per-request identity, and the login session slot.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub mod identity;
pub mod password;
pub mod session;

pub use identity::{identify, Identity};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Pharmacy,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Pharmacy => "pharmacy",
        }
    }
}

/// Claims carried by every issued token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 tokens with a shared secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    pub fn issue(&self, id: &str, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            id: id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let tokens = TokenService::new("secret", Duration::hours(24));
        let token = tokens.issue("abc", Role::Pharmacy).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.id, "abc");
        assert_eq!(claims.role, Role::Pharmacy);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn rejects_foreign_secret() {
        let ours = TokenService::new("secret", Duration::hours(1));
        let theirs = TokenService::new("other", Duration::hours(1));
        let token = theirs.issue("abc", Role::Customer).unwrap();
        assert!(ours.verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let tokens = TokenService::new("secret", Duration::hours(-2));
        let token = tokens.issue("abc", Role::Customer).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn role_serializes_as_type_claim() {
        let claims = Claims {
            id: "x".into(),
            role: Role::Customer,
            iat: 0,
            exp: 1,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "customer");
    }
}
