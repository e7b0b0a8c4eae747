use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
  #[error("invalid token")]
  InvalidToken(#[source] jsonwebtoken::errors::Error),
  #[error("failed to issue token: {0}")]
  Issue(#[source] jsonwebtoken::errors::Error),
  #[error("password hashing failed: {0}")]
  Hash(#[from] bcrypt::BcryptError),
}

/// Identity of the caller, injected into request extensions once the bearer
/// token checks out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
  pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  user_id: i64,
  iat: i64,
  exp: i64,
}

/// Issues and verifies HS256 tokens.
pub struct TokenIssuer {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl: Duration,
}

impl TokenIssuer {
  pub fn new(secret: &str, ttl_hours: u64) -> TokenIssuer {
    TokenIssuer {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl: Duration::hours(ttl_hours as i64),
    }
  }

  pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
      user_id,
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };

    encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Issue)
  }

  pub fn verify(&self, token: &str) -> Result<CurrentUser, AuthError> {
    let data = decode::<Claims>(token, &self.decoding, &Validation::default())
      .map_err(AuthError::InvalidToken)?;

    Ok(CurrentUser {
      id: data.claims.user_id,
    })
  }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
  Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
  Ok(bcrypt::verify(password, hash)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_round_trip() {
    let issuer = TokenIssuer::new("s3cret", 1);
    let token = issuer.issue(42).unwrap();

    assert_eq!(issuer.verify(&token).unwrap(), CurrentUser { id: 42 });
  }

  #[test]
  fn token_signed_with_other_secret_is_rejected() {
    let token = TokenIssuer::new("one", 1).issue(7).unwrap();
    let err = TokenIssuer::new("two", 1).verify(&token).unwrap_err();

    assert!(matches!(err, AuthError::InvalidToken(_)));
  }

  #[test]
  fn expired_token_is_rejected() {
    let issuer = TokenIssuer::new("s3cret", 1);
    let claims = Claims {
      user_id: 1,
      iat: 0,
      exp: 60,
    };
    let token = encode(&Header::default(), &claims, &issuer.encoding).unwrap();

    assert!(issuer.verify(&token).is_err());
  }

  #[test]
  fn garbage_token_is_rejected() {
    assert!(TokenIssuer::new("s3cret", 1).verify("not.a.jwt").is_err());
  }

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("hunter22", 4).unwrap();

    assert_ne!(hash, "hunter22");
    assert!(verify_password("hunter22", &hash).unwrap());
    assert!(!verify_password("hunter23", &hash).unwrap());
  }
}
