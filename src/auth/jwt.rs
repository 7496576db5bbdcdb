use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Claim set carried by every bearer token: the user's identity plus a
/// fixed-window expiry. Nothing is stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// Verification failure, split so callers can answer an expired token
/// differently from a malformed or forged one.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data =
            decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn keys_with_secret(secret: &str) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(300),
        }
    }

    fn token_with_exp(keys: &JwtKeys, offset_seconds: i64) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "ann@x.com".into(),
            iat: now as usize,
            exp: (now + offset_seconds) as usize,
        };
        encode(&Header::default(), &claims, &keys.encoding).expect("encode")
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "ann@x.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[tokio::test]
    async fn verify_accepts_token_near_expiry() {
        let keys = make_keys();
        let token = token_with_exp(&keys, 60);
        assert!(keys.verify(&token).is_ok());
    }

    #[tokio::test]
    async fn verify_rejects_expired_token_as_expired() {
        let keys = make_keys();
        // Well past the validator's leeway.
        let token = token_with_exp(&keys, -120);
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret_as_invalid() {
        let signer = keys_with_secret("one-secret");
        let verifier = keys_with_secret("another-secret");
        let token = signer.sign(Uuid::new_v4(), "ann@x.com").expect("sign");
        assert_eq!(verifier.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[tokio::test]
    async fn verify_rejects_truncated_token_as_invalid() {
        let keys = make_keys();
        let token = keys.sign(Uuid::new_v4(), "ann@x.com").expect("sign");
        let truncated = &token[..token.len() - 1];
        assert_eq!(keys.verify(truncated).unwrap_err(), TokenError::Invalid);
    }

    #[tokio::test]
    async fn verify_rejects_garbage_as_invalid() {
        let keys = make_keys();
        assert_eq!(keys.verify("not.a.jwt").unwrap_err(), TokenError::Invalid);
    }
}
