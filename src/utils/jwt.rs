use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: i64,
    pub iat: i64,
    /// Issue time in milliseconds; `iat` alone cannot order a token against a change made
    /// within the same second.
    #[serde(default)]
    pub iat_ms: i64,
    pub token_type: String, // "access" or "refresh"
}

impl Claims {
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Token Error".to_string()))
    }

    pub fn issued_at_millis(&self) -> i64 {
        if self.iat_ms > 0 {
            self.iat_ms
        } else {
            self.iat.saturating_mul(1000)
        }
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
    refresh_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64, refresh_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
            refresh_token_expires_in: refresh_expires_in,
        }
    }

    fn generate_token(&self, user_id: i32, token_type: &str, expires_in: i64) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(expires_in);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iat_ms: now.timestamp_millis(),
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn generate_access_token(&self, user_id: i32) -> AppResult<String> {
        self.generate_token(user_id, "access", self.access_token_expires_in)
    }

    pub fn generate_refresh_token(&self, user_id: i32) -> AppResult<String> {
        self.generate_token(user_id, "refresh", self.refresh_token_expires_in)
    }

    /// Signature and expiry are always checked; a token that fails either is a "Token Error".
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected token: {e}");
                AppError::AuthError("Token Error".to_string())
            })
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "refresh" {
            return Err(AppError::AuthError("Invalid refresh token type".to_string()));
        }

        Ok(claims)
    }

    pub fn get_access_token_expires_in(&self) -> i64 {
        self.access_token_expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let jwt = JwtService::new("secret", 60, 120);
        let token = jwt.generate_access_token(42).unwrap();

        let claims = jwt.verify_access_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert!(jwt.verify_refresh_token(&token).is_err());
    }

    #[test]
    fn test_bad_signature_is_token_error() {
        let issuer = JwtService::new("secret", 60, 120);
        let other = JwtService::new("another-secret", 60, 120);
        let token = issuer.generate_access_token(1).unwrap();

        match other.verify_access_token(&token) {
            Err(AppError::AuthError(msg)) => assert_eq!(msg, "Token Error"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_issued_at_has_millisecond_precision() {
        let jwt = JwtService::new("secret", 60, 120);
        let before = Utc::now().timestamp_millis();
        let claims = jwt
            .verify_access_token(&jwt.generate_access_token(7).unwrap())
            .unwrap();

        assert!(claims.issued_at_millis() >= before);
        assert_eq!(claims.issued_at_millis() / 1000, claims.iat);

        let legacy = Claims {
            sub: "7".to_string(),
            exp: 0,
            iat: 1_700_000_000,
            iat_ms: 0,
            token_type: "access".to_string(),
        };
        assert_eq!(legacy.issued_at_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_garbage_token() {
        let jwt = JwtService::new("secret", 60, 120);
        assert!(jwt.verify_token("not-a-jwt").is_err());
    }
}
