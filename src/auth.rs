// src/auth.rs
use anyhow::Result;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const TOKEN_VALIDITY_DAYS: i64 = 7;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub exp: usize, // Expiration timestamp
}

pub struct AuthConfig {
    jwt_secret: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String> {
        self.issue_token_at(user_id, Utc::now())
    }

    /// Token for `user_id` valid for seven days from `issued_at`.
    pub fn issue_token_at(&self, user_id: i64, issued_at: DateTime<Utc>) -> Result<String> {
        let expires = issued_at + Duration::days(TOKEN_VALIDITY_DAYS);
        let claims = Claims {
            user_id,
            exp: expires.timestamp().max(0) as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// `Bearer <token>` or the bare token.
pub fn token_from_header(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    ExpiredToken,
    InvalidToken,
    NotConfigured,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization header is required",
            AuthError::ExpiredToken => "Token has expired",
            AuthError::InvalidToken => "Invalid token",
            AuthError::NotConfigured => "Authentication is not configured",
        }
    }
}

/// Last authentication failure of a request, read back by the 401 catcher.
#[derive(Debug, Clone, Copy)]
pub struct AuthFailure(pub Option<AuthError>);

/// Caller identity taken from a valid token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let fail = |status: Status, error: AuthError| {
            req.local_cache(|| AuthFailure(Some(error)));
            Outcome::Error((status, error))
        };

        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            _ => return fail(Status::InternalServerError, AuthError::NotConfigured),
        };

        let token = match req.headers().get_one("Authorization") {
            Some(header) if !token_from_header(header).is_empty() => token_from_header(header),
            _ => {
                warn!("Missing Authorization header");
                return fail(Status::Unauthorized, AuthError::MissingToken);
            }
        };

        match auth_config.verify_token(token) {
            Ok(claims) => Outcome::Success(AuthenticatedUser {
                user_id: claims.user_id,
            }),
            Err(e) => {
                warn!("Token verification failed: {}", e.message());
                fail(Status::Unauthorized, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("test-secret".to_string())
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_token_roundtrip() {
        let token = config().issue_token(42).unwrap();
        let claims = config().verify_token(&token).unwrap();
        assert_eq!(claims.user_id, 42);

        let expected_exp = (Utc::now() + Duration::days(7)).timestamp() as usize;
        assert!(claims.exp.abs_diff(expected_exp) < 5);
    }

    #[test]
    fn test_expired_token() {
        let issued = Utc::now() - Duration::days(8);
        let token = config().issue_token_at(1, issued).unwrap();
        let err = config().verify_token(&token).unwrap_err();
        assert_eq!(err, AuthError::ExpiredToken);
        assert_eq!(err.message(), "Token has expired");
    }

    #[test]
    fn test_wrong_secret_and_garbage_are_invalid() {
        let token = AuthConfig::new("other".into()).issue_token(1).unwrap();
        assert_eq!(config().verify_token(&token).unwrap_err(), AuthError::InvalidToken);
        assert_eq!(config().verify_token("abc.def.ghi").unwrap_err().message(), "Invalid token");
    }

    #[test]
    fn test_token_from_header() {
        assert_eq!(token_from_header("Bearer abc"), "abc");
        assert_eq!(token_from_header("abc"), "abc");
        assert_eq!(token_from_header("Bearer "), "");
    }
}
