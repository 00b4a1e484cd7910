use super::models::{AuthUser, Claims};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("JWT decoding error: {0}")]
    Decoding(String),
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Session has been logged out")]
    Revoked,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    // jti -> exp of logged-out sessions
    revoked: Arc<RwLock<HashMap<String, usize>>>,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            revoked: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn generate_token(&self, user: &AuthUser) -> Result<String, JwtError> {
        self.generate_token_with_ttl(user, Duration::hours(24))
    }

    fn generate_token_with_ttl(&self, user: &AuthUser, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + ttl;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: expiration.timestamp().max(0) as usize,
            iat: now.timestamp() as usize,
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(JwtError::Encoding)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        if token.is_empty() {
            return Err(JwtError::InvalidToken);
        }

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(JwtError::InvalidToken);
        }

        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(token_data) => {
                let now = Utc::now().timestamp() as usize;
                log::debug!(
                    "JWT token decoded successfully. User: {}, Exp: {}, Now: {}",
                    token_data.claims.sub,
                    token_data.claims.exp,
                    now
                );

                if token_data.claims.exp < now {
                    log::warn!(
                        "JWT token expired. Exp: {}, Now: {}",
                        token_data.claims.exp,
                        now
                    );
                    return Err(JwtError::TokenExpired);
                }
                if self.is_revoked(&token_data.claims.jti) {
                    return Err(JwtError::Revoked);
                }
                Ok(token_data.claims)
            }
            Err(err) => {
                log::warn!("JWT token decode error: {:?}", err);
                match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        Err(JwtError::TokenExpired)
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => Err(JwtError::InvalidToken),
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        Err(JwtError::InvalidToken)
                    }
                    _ => Err(JwtError::Decoding(err.to_string())),
                }
            }
        }
    }

    /// Whether `token` still identifies a live session.
    #[cfg(test)]
    pub fn is_session_alive(&self, token: &str) -> bool {
        self.verify_token(token).is_ok()
    }

    /// Ends the session behind `claims`. Entries are dropped once the token
    /// would have expired anyway.
    pub fn revoke(&self, claims: &Claims) {
        let now = Utc::now().timestamp() as usize;
        let mut revoked = match self.revoked.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        revoked.retain(|_, exp| *exp >= now);
        revoked.insert(claims.jti.clone(), claims.exp);
    }

    fn is_revoked(&self, jti: &str) -> bool {
        match self.revoked.read() {
            Ok(revoked) => revoked.contains_key(jti),
            Err(poisoned) => poisoned.into_inner().contains_key(jti),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let service = JwtService::new("test-secret");
        let user = user();
        let token = service.generate_token(&user).unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.name, "alice");
        assert!(service.is_session_alive(&token));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = JwtService::new("one").generate_token(&user()).unwrap();
        assert!(matches!(
            JwtService::new("two").verify_token(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let service = JwtService::new("test-secret");
        assert!(matches!(service.verify_token(""), Err(JwtError::InvalidToken)));
        assert!(matches!(
            service.verify_token("abc.def"),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = JwtService::new("test-secret");
        let token = service
            .generate_token_with_ttl(&user(), Duration::hours(-2))
            .unwrap();
        assert!(matches!(
            service.verify_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn revoked_session_is_dead() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token(&user()).unwrap();
        let other = service.generate_token(&user()).unwrap();
        let claims = service.verify_token(&token).unwrap();

        service.revoke(&claims);
        assert!(matches!(service.verify_token(&token), Err(JwtError::Revoked)));
        assert!(!service.is_session_alive(&token));
        assert!(service.is_session_alive(&other));
    }

    #[test]
    fn clones_share_revocations() {
        let service = JwtService::new("test-secret");
        let clone = service.clone();
        let token = service.generate_token(&user()).unwrap();
        clone.revoke(&clone.verify_token(&token).unwrap());
        assert!(!service.is_session_alive(&token));
    }
}
