//! JWT authentication backend.
//!
//! Validates HS256 tokens issued by an external identity provider. The
//! token's `sub` becomes the principal and its `role` claim the role.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AuthBackend, AuthError, Identity, Role};

/// Configuration for the JWT backend.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret (shared with the identity provider).
    pub secret: String,
    /// Expected issuer (e.g., "https://id.example.com").
    pub issuer: String,
    /// Expected audience (e.g., "keyward").
    pub audience: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// JWT claims understood by Keyward.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Subject (principal).
    pub(crate) sub: String,
    /// Role name (`ADMIN`, `SERVICE`, `AUDITOR`).
    pub(crate) role: String,
    /// Issued at (Unix timestamp).
    pub(crate) iat: u64,
    /// Expiration (Unix timestamp).
    pub(crate) exp: u64,
    /// Issuer.
    pub(crate) iss: String,
    /// Audience.
    pub(crate) aud: String,
}

/// Authentication backend for HS256 JWT tokens.
pub struct JwtBackend {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtBackend {
    /// Creates a new JWT backend.
    ///
    /// # Errors
    ///
    /// `Configuration` if the secret, issuer or audience is empty.
    pub fn new(config: JwtConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::Configuration("JWT secret cannot be empty".into()));
        }
        if config.issuer.is_empty() || config.audience.is_empty() {
            return Err(AuthError::Configuration(
                "JWT issuer and audience are required".into(),
            ));
        }

        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = false;

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

#[async_trait]
impl AuthBackend for JwtBackend {
    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                kind => {
                    debug!(reason = ?kind, "JWT rejected");
                    AuthError::InvalidCredentials
                },
            })?;

        let claims = token_data.claims;

        Ok(Identity::new(claims.sub, Role::parse(&claims.role)))
    }

    fn name(&self) -> &'static str {
        "jwt"
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-minimum-32-chars!".to_string(),
            issuer: "https://id.example.com".to_string(),
            audience: "keyward".to_string(),
        }
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before epoch")
            .as_secs()
    }

    fn token_for(config: &JwtConfig, claims: &Claims) -> String {
        let key = EncodingKey::from_secret(config.secret.as_bytes());
        encode(&Header::default(), claims, &key).expect("failed to encode JWT")
    }

    fn claims(config: &JwtConfig, role: &str) -> Claims {
        let now = now();
        Claims {
            sub: "svc-billing".to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + 3600,
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        }
    }

    #[tokio::test]
    async fn test_valid_token() {
        let config = create_test_config();
        let backend = JwtBackend::new(config.clone()).unwrap();
        let token = token_for(&config, &claims(&config, "SERVICE"));

        let identity = backend.validate(&token).await.expect("validation failed");

        assert_eq!(identity.principal, "svc-billing");
        assert_eq!(identity.role, Role::Service);
    }

    #[tokio::test]
    async fn test_unknown_role_is_preserved() {
        let config = create_test_config();
        let backend = JwtBackend::new(config.clone()).unwrap();
        let token = token_for(&config, &claims(&config, "SUPERUSER"));

        let identity = backend.validate(&token).await.unwrap();
        assert_eq!(identity.role, Role::Unrecognized("SUPERUSER".into()));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let config = create_test_config();
        let backend = JwtBackend::new(config.clone()).unwrap();

        let mut expired = claims(&config, "ADMIN");
        expired.iat = now() - 7200;
        expired.exp = now() - 3600;
        let token = token_for(&config, &expired);

        let result = backend.validate(&token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_invalid_signature() {
        let config = create_test_config();
        let backend = JwtBackend::new(config.clone()).unwrap();

        let mut bad_config = config.clone();
        bad_config.secret = "different-secret-key-minimum-32!".to_string();
        let token = token_for(&bad_config, &claims(&config, "ADMIN"));

        let result = backend.validate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_invalid_issuer_and_audience() {
        let config = create_test_config();
        let backend = JwtBackend::new(config.clone()).unwrap();

        let mut wrong_issuer = claims(&config, "ADMIN");
        wrong_issuer.iss = "https://malicious.example".to_string();
        let result = backend.validate(&token_for(&config, &wrong_issuer)).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let mut wrong_audience = claims(&config, "ADMIN");
        wrong_audience.aud = "other-service".to_string();
        let result = backend.validate(&token_for(&config, &wrong_audience)).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let backend = JwtBackend::new(create_test_config()).unwrap();
        let result = backend.validate("not.a.jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = create_test_config();
        config.secret.clear();
        assert!(matches!(
            JwtBackend::new(config),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let debug_str = format!("{:?}", create_test_config());
        assert!(!debug_str.contains("test-secret"));
    }
}
