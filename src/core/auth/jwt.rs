//! JWT utilities for token generation and validation
//!
//! Access and refresh tokens are signed with HS256 using a separate secret per
//! token class. Access tokens are short-lived (15 minutes by default), refresh
//! tokens are long-lived (7 days by default).

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;
use crate::core::config::{ConfigError, env_value};

/// Default access token expiration time (15 minutes)
const ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 15;

/// Default refresh token expiration time (7 days)
const REFRESH_TOKEN_EXPIRATION_DAYS: i64 = 7;

const DEFAULT_ISSUER: &str = "medportal";

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_secret: String,
    /// Access token expiration in minutes
    pub access_token_expiration_minutes: i64,
    /// Refresh token expiration in days
    pub refresh_token_expiration_days: i64,
    /// Token issuer
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field(
                "access_token_expiration_minutes",
                &self.access_token_expiration_minutes,
            )
            .field(
                "refresh_token_expiration_days",
                &self.refresh_token_expiration_days,
            )
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_token_expiration_minutes: ACCESS_TOKEN_EXPIRATION_MINUTES,
            refresh_token_expiration_days: REFRESH_TOKEN_EXPIRATION_DAYS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Create config from environment variables.
    ///
    /// Lifetimes that are not integers, or not positive, are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_secret =
            std::env::var("JWT_ACCESS_SECRET").map_err(|_| JwtError::MissingSecret("access"))?;
        let refresh_secret =
            std::env::var("JWT_REFRESH_SECRET").map_err(|_| JwtError::MissingSecret("refresh"))?;

        let config = Self {
            access_secret,
            refresh_secret,
            access_token_expiration_minutes: env_value(
                "JWT_ACCESS_EXPIRATION_MINUTES",
                ACCESS_TOKEN_EXPIRATION_MINUTES,
            )?,
            refresh_token_expiration_days: env_value(
                "JWT_REFRESH_EXPIRATION_DAYS",
                REFRESH_TOKEN_EXPIRATION_DAYS,
            )?,
            issuer: env_value("JWT_ISSUER", DEFAULT_ISSUER.to_string())?,
        };
        config.validate()?;

        Ok(config)
    }

    /// Reject empty or shared secrets and unusable token lifetimes
    pub fn validate(&self) -> Result<(), JwtError> {
        if self.access_secret.is_empty() {
            return Err(JwtError::MissingSecret("access"));
        }
        if self.refresh_secret.is_empty() {
            return Err(JwtError::MissingSecret("refresh"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(JwtError::SharedSecret);
        }
        check_lifetime(
            "access",
            self.access_token_expiration_minutes,
            self.access_lifetime(),
        )?;
        check_lifetime(
            "refresh",
            self.refresh_token_expiration_days,
            self.refresh_lifetime(),
        )?;
        Ok(())
    }

    fn access_lifetime(&self) -> Option<Duration> {
        Duration::try_minutes(self.access_token_expiration_minutes)
    }

    fn refresh_lifetime(&self) -> Option<Duration> {
        Duration::try_days(self.refresh_token_expiration_days)
    }

    /// Set access token expiration
    pub fn access_token_expiration(mut self, minutes: i64) -> Self {
        self.access_token_expiration_minutes = minutes;
        self
    }

    /// Set refresh token expiration
    pub fn refresh_token_expiration(mut self, days: i64) -> Self {
        self.refresh_token_expiration_days = days;
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

fn check_lifetime(
    class: &'static str,
    amount: i64,
    lifetime: Option<Duration>,
) -> Result<(), JwtError> {
    match lifetime {
        Some(lifetime) if amount > 0 && Utc::now().checked_add_signed(lifetime).is_some() => {
            Ok(())
        }
        _ => Err(JwtError::InvalidLifetime(class)),
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT {0} secret is not configured")]
    MissingSecret(&'static str),

    #[error("Access and refresh tokens must use different secrets")]
    SharedSecret,

    #[error("JWT {0} token lifetime is out of range")]
    InvalidLifetime(&'static str),

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Wrong token type")]
    WrongTokenType,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                JwtError::InvalidSignature
            }
            _ => JwtError::Malformed,
        }
    }
}

/// Token class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// Identity a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
    /// Token type (access or refresh)
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    /// Identity carried by this token
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.sub,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// A signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Token pair (access + refresh)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,
    /// Refresh token (long-lived)
    pub refresh_token: String,
    /// Access token expiration (Unix timestamp)
    pub access_expires_at: i64,
    /// Refresh token expiration (Unix timestamp)
    pub refresh_expires_at: i64,
    /// Token type (always "Bearer")
    pub token_type: String,
}

/// Signs and verifies access and refresh tokens
#[derive(Clone)]
pub struct TokenIssuer {
    config: JwtConfig,
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
}

impl TokenIssuer {
    /// Create a new token issuer
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding_key = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding_key = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding_key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding_key = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        Self {
            config,
            access_encoding_key,
            access_decoding_key,
            refresh_encoding_key,
            refresh_decoding_key,
        }
    }

    fn issue(
        &self,
        subject: &TokenSubject,
        token_type: TokenType,
        lifetime: Option<Duration>,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let exp = lifetime
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(match token_type {
                TokenType::Access => JwtError::InvalidLifetime("access"),
                TokenType::Refresh => JwtError::InvalidLifetime("refresh"),
            })?;

        let claims = Claims {
            sub: subject.user_id,
            email: subject.email.clone(),
            role: subject.role,
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let key = match token_type {
            TokenType::Access => &self.access_encoding_key,
            TokenType::Refresh => &self.refresh_encoding_key,
        };

        let token = encode(&Header::default(), &claims, key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: exp.timestamp(),
        })
    }

    /// Issue an access token
    pub fn issue_access(&self, subject: &TokenSubject) -> Result<IssuedToken, JwtError> {
        self.issue(
            subject,
            TokenType::Access,
            self.config.access_lifetime(),
        )
    }

    /// Issue a refresh token
    pub fn issue_refresh(&self, subject: &TokenSubject) -> Result<IssuedToken, JwtError> {
        self.issue(
            subject,
            TokenType::Refresh,
            self.config.refresh_lifetime(),
        )
    }

    /// Issue both access and refresh tokens
    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, JwtError> {
        let access = self.issue_access(subject)?;
        let refresh = self.issue_refresh(subject)?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
            token_type: "Bearer".to_string(),
        })
    }

    /// Validate and decode a token of the expected class
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.leeway = 0;

        let key = match expected {
            TokenType::Access => &self.access_decoding_key,
            TokenType::Refresh => &self.refresh_decoding_key,
        };

        let claims = decode::<Claims>(token, key, &validation)?.claims;

        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }

        Ok(claims)
    }

    /// Validate an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify(token, TokenType::Access)
    }

    /// Validate a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify(token, TokenType::Refresh)
    }
}
