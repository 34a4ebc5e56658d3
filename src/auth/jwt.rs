//! JWT token generation and validation
//!
//! Tokens are HS256 JWTs (`header.payload.signature`, base64url without
//! padding). Verification is stateless and runs in a fixed order:
//!
//! 1. structure: exactly three non-empty base64url segments
//! 2. header: the declared algorithm must be the one we sign with
//! 3. signature: HMAC recomputed and compared in constant time
//! 4. expiry: `now >= exp` is expired, no leeway
//!
//! No claim value is trusted before step 3 succeeds.

use crate::core::config::SecurityConfig;
use crate::core::error::{GatewayError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The only algorithm tokens may be signed with
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expires-at, Unix seconds
    pub exp: i64,
}

/// Why a token was rejected
///
/// The distinction is for logs and tests; clients only ever see a generic 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<serde_json::Value>,
}

/// Issues and verifies session tokens with a single static secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime_secs: i64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service; an empty secret or zero lifetime is a configuration error
    pub fn new(secret: &SecretString, lifetime_secs: u64) -> Result<Self> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(GatewayError::ConfigError(
                "JWT signing secret is not set".to_string(),
            ));
        }

        let lifetime_secs = i64::try_from(lifetime_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                GatewayError::ConfigError(format!(
                    "Token lifetime must be between 1 and {} seconds",
                    i64::MAX
                ))
            })?;

        // Expiry is checked against our own clock reading after the signature
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime_secs,
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        Self::new(
            &SecretString::from(config.jwt_secret.clone()),
            config.token_lifetime,
        )
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Generate a token for a user, valid from now for the configured lifetime
    pub fn issue(&self, user_id: i64) -> Result<String> {
        self.issue_at(user_id, chrono::Utc::now().timestamp())
    }

    /// Generate a token as if issued at `now` (Unix seconds)
    pub fn issue_at(&self, user_id: i64, now: i64) -> Result<String> {
        let exp = now.checked_add(self.lifetime_secs).ok_or_else(|| {
            GatewayError::ConfigError("Failed to calculate token expiration".to_string())
        })?;

        let claims = Claims {
            user_id,
            iat: now,
            exp,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token against the current time and extract its claims
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Validate a token as of `now` (Unix seconds)
    pub fn verify_at(&self, token: &str, now: i64) -> std::result::Result<Claims, TokenError> {
        let header = split_segments(token)?[0];
        check_algorithm(header)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => {
                    TokenError::UnsupportedAlgorithm("mismatched".to_string())
                }
                _ => TokenError::Malformed,
            },
        )?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

fn split_segments(token: &str) -> std::result::Result<[&str; 3], TokenError> {
    let mut parts = token.split('.');
    let segments = [parts.next(), parts.next(), parts.next()];

    match (segments, parts.next()) {
        ([Some(h), Some(p), Some(s)], None)
            if [h, p, s].iter().all(|seg| is_base64url(seg)) =>
        {
            Ok([h, p, s])
        }
        _ => Err(TokenError::Malformed),
    }
}

fn is_base64url(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Reject any header whose `alg` is not ours, including `none` and a missing one
fn check_algorithm(header_segment: &str) -> std::result::Result<(), TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|_| TokenError::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    match header.alg {
        Some(serde_json::Value::String(alg)) if alg == "HS256" => Ok(()),
        Some(serde_json::Value::String(alg)) => Err(TokenError::UnsupportedAlgorithm(alg)),
        Some(other) => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        None => Err(TokenError::UnsupportedAlgorithm("missing".to_string())),
    }
}
