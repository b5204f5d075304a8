/// JWT issuance and verification
///
/// All tokens carry the user's email as `sub`, an `exp` expiry, and a
/// `scope` naming what the token may be used for. A token minted for one
/// purpose is rejected by the verifier of another, so a password-reset link
/// cannot be replayed as a bearer credential.
///
/// # Token Scopes
///
/// - **Access**: bearer authentication, lifetime from configuration
/// - **Reset**: password reset links, 15 minutes by default
/// - **Email**: email-address confirmation links, 7 days by default
///
/// Every verifier returns `Result<_, TokenError>`. Call sites choose what a
/// failure means: the reset flow answers 400, the bearer middleware answers 401.
///
/// # Example
///
/// ```
/// use contacts_shared::auth::jwt::{create_reset_token, verify_reset_token, JwtKeys};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = JwtKeys::hs256("test-secret-key-at-least-32-bytes-long");
///
/// let token = create_reset_token("user@example.com", 15, &keys)?;
/// assert_eq!(verify_reset_token(&token, &keys)?, "user@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Default lifetime of a password-reset token
pub const RESET_TOKEN_EXPIRE_MINUTES: i64 = 15;

/// Default lifetime of an email-confirmation token
pub const EMAIL_TOKEN_EXPIRE_MINUTES: i64 = 7 * 24 * 60;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    Encode(String),

    /// Token `exp` is in the past
    #[error("Token has expired")]
    Expired,

    /// Bad signature, malformed token, or missing claims
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token is valid but was issued for another purpose
    #[error("Wrong token scope: expected {expected}, got {actual}")]
    WrongScope {
        expected: TokenScope,
        actual: TokenScope,
    },

    /// Unsupported signing algorithm in configuration
    #[error("Unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Bearer authentication
    AccessToken,

    /// Password reset
    ResetToken,

    /// Email confirmation
    EmailToken,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::AccessToken => "access_token",
            TokenScope::ResetToken => "reset_token",
            TokenScope::EmailToken => "email_token",
        }
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user email
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token purpose
    pub scope: TokenScope,
}

impl Claims {
    /// Creates claims expiring `expires_in` from now
    ///
    /// A negative duration produces an already-expired token, which is
    /// useful in tests.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if the expiry is outside the representable
    /// date range.
    pub fn new(
        subject: impl Into<String>,
        scope: TokenScope,
        expires_in: Duration,
    ) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(expires_in)
            .ok_or_else(|| TokenError::Encode("Token expiry out of range".to_string()))?;

        Ok(Self {
            sub: subject.into(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            scope,
        })
    }

    /// Claims for a freshly issued token valid for `minutes`
    fn issue(subject: &str, scope: TokenScope, minutes: i64) -> Result<Self, TokenError> {
        if minutes <= 0 {
            return Err(TokenError::Encode(format!(
                "Token lifetime must be positive, got {} minutes",
                minutes
            )));
        }

        let expires_in = Duration::try_minutes(minutes)
            .ok_or_else(|| TokenError::Encode("Token expiry out of range".to_string()))?;

        Self::new(subject, scope, expires_in)
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signing material for tokens
///
/// Built once from configuration and passed to every token operation.
/// Only the HMAC family is accepted since the key is a shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    secret: String,
    algorithm: Algorithm,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl JwtKeys {
    /// Creates keys for an HMAC algorithm name such as `HS256`
    ///
    /// # Errors
    ///
    /// Returns `TokenError::UnsupportedAlgorithm` for unknown or non-HMAC names
    pub fn new(secret: impl Into<String>, algorithm: &str) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| TokenError::UnsupportedAlgorithm(algorithm.to_string()))?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }

        Ok(Self {
            secret: secret.into(),
            algorithm,
        })
    }

    /// Creates HS256 keys
    pub fn hs256(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Gets the signing algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation
    }
}

/// Signs claims into a token string
pub fn create_token(claims: &Claims, keys: &JwtKeys) -> Result<String, TokenError> {
    let header = Header::new(keys.algorithm);
    let key = EncodingKey::from_secret(keys.secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| TokenError::Encode(e.to_string()))
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    }
}

/// Validates signature and expiry, then checks the scope
///
/// # Errors
///
/// - `TokenError::Expired` if `exp` has passed
/// - `TokenError::Invalid` for a bad signature or malformed token
/// - `TokenError::WrongScope` if the token was minted for another purpose
pub fn validate_token(token: &str, expected: TokenScope, keys: &JwtKeys) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(keys.secret.as_bytes());

    let claims = decode::<Claims>(token, &key, &keys.validation())
        .map_err(map_decode_error)?
        .claims;

    if claims.scope != expected {
        return Err(TokenError::WrongScope {
            expected,
            actual: claims.scope,
        });
    }

    Ok(claims)
}

/// Creates a bearer access token for `subject`
///
/// # Example
///
/// ```
/// use contacts_shared::auth::jwt::{create_access_token, get_email_from_token, JwtKeys};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = JwtKeys::hs256("test-secret-key-at-least-32-bytes-long");
/// let token = create_access_token("mock@example.com", 5, &keys)?;
/// assert_eq!(get_email_from_token(&token, &keys)?, "mock@example.com");
/// # Ok(())
/// # }
/// ```
pub fn create_access_token(
    subject: &str,
    expires_minutes: i64,
    keys: &JwtKeys,
) -> Result<String, TokenError> {
    let claims = Claims::issue(subject, TokenScope::AccessToken, expires_minutes)?;
    create_token(&claims, keys)
}

/// Creates a password-reset token for `email`
pub fn create_reset_token(
    email: &str,
    expires_minutes: i64,
    keys: &JwtKeys,
) -> Result<String, TokenError> {
    let claims = Claims::issue(email, TokenScope::ResetToken, expires_minutes)?;
    create_token(&claims, keys)
}

/// Returns the email a password-reset token was issued for
pub fn verify_reset_token(token: &str, keys: &JwtKeys) -> Result<String, TokenError> {
    validate_token(token, TokenScope::ResetToken, keys).map(|claims| claims.sub)
}

/// Creates an email-confirmation token for `email`
pub fn create_email_token(email: &str, keys: &JwtKeys) -> Result<String, TokenError> {
    let claims = Claims::issue(email, TokenScope::EmailToken, EMAIL_TOKEN_EXPIRE_MINUTES)?;
    create_token(&claims, keys)
}

/// Returns the email an email-confirmation token was issued for
pub fn verify_email_token(token: &str, keys: &JwtKeys) -> Result<String, TokenError> {
    validate_token(token, TokenScope::EmailToken, keys).map(|claims| claims.sub)
}

/// Returns the email of the user an access token authenticates
pub fn get_email_from_token(token: &str, keys: &JwtKeys) -> Result<String, TokenError> {
    let claims = validate_token(token, TokenScope::AccessToken, keys)?;

    if claims.sub.is_empty() {
        return Err(TokenError::Invalid("Missing subject".to_string()));
    }

    Ok(claims.sub)
}

/// Decodes the raw payload of any token this service signed
///
/// Signature and expiry are checked; the scope is not. Callers that want
/// an empty payload on failure use `.unwrap_or_default()`.
pub fn decode_jwt_token(token: &str, keys: &JwtKeys) -> Result<Map<String, Value>, TokenError> {
    let key = DecodingKey::from_secret(keys.secret.as_bytes());

    decode::<Map<String, Value>>(token, &key, &keys.validation())
        .map(|data| data.claims)
        .map_err(map_decode_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn keys() -> JwtKeys {
        JwtKeys::hs256(SECRET)
    }

    #[test]
    fn test_create_access_token_decodes_correctly() {
        let token = create_access_token("mock@example.com", 5, &keys()).unwrap();

        assert_eq!(get_email_from_token(&token, &keys()).unwrap(), "mock@example.com");
    }

    #[test]
    fn test_create_access_token_expired() {
        let claims =
            Claims::new("expired@example.com", TokenScope::AccessToken, Duration::seconds(-3600))
                .unwrap();
        assert!(claims.is_expired());

        let token = create_token(&claims, &keys()).unwrap();
        let result = get_email_from_token(&token, &keys());

        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_access_token_lifetime_must_be_positive() {
        for minutes in [0, -5] {
            let result = create_access_token("a@example.com", minutes, &keys());
            assert!(matches!(result, Err(TokenError::Encode(_))), "{} minutes", minutes);
        }
    }

    #[test]
    fn test_huge_lifetime_is_an_error_not_a_panic() {
        for minutes in [i64::MAX / 2, i64::MAX] {
            let result = create_access_token("a@example.com", minutes, &keys());
            assert!(matches!(result, Err(TokenError::Encode(_))), "{} minutes", minutes);
        }

        let result = Claims::new("a@example.com", TokenScope::AccessToken, Duration::MAX);
        assert!(matches!(result, Err(TokenError::Encode(_))));
    }

    #[test]
    fn test_exp_at_epoch_is_expired() {
        let claims = Claims {
            sub: "expired@example.com".to_string(),
            iat: 0,
            exp: 0,
            scope: TokenScope::ResetToken,
        };
        let token = create_token(&claims, &keys()).unwrap();

        assert!(matches!(verify_reset_token(&token, &keys()), Err(TokenError::Expired)));
    }

    #[test]
    fn test_reset_token_roundtrip() {
        let token = create_reset_token("testuser@example.com", RESET_TOKEN_EXPIRE_MINUTES, &keys()).unwrap();

        assert_eq!(verify_reset_token(&token, &keys()).unwrap(), "testuser@example.com");
    }

    #[test]
    fn test_email_token_roundtrip() {
        let token = create_email_token("new@example.com", &keys()).unwrap();

        assert_eq!(verify_email_token(&token, &keys()).unwrap(), "new@example.com");
    }

    #[test]
    fn test_reset_token_rejected_as_access_token() {
        let token = create_reset_token("user@example.com", 15, &keys()).unwrap();

        let result = get_email_from_token(&token, &keys());
        assert!(matches!(
            result,
            Err(TokenError::WrongScope {
                expected: TokenScope::AccessToken,
                actual: TokenScope::ResetToken,
            })
        ));
    }

    #[test]
    fn test_access_token_rejected_as_reset_token() {
        let token = create_access_token("user@example.com", 15, &keys()).unwrap();

        assert!(matches!(
            verify_reset_token(&token, &keys()),
            Err(TokenError::WrongScope { .. })
        ));
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_reset_token("user@example.com", 15, &JwtKeys::hs256("secret-one")).unwrap();

        let result = verify_reset_token(&token, &JwtKeys::hs256("secret-two"));
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let token = create_reset_token("user@example.com", 15, &keys()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = create_reset_token("attacker@example.com", 15, &JwtKeys::hs256("other")).unwrap();
        let forged: Vec<&str> = forged_payload.split('.').collect();
        parts[1] = forged[1];
        let tampered = parts.join(".");

        assert!(matches!(verify_reset_token(&tampered, &keys()), Err(TokenError::Invalid(_))));
        assert!(verify_reset_token("invalid.token.here", &keys()).is_err());
    }

    #[test]
    fn test_decode_jwt_token_payload() {
        let token = create_email_token("user@example.com", &keys()).unwrap();

        let payload = decode_jwt_token(&token, &keys()).unwrap();
        assert_eq!(payload["sub"], "user@example.com");
        assert_eq!(payload["scope"], "email_token");
        assert!(payload.contains_key("exp"));
    }

    #[test]
    fn test_decode_jwt_token_invalid_is_empty_by_default() {
        let payload = decode_jwt_token("garbage", &keys()).unwrap_or_default();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_keys_from_algorithm_name() {
        let hs512 = JwtKeys::new(SECRET, "HS512").unwrap();
        assert_eq!(hs512.algorithm(), Algorithm::HS512);

        let token = create_access_token("user@example.com", 5, &hs512).unwrap();
        assert!(get_email_from_token(&token, &hs512).is_ok());
        assert!(get_email_from_token(&token, &keys()).is_err());
    }

    #[test]
    fn test_keys_reject_asymmetric_algorithms() {
        assert!(matches!(
            JwtKeys::new(SECRET, "RS256"),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
        assert!(JwtKeys::new(SECRET, "nonsense").is_err());
    }

    #[test]
    fn test_keys_debug_hides_secret() {
        let rendered = format!("{:?}", keys());
        assert!(!rendered.contains(SECRET));
    }
}
