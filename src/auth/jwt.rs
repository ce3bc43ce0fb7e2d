//! Access token issuance and verification
//!
//! Access tokens are HS256 JSON Web Tokens carrying the user's ID, username
//! and role plus issue and expiry timestamps. Nothing is stored server side:
//! a token is trusted iff its signature verifies and it has not expired.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::models::{Role, User};

/// Claims carried inside an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Username at issuance time
    pub username: String,

    /// Role at issuance time
    pub role: Role,

    /// Issued-at (unix seconds)
    pub iat: i64,

    /// Expiry (unix seconds)
    pub exp: i64,
}

impl Claims {
    /// Build claims valid from now for `ttl`
    ///
    /// Fails with [`TokenError::Signing`] when the expiry is out of range.
    pub fn new(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        role: Role,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = now.checked_add_signed(ttl).ok_or_else(|| {
            TokenError::Signing(format!("token lifetime of {}s is out of range", ttl.num_seconds()))
        })?;

        Ok(Self {
            sub: subject_id.into(),
            username: username.into(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }

    /// Build claims for a stored user
    pub fn for_user(user: &User, ttl: Duration) -> Result<Self, TokenError> {
        Self::new(user.id.clone(), user.username.clone(), user.role, ttl)
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Token verification and signing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature does not match the payload under this secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Current time is past `exp`
    #[error("Token expired")]
    Expired,

    /// Token could not be parsed
    #[error("Malformed token")]
    Malformed,

    /// Signing failed
    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => AuthError::InvalidToken,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::Signing(_) => AuthError::Internal,
        }
    }
}

/// Sign `claims` with `secret`
pub fn issue(claims: &Claims, secret: &[u8]) -> Result<String, TokenError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify `token` against `secret` and return its claims
pub fn verify(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    decode_with(token, &DecodingKey::from_secret(secret), &validation())
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "iat", "sub"]);
    validation
}

fn decode_with(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<Claims, TokenError> {
    decode::<Claims>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            _ => TokenError::Malformed,
        })
}

/// Signing secret and lifetime bundled for the auth manager
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec for `secret` issuing tokens valid for `ttl`
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: validation(),
            ttl,
        }
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user`
    pub fn issue_for(&self, user: &User) -> Result<String, TokenError> {
        self.issue(&Claims::for_user(user, self.ttl)?)
    }

    /// Sign arbitrary claims
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode_with(token, &self.decoding_key, &self.validation)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-test-secret-test-secret";
    const OTHER_SECRET: &[u8] = b"another-secret-another-secret-xyz";

    fn sample_claims(ttl: Duration) -> Claims {
        Claims::new("user-1", "johndoe", Role::User, ttl).unwrap()
    }

    // Test 1: issue then verify returns identical claims
    #[test]
    fn test_round_trip() {
        let claims = sample_claims(Duration::hours(1));
        let token = issue(&claims, SECRET).unwrap();

        assert_eq!(verify(&token, SECRET).unwrap(), claims);
    }

    // Test 2: token has three dot-separated segments
    #[test]
    fn test_token_is_compact_jwt() {
        let token = issue(&sample_claims(Duration::hours(1)), SECRET).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    // Test 3: expired token fails with Expired
    #[test]
    fn test_expired_token() {
        let claims = sample_claims(Duration::seconds(-60));
        assert!(claims.is_expired());

        let token = issue(&claims, SECRET).unwrap();
        assert_eq!(verify(&token, SECRET), Err(TokenError::Expired));
    }

    // Test 4: wrong secret fails with InvalidSignature
    #[test]
    fn test_wrong_secret() {
        let token = issue(&sample_claims(Duration::hours(1)), SECRET).unwrap();
        assert_eq!(verify(&token, OTHER_SECRET), Err(TokenError::InvalidSignature));
    }

    // Test 5: swapping in an escalated payload breaks the signature
    #[test]
    fn test_tampered_payload() {
        let token = issue(&sample_claims(Duration::hours(1)), SECRET).unwrap();
        let forged = issue(
            &Claims::new("user-1", "johndoe", Role::Admin, Duration::hours(1)).unwrap(),
            OTHER_SECRET,
        )
        .unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(verify(&spliced, SECRET), Err(TokenError::InvalidSignature));
    }

    // Test 6: garbage input fails with Malformed
    #[test]
    fn test_malformed_tokens() {
        assert_eq!(verify("not-a-jwt", SECRET), Err(TokenError::Malformed));
        assert_eq!(verify("", SECRET), Err(TokenError::Malformed));
        assert_eq!(verify("a.b.c", SECRET), Err(TokenError::Malformed));
    }

    // Test 7: codec round trip for a stored user
    #[test]
    fn test_codec_issue_for_user() {
        let codec = TokenCodec::new(SECRET, Duration::minutes(5));
        let user = User::new("johndoe", "hash", Role::Admin);

        let token = codec.issue_for(&user).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "johndoe");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    // Test 8: codec and free functions interoperate
    #[test]
    fn test_codec_matches_free_functions() {
        let codec = TokenCodec::new(SECRET, Duration::hours(1));
        let claims = sample_claims(Duration::hours(1));

        let token = codec.issue(&claims).unwrap();
        assert_eq!(verify(&token, SECRET).unwrap(), claims);

        let token = issue(&claims, SECRET).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), claims);
    }

    // Test 9: Debug output hides the secret
    #[test]
    fn test_codec_debug_redacts_secret() {
        let codec = TokenCodec::new(SECRET, Duration::hours(1));
        let debug = format!("{:?}", codec);

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-secret"));
    }

    // Test 10: token errors map onto auth errors
    #[test]
    fn test_token_error_into_auth_error() {
        assert_eq!(
            AuthError::from(TokenError::InvalidSignature),
            AuthError::InvalidToken
        );
        assert_eq!(AuthError::from(TokenError::Expired), AuthError::TokenExpired);
        assert_eq!(
            AuthError::from(TokenError::Malformed),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(TokenError::Signing("x".to_string())),
            AuthError::Internal
        );
    }

    // Test 11: a lifetime past the representable range fails instead of panicking
    #[test]
    fn test_out_of_range_ttl() {
        let huge = Duration::seconds(i64::MAX / 1_000);
        assert!(matches!(
            Claims::new("user-1", "johndoe", Role::User, huge),
            Err(TokenError::Signing(_))
        ));

        let codec = TokenCodec::new(SECRET, huge);
        let user = User::new("johndoe", "hash", Role::User);
        assert!(matches!(codec.issue_for(&user), Err(TokenError::Signing(_))));
    }
}
