//! Bearer-token verification.
//!
//! Access tokens are minted by the identity service and signed with a
//! shared HS256 secret. This server never issues tokens.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use lessoncast_core::types::UserId;
use serde::Deserialize;

/// Role name that grants read access to every job.
pub const ROLE_ADMIN: &str = "admin";

/// Default clock-skew allowance when checking `exp`.
const DEFAULT_LEEWAY_SECS: u64 = 60;

/// The claims this server reads from an access token. Anything else the
/// identity service puts in the token is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: String,
    pub exp: i64,
}

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the identity service.
    pub secret: String,
    /// Seconds of clock skew tolerated on `exp`.
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `JWT_SECRET`      | **yes**  | --      |
    /// | `JWT_LEEWAY_SECS` | no       | `60`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let leeway_secs = std::env::var("JWT_LEEWAY_SECS")
            .unwrap_or_else(|_| DEFAULT_LEEWAY_SECS.to_string())
            .parse()
            .expect("JWT_LEEWAY_SECS must be a valid u64");

        Self {
            secret,
            leeway_secs,
        }
    }

    /// Check signature, algorithm and expiry, then return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &key, &validation).map(|data| data.claims)
    }
}
