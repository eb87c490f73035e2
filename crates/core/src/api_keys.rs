//! Worker shared-secret checks for the webhook endpoint.
//!
//! Both keys are authenticated under a fixed HMAC key and the provided tag
//! is verified against the configured one, so the final comparison is
//! constant-time and independent of either key's length.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the worker shared secret.
pub const WORKER_API_KEY_HEADER: &str = "x-api-key";

/// HMAC key under which worker secrets are tagged.
const CONTEXT: &[u8] = b"lessoncast-worker-key";

fn tagged(secret: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(CONTEXT).ok()?;
    mac.update(secret.as_bytes());
    Some(mac)
}

/// Return `true` only if `provided` matches `expected` exactly.
///
/// An empty `expected` never matches, so an unconfigured secret cannot be
/// satisfied by an empty header.
pub fn shared_secret_matches(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let (Some(expected), Some(provided)) = (tagged(expected), tagged(provided)) else {
        return false;
    };
    provided
        .verify_slice(&expected.finalize().into_bytes())
        .is_ok()
}
