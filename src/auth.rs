//! Credentials and session tokens
//!
//! Passwords are stored as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.
//! Session tokens are random 32-byte values handed to the client once; the
//! database only ever sees an HMAC-SHA256 of the token keyed by the server
//! secret, so a leaked sessions table cannot be replayed.

use crate::error::{LyceumError, Result};
use crate::types::UserId;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts any key length")
}

/// Single-block PBKDF2 (RFC 8018) with HMAC-SHA256; yields 32 bytes
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut mac = new_mac(password);
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u = [0u8; 32];
    u.copy_from_slice(&mac.finalize().into_bytes());
    let mut out = u;

    for _ in 1..iterations {
        let mut mac = new_mac(password);
        mac.update(&u);
        u.copy_from_slice(&mac.finalize().into_bytes());
        for (o, x) in out.iter_mut().zip(u.iter()) {
            *o ^= x;
        }
    }
    out
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = pbkdf2_sha256(password.as_bytes(), &salt, iterations.max(1));
    format!(
        "{}${}${}${}",
        HASH_SCHEME,
        iterations.max(1),
        to_hex(&salt),
        to_hex(&hash)
    )
}

/// Check a password against a stored hash string
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 4 || parts[0] != HASH_SCHEME {
        return false;
    }
    let Ok(iterations) = parts[1].parse::<u32>() else {
        return false;
    };
    let (Some(salt), Some(expected)) = (from_hex(parts[2]), from_hex(parts[3])) else {
        return false;
    };

    // Recompute as a MAC so the final comparison is constant time
    let derived = pbkdf2_sha256(password.as_bytes(), &salt, iterations.max(1));
    let mut mac = new_mac(&derived);
    mac.update(b"verify");
    let expected_tag = {
        let mut m = new_mac(&expected);
        m.update(b"verify");
        m.finalize().into_bytes()
    };
    mac.verify_slice(&expected_tag).is_ok()
}

/// A newly issued session; `token` is only ever returned to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Issues session tokens and derives their storage digests
#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: impl AsRef<[u8]>, ttl_hours: i64) -> Result<Self> {
        let secret = secret.as_ref().to_vec();
        if secret.len() < 16 {
            return Err(LyceumError::Validation(
                "session secret must be at least 16 bytes".to_string(),
            ));
        }
        Ok(Self {
            secret,
            ttl: Duration::hours(ttl_hours.max(1)),
        })
    }

    /// Generate a fresh token for `user_id`
    pub fn issue(&self, user_id: UserId) -> IssuedSession {
        let mut raw = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut raw);
        IssuedSession {
            token: to_hex(&raw),
            user_id,
            expires_at: Utc::now() + self.ttl,
        }
    }

    /// Digest stored in place of the token
    pub fn digest(&self, token: &str) -> String {
        let mut mac = new_mac(&self.secret);
        mac.update(token.as_bytes());
        to_hex(&mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Random secret for development setups that did not configure one
pub fn generate_secret() -> String {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    to_hex(&raw)
}
