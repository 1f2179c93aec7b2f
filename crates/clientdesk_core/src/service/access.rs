//! Shared-secret gate for mutating operations.
//!
//! # Invariants
//! - The plaintext secret is never stored; only salt and derived key.
//! - Comparison time does not depend on where the keys first differ.
//! - The empty candidate never verifies.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt::{Debug, Formatter};

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;

pub struct AccessGate {
    salt: [u8; SALT_LEN],
    key: [u8; KEY_LEN],
}

impl AccessGate {
    /// Derives a salted key for `secret` with a fresh random salt.
    pub fn new(secret: &str) -> Self {
        let salt = rand::random::<[u8; SALT_LEN]>();
        let key = derive_key(secret, &salt);
        Self { salt, key }
    }

    /// True only for the exact configured secret.
    pub fn verify(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        constant_time_eq(&derive_key(candidate, &self.salt), &self.key)
    }
}

impl Debug for AccessGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("salt", &"<redacted>")
            .field("key", &"<redacted>")
            .finish()
    }
}

fn derive_key(secret: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
