//! Password generation and hashing
//!
//! Stored hashes are `base64(SHA-256(salt || password))`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::distr::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated passwords
pub const PASSWORD_LENGTH: usize = 16;

/// Length of per-user salts
pub const SALT_LENGTH: usize = 16;

fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_password() -> String {
    random_string(PASSWORD_LENGTH)
}

pub fn generate_salt() -> String {
    random_string(SALT_LENGTH)
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}
