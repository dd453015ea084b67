// SPDX-License-Identifier: Apache-2.0

//! Password hashing and session token generation.
//!
//! Passwords are stored as `hex(salt)$hex(sha256(salt || password))` with a
//! random 16-byte salt. Session tokens are opaque 32-byte random values,
//! hex-encoded; expiry lives in the sessions table, not in the token.

use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    format!("{}${}", hex::encode(salt), digest_hex(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    digest_hex(&salt, password) == digest
}

pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_LEN] = rand::random();
    hex::encode(bytes)
}

fn digest_hex(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
