//! Secret comparison for API keys and admin tokens

use sha2::{Digest, Sha256};

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Compare two secrets without leaking their length or common prefix
///
/// Both sides are hashed first so the fold always runs over 32 bytes.
pub fn secret_eq(presented: &str, expected: &str) -> bool {
    let (a, b) = (digest(presented), digest(expected));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
