use crate::storage::Storage;
use anyhow::Result;
use rand::RngExt;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// How many 6-character draws to try before extending the code.
const MAX_ATTEMPTS: usize = 10;

/// Length of the fallback code once the short draws are exhausted.
const FALLBACK_LENGTH: usize = 8;

/// Draw `length` characters uniformly from the alphanumeric alphabet.
/// Not cryptographically secure; collisions are handled by the caller.
pub fn generate(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a code not currently present in the store.
///
/// Tries up to 10 draws at the configured length, checking each against the
/// store. If every draw collides, returns one 8-character draw without a
/// re-check; that code is a candidate, not a guarantee. The unique index on
/// `short_code` remains the final authority, so callers must treat an insert
/// conflict as retryable.
pub async fn generate_unique(storage: &dyn Storage, length: usize) -> Result<String> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate(length);
        if !storage.exists(&code).await? {
            return Ok(code);
        }
    }

    Ok(generate(FALLBACK_LENGTH))
}

/// A well-formed public code: 6 to 8 alphanumeric ASCII characters.
pub fn is_valid_code(code: &str) -> bool {
    (6..=8).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
