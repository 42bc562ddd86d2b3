//! Stable Feature Hashing

/// Identifier and system columns in the hashed layout
pub const HASHED_CATEGORICAL_COLUMNS: usize = 2;

/// Modulus applied to hashed description words
pub const TEXT_HASH_RANGE: u32 = 100;

/// Hash a value into `[0, range)`
///
/// CRC-32 keeps the value identical across processes and platforms.
pub fn stable_hash(value: &str, range: u32) -> u32 {
    crc32fast::hash(value.as_bytes()) % range.max(1)
}

/// Positional word hashes for a description, `slots` wide
///
/// Slot `j` holds the hash of the `j`-th lower-cased word; unused slots are 0.
pub(crate) fn hash_words(text: &str, slots: usize) -> Vec<f64> {
    let mut row = vec![0.0; slots];
    let lowered = text.to_lowercase();
    for (slot, word) in row.iter_mut().zip(lowered.split_whitespace()) {
        *slot = stable_hash(word, TEXT_HASH_RANGE) as f64;
    }
    row
}
