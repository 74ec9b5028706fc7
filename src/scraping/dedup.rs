//! Content deduplication
//!
//! Implements two-level deduplication of fetched page text:
//! - Level 1: exact duplicates via a byte-sum checksum
//! - Level 2: near duplicates via a SHA-256 based SimHash fingerprint
//!
//! The byte-sum checksum is order-independent, so two texts that are
//! permutations of the same bytes collide. That weakness is accepted.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::tokenizer::tokenize;

/// Widest supported fingerprint (one SHA-256 digest)
pub const MAX_FINGERPRINT_BITS: usize = 256;

const FINGERPRINT_BYTES: usize = MAX_FINGERPRINT_BITS / 8;

/// Sum of the UTF-8 byte values of the text
pub fn checksum(text: &str) -> u64 {
    text.bytes().map(u64::from).sum()
}

/// Build the token → occurrence count table used as SimHash weights
pub fn token_weights<S: AsRef<str>>(tokens: &[S]) -> HashMap<String, i64> {
    let mut weights = HashMap::new();
    for token in tokens {
        *weights.entry(token.as_ref().to_string()).or_insert(0) += 1;
    }
    weights
}

/// SimHash fingerprint for content similarity detection
///
/// Bits are numbered from the most significant bit of the first byte.
/// Bits at or beyond the configured width are always zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimHash([u8; FINGERPRINT_BYTES]);

impl SimHash {
    /// Compute the fingerprint of page text
    pub fn compute(text: &str, bits: usize) -> Self {
        let tokens = tokenize(text);
        Self::from_weights(&token_weights(&tokens), bits)
    }

    /// Compute the fingerprint from a token weight table.
    ///
    /// For every bit position, each distinct token votes `+weight` if that bit
    /// of its SHA-256 digest is set and `-weight` otherwise. The fingerprint bit
    /// is set when the total is strictly positive.
    pub fn from_weights(weights: &HashMap<String, i64>, bits: usize) -> Self {
        let bits = bits.min(MAX_FINGERPRINT_BITS);

        let digests: Vec<([u8; FINGERPRINT_BYTES], i64)> = weights
            .iter()
            .map(|(token, &weight)| {
                let digest: [u8; FINGERPRINT_BYTES] = Sha256::digest(token.as_bytes()).into();
                (digest, weight)
            })
            .collect();

        let mut out = [0u8; FINGERPRINT_BYTES];
        for i in 0..bits {
            let total: i64 = digests
                .iter()
                .map(|(digest, weight)| if bit_at(digest, i) { *weight } else { -*weight })
                .sum();
            if total > 0 {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }

        SimHash(out)
    }

    /// Wrap raw fingerprint bytes
    pub fn from_bytes(bytes: [u8; FINGERPRINT_BYTES]) -> Self {
        SimHash(bytes)
    }

    /// Whether bit `i` is set
    pub fn bit(&self, i: usize) -> bool {
        i < MAX_FINGERPRINT_BITS && bit_at(&self.0, i)
    }

    /// Calculate Hamming distance between two SimHashes
    pub fn hamming_distance(&self, other: &SimHash) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Check if two hashes are similar (within threshold)
    pub fn is_similar(&self, other: &SimHash, max_distance: u32) -> bool {
        self.hamming_distance(other) <= max_distance
    }

    /// Lowercase hex rendering of the full fingerprint
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for SimHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimHash({})", self.to_hex())
    }
}

fn bit_at(bytes: &[u8; FINGERPRINT_BYTES], i: usize) -> bool {
    bytes[i / 8] & (0x80 >> (i % 8)) != 0
}

/// Exact and near-duplicate fingerprints of one page's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub checksum: u64,
    pub simhash: SimHash,
}

impl ContentFingerprint {
    /// Fingerprint already-tokenized text
    pub fn from_tokens(text: &str, tokens: &[String], bits: usize) -> Self {
        Self {
            checksum: checksum(text),
            simhash: SimHash::from_weights(&token_weights(tokens), bits),
        }
    }

    /// Tokenize and fingerprint text
    pub fn of(text: &str, bits: usize) -> Self {
        Self::from_tokens(text, &tokenize(text), bits)
    }
}

/// Outcome of checking a page against the duplicate index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    /// Checksum seen before
    Exact,
    /// Fingerprint within the similarity threshold of a registered one
    Near { distance: u32 },
    /// New content
    Unique,
}

impl DuplicateStatus {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, DuplicateStatus::Unique)
    }
}

#[derive(Default)]
struct IndexState {
    checksums: HashSet<u64>,
    fingerprints: HashSet<SimHash>,
}

/// Process-wide, append-only index of seen checksums and fingerprints
///
/// Near-duplicate lookup is a linear scan over registered fingerprints.
pub struct DuplicateIndex {
    state: Mutex<IndexState>,
    /// Maximum Hamming distance still considered a near duplicate
    max_distance: u32,
}

impl DuplicateIndex {
    /// Create an index for `bits`-wide fingerprints where pages sharing at
    /// least `similarity_threshold` of their bits are near duplicates.
    pub fn new(bits: usize, similarity_threshold: f64) -> Self {
        let bits = bits.min(MAX_FINGERPRINT_BITS);
        let allowed = (1.0 - similarity_threshold).max(0.0) * bits as f64;
        Self {
            state: Mutex::new(IndexState::default()),
            max_distance: (allowed + 1e-9).floor() as u32,
        }
    }

    /// Maximum Hamming distance treated as a near duplicate
    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Check a page and register it in one atomic step.
    ///
    /// - Known checksum: `Exact`, nothing registered.
    /// - Fingerprint within threshold of a registered one: `Near`; the checksum
    ///   is registered, the fingerprint is not.
    /// - Otherwise `Unique`; both are registered.
    pub fn register_and_check(&self, fingerprint: &ContentFingerprint) -> DuplicateStatus {
        let mut state = self.state.lock();

        if state.checksums.contains(&fingerprint.checksum) {
            return DuplicateStatus::Exact;
        }

        let nearest = state
            .fingerprints
            .iter()
            .map(|existing| existing.hamming_distance(&fingerprint.simhash))
            .min();

        state.checksums.insert(fingerprint.checksum);

        match nearest {
            Some(distance) if distance <= self.max_distance => DuplicateStatus::Near { distance },
            _ => {
                state.fingerprints.insert(fingerprint.simhash);
                DuplicateStatus::Unique
            }
        }
    }

    /// Number of registered checksums
    pub fn checksum_count(&self) -> usize {
        self.state.lock().checksums.len()
    }

    /// Number of registered fingerprints
    pub fn fingerprint_count(&self) -> usize {
        self.state.lock().fingerprints.len()
    }
}
