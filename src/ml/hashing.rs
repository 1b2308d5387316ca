//! Feature hashing of categorical strings into a fixed index space.

use std::hash::{BuildHasher, Hasher};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

// Fixed so that indices are reproducible between runs of the same build.
const AHASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Hash function used to map tagged feature strings to indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    /// CRC-32 of the UTF-8 bytes. Stable across builds and platforms.
    #[default]
    Crc32,
    /// AHash with fixed seeds. Faster, but only stable within one build.
    AHash,
}

/// Categorical field a hashed string came from.
///
/// Each field prefixes its value with its own tag, so equal strings in
/// different fields land on different indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureField {
    Comment,
    Username,
    Title,
}

impl FeatureField {
    pub fn tag(self) -> &'static str {
        match self {
            FeatureField::Comment => "comment_",
            FeatureField::Username => "username_",
            FeatureField::Title => "title_",
        }
    }
}

/// Maps `(field, value)` pairs to indices in `[0, dimension)`.
///
/// Distinct inputs may collide. Collisions are kept as they are.
#[derive(Debug, Clone)]
pub struct FeatureHasher {
    function: HashFunction,
    dimension: usize,
    ahash: RandomState,
}

impl FeatureHasher {
    /// `dimension` must be non-zero; [`crate::config::LearnerConfig::validate`]
    /// enforces it for configured runs.
    pub fn new(function: HashFunction, dimension: usize) -> Self {
        assert!(dimension > 0, "feature hashing dimension must be positive");
        Self {
            function,
            dimension,
            ahash: RandomState::with_seeds(
                AHASH_SEEDS[0],
                AHASH_SEEDS[1],
                AHASH_SEEDS[2],
                AHASH_SEEDS[3],
            ),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn function(&self) -> HashFunction {
        self.function
    }

    /// Raw 64-bit hash of an already tagged string.
    pub fn hash_str(&self, tagged: &str) -> u64 {
        match self.function {
            HashFunction::Crc32 => crc32fast::hash(tagged.as_bytes()) as u64,
            HashFunction::AHash => {
                let mut hasher = self.ahash.build_hasher();
                hasher.write(tagged.as_bytes());
                hasher.finish()
            }
        }
    }

    /// Index of `value` observed in `field`.
    pub fn index(&self, field: FeatureField, value: &str) -> usize {
        let mut tagged = String::with_capacity(field.tag().len() + value.len());
        tagged.push_str(field.tag());
        tagged.push_str(value);
        (self.hash_str(&tagged) % self.dimension as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 1 << 18;

    #[test]
    fn test_indices_in_range_and_deterministic() {
        for function in [HashFunction::Crc32, HashFunction::AHash] {
            let hasher = FeatureHasher::new(function, DIM);
            let again = FeatureHasher::new(function, DIM);
            for value in ["", "Main Page", "ClueBot NG", "fixed typo", "日本語"] {
                for field in [FeatureField::Comment, FeatureField::Username, FeatureField::Title] {
                    let index = hasher.index(field, value);
                    assert!(index < DIM);
                    assert_eq!(index, again.index(field, value));
                }
            }
        }
    }

    #[test]
    fn test_crc32_known_value() {
        // CRC-32 of "title_" is fixed by the algorithm, not by the build.
        let hasher = FeatureHasher::new(HashFunction::Crc32, DIM);
        let expected = (crc32fast::hash(b"title_") as usize) % DIM;
        assert_eq!(hasher.index(FeatureField::Title, ""), expected);
    }

    #[test]
    fn test_field_tags_separate_equal_strings() {
        let hasher = FeatureHasher::new(HashFunction::Crc32, DIM);
        let comment = hasher.index(FeatureField::Comment, "Example");
        let username = hasher.index(FeatureField::Username, "Example");
        let title = hasher.index(FeatureField::Title, "Example");
        assert_ne!(comment, username);
        assert_ne!(username, title);
        assert_ne!(comment, title);
        // CRC-32 indices do not depend on the platform or build.
        assert_eq!(comment, 180_243);
    }

    #[test]
    fn test_tiny_dimension_forces_collisions() {
        let hasher = FeatureHasher::new(HashFunction::Crc32, 1);
        assert_eq!(hasher.index(FeatureField::Comment, "a"), 0);
        assert_eq!(hasher.index(FeatureField::Title, "b"), 0);
    }

    #[test]
    #[should_panic]
    fn test_zero_dimension_rejected() {
        FeatureHasher::new(HashFunction::Crc32, 0);
    }
}
