use crate::bloom::BloomWidth;

/// Error returned when a filter or estimator cannot be built (or combined) with the
/// requested configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0} is not a power of 2")]
    BucketCountNotPowerOfTwo(usize),

    #[error("unsupported bloom filter width: {0} bits")]
    UnsupportedBloomWidth(usize),

    #[error("bloom filter width mismatch: expected {expected:?}, found {found:?}")]
    BloomWidthMismatch {
        expected: BloomWidth,
        found: BloomWidth,
    },

    #[error("bucket count mismatch: expected {expected}, found {found}")]
    BucketCountMismatch { expected: usize, found: usize },

    #[error("hash provider mismatch: both sides must hash items identically")]
    HashProviderMismatch,

    #[error("invalid bit vector length: expected {expected} words, found {found}")]
    InvalidWordCount { expected: usize, found: usize },

    #[error("bucket {index} holds {value}, counters cannot exceed 64")]
    InvalidBucketValue { index: usize, value: u8 },
}

pub type Result<T, E = ConfigurationError> = std::result::Result<T, E>;
