//! `stream-estimators` provides two probabilistic summaries over streams of byte items:
//!
//! - [`BloomFilter`]: approximate set membership in a fixed 256 or 65536 bit vector,
//!   never reporting a false negative.
//! - [`CardinalityEstimator`]: approximate distinct counting with LogLog, SuperLogLog
//!   and HyperLogLog style estimates over a power-of-two number of buckets.
//!
//! Both hash every item exactly once through a [`HashProvider`] and slice the 64-bit
//! result into independent sub-signals. Neither supports removal or resizing, but two
//! instances with the same configuration can be merged.
pub mod bits;
pub mod bloom;
pub mod error;
pub mod estimator;
pub mod hash;
#[cfg(feature = "with_serde")]
mod serde;

pub use bloom::{BloomFilter, BloomWidth};
pub use error::ConfigurationError;
pub use estimator::CardinalityEstimator;
pub use hash::{HashProvider, Murmur3Provider, WyHashProvider};
