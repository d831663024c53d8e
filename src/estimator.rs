//! Cardinality estimator allows to estimate number of distinct elements
//! in the stream or dataset using `B` buckets, where `B` is a power of two.
//!
//! # Observation
//! Every item is hashed once into 64 bits `h`:
//! - the low `log2(B)` bits of `h` select a bucket,
//! - the rank is the length of the run of 1-bits starting at bit 0 of
//!   `h >> log2(B)`,
//! - the bucket keeps the maximum rank seen so far.
//!
//! Ranks count trailing *ones* rather than trailing zeros. For uniform hashes both
//! runs follow the same geometric distribution, and the bias constants below are
//! applied to this rank definition as-is.
//!
//! # Estimates
//! - [`CardinalityEstimator::estimate`]: LogLog, `alpha * B * 2^mean`.
//! - [`CardinalityEstimator::super_estimate`]: SuperLogLog, the mean over the lowest
//!   90% of buckets with a fixed correction constant.
//! - [`CardinalityEstimator::hyper_estimate`]: HyperLogLog harmonic mean with linear
//!   counting for small cardinalities. There is no large-range correction.
//!
//! Expected standard error of the harmonic estimate is roughly `1.04 / sqrt(B)`:
//!   B = 256: 6.5%
//!   B = 1024: 3.25%
//!   B = 4096: 1.62%
//!
//! # Memory
//! Each bucket is a single byte holding a value in `0..=64`.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

use tracing::{debug, warn};

use crate::bits::count_trailing_ones;
use crate::error::{ConfigurationError, Result};
use crate::hash::{HashProvider, WyHashProvider};

/// Number of buckets used by `CardinalityEstimator::default()`
pub const DEFAULT_BUCKETS: usize = 1024;
/// Fraction of buckets kept by the SuperLogLog trimmed mean
const SUPER_RETAINED: f64 = 0.9;
/// SuperLogLog bias correction constant
const SUPER_ALPHA: f64 = 0.79402;
/// HyperLogLog switches to linear counting below `SMALL_RANGE * B`
const SMALL_RANGE: f64 = 2.5;

pub struct CardinalityEstimator<H: HashProvider = WyHashProvider> {
    /// Per-bucket maximum rank
    pub(crate) buckets: Vec<u8>,
    /// `B - 1`, applied to hashes to get the bucket index
    index_mask: u64,
    /// `log2(B)`
    index_bits: u32,
    /// Bias correction constant for `B` buckets
    alpha: f64,
    hasher: H,
}

impl CardinalityEstimator {
    /// Creates new instance of `CardinalityEstimator` with `buckets` buckets and
    /// the default hash provider.
    pub fn new(buckets: usize) -> Result<Self> {
        Self::with_hasher(buckets, WyHashProvider::default())
    }
}

impl<H: HashProvider> CardinalityEstimator<H> {
    /// Creates new instance of `CardinalityEstimator` which hashes items with `hasher`.
    ///
    /// Fails unless `buckets` is a power of two.
    pub fn with_hasher(buckets: usize, hasher: H) -> Result<Self> {
        if !buckets.is_power_of_two() {
            warn!(buckets, "rejecting estimator configuration");
            return Err(ConfigurationError::BucketCountNotPowerOfTwo(buckets));
        }
        let alpha = alpha(buckets);
        debug!(buckets, alpha, "creating cardinality estimator");

        Ok(Self {
            buckets: vec![0; buckets],
            index_mask: buckets as u64 - 1,
            index_bits: buckets.trailing_zeros(),
            alpha,
            hasher,
        })
    }

    /// Observe an item
    #[inline]
    pub fn observe<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) {
        let hash = self.hasher.hash64(item.as_ref());
        self.observe_hash(hash);
    }

    /// Alias for [`CardinalityEstimator::observe`]
    #[inline]
    pub fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) {
        self.observe(item);
    }

    /// Observe an already hashed item
    #[inline]
    pub fn observe_hash(&mut self, hash: u64) {
        let (idx, rank) = self.index_and_rank(hash);
        let bucket = &mut self.buckets[idx];
        if rank > *bucket {
            *bucket = rank;
        }
    }

    /// Split `hash` into bucket index and rank
    #[inline]
    fn index_and_rank(&self, hash: u64) -> (usize, u8) {
        let idx = (hash & self.index_mask) as usize;
        // `index_bits` is at most 63 since `B` fits into `usize`
        let rank = count_trailing_ones(hash >> self.index_bits);
        (idx, rank)
    }

    /// Return LogLog cardinality estimate
    pub fn estimate(&self) -> u64 {
        let m = self.buckets.len() as f64;
        let sum: u64 = self.buckets.iter().map(|&b| u64::from(b)).sum();
        let mean = sum as f64 / m;
        (self.alpha * m * mean.exp2()).round() as u64
    }

    /// Return SuperLogLog cardinality estimate.
    ///
    /// Only the lowest 90% of buckets take part in the mean, which cuts off
    /// outliers produced by a few unusually long runs.
    pub fn super_estimate(&self) -> u64 {
        let mut sorted = self.buckets.clone();
        sorted.sort_unstable();

        let cutoff = (self.buckets.len() as f64 * SUPER_RETAINED) as usize;
        if cutoff == 0 {
            return 0;
        }
        let sum: u64 = sorted[..cutoff].iter().map(|&b| u64::from(b)).sum();
        let mean = sum as f64 / cutoff as f64;
        (SUPER_ALPHA * cutoff as f64 * mean.exp2()).round() as u64
    }

    /// Return HyperLogLog cardinality estimate
    pub fn hyper_estimate(&self) -> u64 {
        let m = self.buckets.len() as f64;
        let (sum, zeros) = self.buckets.iter().fold((0.0, 0usize), |(sum, zeros), &b| {
            (sum + (-f64::from(b)).exp2(), zeros + usize::from(b == 0))
        });

        let harmonic_mean = m / sum;
        let raw = 2.0 * m * self.alpha * harmonic_mean;
        if raw < SMALL_RANGE * m && zeros > 0 {
            // linear counting over the empty buckets
            return (-m * (zeros as f64 / m).ln()).round() as u64;
        }
        raw.round() as u64
    }

    /// Number of buckets `B`
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Current bucket values
    #[inline]
    pub fn buckets(&self) -> &[u8] {
        &self.buckets
    }

    /// Bias correction constant for the configured bucket count
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of buckets still holding zero
    pub fn zero_buckets(&self) -> usize {
        self.buckets.iter().filter(|&&b| b == 0).count()
    }

    /// Return memory size of `CardinalityEstimator`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.buckets.as_slice())
    }

    /// Build an estimator around existing bucket values
    #[cfg(feature = "with_serde")]
    pub(crate) fn from_buckets(buckets: Vec<u8>, hasher: H) -> Result<Self> {
        // ranks are run lengths within a 64-bit hash
        if let Some(index) = buckets.iter().position(|&b| b > 64) {
            return Err(ConfigurationError::InvalidBucketValue {
                index,
                value: buckets[index],
            });
        }
        let mut estimator = Self::with_hasher(buckets.len(), hasher)?;
        estimator.buckets = buckets;
        Ok(estimator)
    }
}

impl<H: HashProvider + PartialEq> CardinalityEstimator<H> {
    /// Merge cardinality estimators: every bucket takes the larger of the two
    /// values. Bucket counts and hash providers must match, otherwise `self` is
    /// left unchanged.
    pub fn merge(&mut self, rhs: &Self) -> Result<()> {
        if self.buckets.len() != rhs.buckets.len() {
            warn!(
                expected = self.buckets.len(),
                found = rhs.buckets.len(),
                "refusing to merge estimators"
            );
            return Err(ConfigurationError::BucketCountMismatch {
                expected: self.buckets.len(),
                found: rhs.buckets.len(),
            });
        }
        if self.hasher != rhs.hasher {
            warn!(
                buckets = self.buckets.len(),
                "refusing to merge estimators with different hashers"
            );
            return Err(ConfigurationError::HashProviderMismatch);
        }
        debug!(buckets = self.buckets.len(), "merging estimators");
        self.buckets
            .iter_mut()
            .zip(rhs.buckets.iter())
            .for_each(|(lhs, &rhs)| *lhs = (*lhs).max(rhs));
        Ok(())
    }
}

impl<H: HashProvider + Default> Default for CardinalityEstimator<H> {
    /// Creates an estimator with `DEFAULT_BUCKETS` buckets
    fn default() -> Self {
        match Self::with_hasher(DEFAULT_BUCKETS, H::default()) {
            Ok(estimator) => estimator,
            Err(_) => unreachable!("{DEFAULT_BUCKETS} is a power of two"),
        }
    }
}

impl<H: HashProvider + Clone> Clone for CardinalityEstimator<H> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            index_mask: self.index_mask,
            index_bits: self.index_bits,
            alpha: self.alpha,
            hasher: self.hasher.clone(),
        }
    }
}

impl<H: HashProvider + PartialEq> PartialEq for CardinalityEstimator<H> {
    /// Compare bucket contents and hash providers, the derived fields follow from
    /// the bucket count
    fn eq(&self, rhs: &Self) -> bool {
        self.buckets == rhs.buckets && self.hasher == rhs.hasher
    }
}

impl<H: HashProvider> Debug for CardinalityEstimator<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ buckets: {}, estimate: {}, hyper_estimate: {}, size: {} }}",
            self.bucket_count(),
            self.estimate(),
            self.hyper_estimate(),
            self.size_of()
        )
    }
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::hash::Murmur3Provider;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    #[test_case(0 => Err(ConfigurationError::BucketCountNotPowerOfTwo(0)))]
    #[test_case(1 => Ok(1))]
    #[test_case(16 => Ok(16))]
    #[test_case(1000 => Err(ConfigurationError::BucketCountNotPowerOfTwo(1000)))]
    #[test_case(1024 => Ok(1024))]
    #[test_case(1023 => Err(ConfigurationError::BucketCountNotPowerOfTwo(1023)))]
    fn test_new(buckets: usize) -> Result<usize> {
        CardinalityEstimator::new(buckets).map(|e| e.bucket_count())
    }

    #[test_case(16 => "0.673000")]
    #[test_case(32 => "0.697000")]
    #[test_case(64 => "0.709000")]
    #[test_case(128 => "0.715270")]
    #[test_case(1024 => "0.720541")]
    fn test_alpha(buckets: usize) -> String {
        format!("{:.6}", CardinalityEstimator::new(buckets).unwrap().alpha())
    }

    #[test]
    fn test_index_and_rank() {
        let mut e = CardinalityEstimator::new(16).unwrap();
        // bucket 0b0101, remainder 0b...0111 has a run of three ones
        e.observe_hash(0b0111_0101);
        assert_eq!(e.buckets()[5], 3);
        // lower rank in the same bucket is ignored
        e.observe_hash(0b0001_0101);
        assert_eq!(e.buckets()[5], 3);
        // trailing zero in the remainder gives rank 0
        e.observe_hash(0b1110_0011);
        assert_eq!(e.buckets()[3], 0);
        // all remaining 60 bits set
        e.observe_hash(u64::MAX);
        assert_eq!(e.buckets()[15], 60);
        assert_eq!(e.zero_buckets(), 14);
    }

    #[test]
    fn test_single_bucket() {
        let mut e = CardinalityEstimator::new(1).unwrap();
        e.observe_hash(u64::MAX);
        assert_eq!(e.buckets(), &[64]);
        assert_eq!(e.super_estimate(), 0);
    }

    #[test]
    fn test_empty() {
        let e = CardinalityEstimator::new(1024).unwrap();
        // 2^0 for every bucket
        assert_eq!(e.estimate(), (e.alpha() * 1024.0).round() as u64);
        assert_eq!(e.hyper_estimate(), 0);
        assert_eq!(e.zero_buckets(), 1024);
    }

    #[test]
    fn test_estimate_formula() {
        let mut e = CardinalityEstimator::new(64).unwrap();
        for idx in 0..64u64 {
            // rank 2 for even buckets, rank 4 for odd ones
            let run = if idx % 2 == 0 { 0b11 } else { 0b1111 };
            e.observe_hash((run << 6) | idx);
        }
        // mean = 3
        assert_eq!(e.estimate(), (0.709f64 * 64.0 * 8.0).round() as u64);
        // lowest 57 buckets: 32 twos and 25 fours
        let mean = (32.0 * 2.0 + 25.0 * 4.0) / 57.0;
        assert_eq!(
            e.super_estimate(),
            (0.79402 * 57.0 * f64::exp2(mean)).round() as u64
        );
        // sum of 2^-rank = 32 / 4 + 32 / 16 = 10
        assert_eq!(
            e.hyper_estimate(),
            (2.0 * 64.0 * 0.709 * (64.0 / 10.0f64)).round() as u64
        );
    }

    #[test]
    fn test_hyper_estimate_small_range() {
        let mut e = CardinalityEstimator::new(64).unwrap();
        for idx in 0..16u64 {
            e.observe_hash((0b1 << 6) | idx);
        }
        // 48 zero buckets, raw estimate is well below 2.5 * 64
        assert_eq!(e.zero_buckets(), 48);
        assert_eq!(
            e.hyper_estimate(),
            (-64.0 * (48.0f64 / 64.0).ln()).round() as u64
        );
    }

    #[test]
    fn test_reads_are_idempotent() {
        let mut e = CardinalityEstimator::new(256).unwrap();
        for i in 0u64..5000 {
            e.observe(&i.to_be_bytes());
        }
        let before = e.buckets().to_vec();
        assert_eq!(e.estimate(), e.estimate());
        assert_eq!(e.super_estimate(), e.super_estimate());
        assert_eq!(e.hyper_estimate(), e.hyper_estimate());
        assert_eq!(e.buckets(), before.as_slice());
    }

    #[test]
    fn test_buckets_never_decrease() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut e = CardinalityEstimator::new(128).unwrap();
        let mut prev = e.buckets().to_vec();
        for _ in 0..10_000 {
            e.observe(&rng.gen::<u64>().to_be_bytes());
            assert!(prev.iter().zip(e.buckets()).all(|(old, new)| new >= old));
            prev.copy_from_slice(e.buckets());
        }
    }

    #[test]
    fn test_duplicates_do_not_change_state() {
        let mut e: CardinalityEstimator = CardinalityEstimator::default();
        for i in 0u64..1000 {
            e.add(&i.to_be_bytes());
        }
        let snapshot = e.clone();
        for i in 0u64..1000 {
            e.add(&i.to_be_bytes());
        }
        assert_eq!(e, snapshot);
    }

    #[test_case(10_000, 0.7, 1.3)]
    #[test_case(100_000, 0.8, 1.2)]
    fn test_hyper_estimate_accuracy(n: u64, low: f64, high: f64) {
        let mut e = CardinalityEstimator::new(1024).unwrap();
        for i in 0..n {
            e.observe(&i.to_be_bytes());
        }
        let ratio = e.hyper_estimate() as f64 / n as f64;
        assert!((low..high).contains(&ratio), "n = {n}, ratio = {ratio}");
    }

    #[test_case(0, 0)]
    #[test_case(100, 0)]
    #[test_case(0, 100)]
    #[test_case(5_000, 20_000)]
    fn test_merge_matches_replay(lhs_n: u64, rhs_n: u64) {
        let mut lhs = CardinalityEstimator::new(512).unwrap();
        let mut rhs = CardinalityEstimator::new(512).unwrap();
        let mut replay = CardinalityEstimator::new(512).unwrap();
        let mut buf = [0, 0, 0, 0, 0, 0, 0, 0, 1];
        for i in 0..lhs_n {
            buf[..8].copy_from_slice(&i.to_be_bytes());
            lhs.observe(&buf);
            replay.observe(&buf);
        }
        let mut buf = [0, 0, 0, 0, 0, 0, 0, 0, 2];
        for i in 0..rhs_n {
            buf[..8].copy_from_slice(&i.to_be_bytes());
            rhs.observe(&buf);
            replay.observe(&buf);
        }

        lhs.merge(&rhs).unwrap();
        assert_eq!(lhs, replay);
        assert_eq!(lhs.estimate(), replay.estimate());
        assert_eq!(lhs.super_estimate(), replay.super_estimate());
        assert_eq!(lhs.hyper_estimate(), replay.hyper_estimate());
    }

    #[test]
    fn test_merge_bucket_mismatch() {
        let mut lhs = CardinalityEstimator::new(64).unwrap();
        let rhs = CardinalityEstimator::new(128).unwrap();
        assert_eq!(
            lhs.merge(&rhs),
            Err(ConfigurationError::BucketCountMismatch {
                expected: 64,
                found: 128
            })
        );
    }

    #[test]
    fn test_merge_seed_mismatch() {
        let mut lhs = CardinalityEstimator::with_hasher(256, WyHashProvider::with_seed(0)).unwrap();
        let mut rhs = CardinalityEstimator::with_hasher(256, WyHashProvider::with_seed(1)).unwrap();
        lhs.observe(b"lhs");
        for i in 0u64..100 {
            rhs.observe(&i.to_be_bytes());
        }
        let before = lhs.clone();
        assert_eq!(lhs.merge(&rhs), Err(ConfigurationError::HashProviderMismatch));
        assert_eq!(lhs, before);
    }

    #[test]
    fn test_eq_compares_hashers() {
        let seed0 = CardinalityEstimator::with_hasher(64, WyHashProvider::with_seed(0)).unwrap();
        let seed1 = CardinalityEstimator::with_hasher(64, WyHashProvider::with_seed(1)).unwrap();
        assert_ne!(seed0, seed1);
        assert_eq!(seed0, CardinalityEstimator::new(64).unwrap());
    }

    #[test]
    fn test_default() {
        let e = CardinalityEstimator::<Murmur3Provider>::default();
        assert_eq!(e.bucket_count(), DEFAULT_BUCKETS);
        let expected =
            CardinalityEstimator::with_hasher(DEFAULT_BUCKETS, Murmur3Provider::default()).unwrap();
        assert_eq!(e, expected);
    }

    #[test]
    fn test_hash_providers_differ() {
        let mut wy = CardinalityEstimator::new(64).unwrap();
        let mut murmur = CardinalityEstimator::with_hasher(64, Murmur3Provider::default()).unwrap();
        for i in 0u64..100 {
            wy.observe(&i.to_be_bytes());
            murmur.observe(&i.to_be_bytes());
        }
        assert_ne!(wy.buckets(), murmur.buckets());
    }

    #[test]
    fn test_debug() {
        let e = CardinalityEstimator::new(16).unwrap();
        assert_eq!(
            format!("{:?}", e),
            format!(
                "{{ buckets: 16, estimate: 11, hyper_estimate: 0, size: {} }}",
                size_of::<CardinalityEstimator>() + 16
            )
        );
    }
}
