//! Fixed-width Bloom filter for approximate set membership.
//!
//! A single 64-bit hash is split into `k` non-overlapping sub-hashes of `w = log2(m)`
//! bits each, most significant slice first, and every sub-hash selects one bit of the
//! `m`-bit vector. When `k * w < 64` the remaining low-order bits are ignored.
//!
//! | width           | `m`   | `k` | `w` | bits consumed |
//! |-----------------|-------|-----|-----|---------------|
//! | `Width256`      | 256   | 2   | 8   | top 16        |
//! | `Width65536`    | 65536 | 4   | 16  | all 64        |
//!
//! Bits are only ever set, so a filter never reports a false negative for an
//! item it has observed.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

use tracing::{debug, warn};

use crate::bits::count_ones_in_words;
use crate::error::{ConfigurationError, Result};
use crate::hash::{HashProvider, WyHashProvider};

/// Supported filter widths, each carrying its derived constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloomWidth {
    /// 256 bits probed by 2 sub-hashes.
    Width256,
    /// 65536 bits probed by 4 sub-hashes.
    Width65536,
}

impl BloomWidth {
    /// Number of bits `m`
    #[inline]
    pub const fn bits(self) -> usize {
        match self {
            BloomWidth::Width256 => 256,
            BloomWidth::Width65536 => 65536,
        }
    }

    /// Number of sub-hashes `k`
    #[inline]
    pub const fn hashes(self) -> usize {
        match self {
            BloomWidth::Width256 => 2,
            BloomWidth::Width65536 => 4,
        }
    }

    /// Width of a single sub-hash, `log2(m)`
    #[inline]
    pub const fn sub_hash_bits(self) -> u32 {
        self.bits().trailing_zeros()
    }

    /// Number of `u64` words backing the bit vector
    #[inline]
    pub const fn words(self) -> usize {
        self.bits() / 64
    }

    /// Return the `i`-th sub-hash (bit index) of `hash`.
    #[inline]
    fn sub_hash(self, hash: u64, i: usize) -> usize {
        let w = self.sub_hash_bits();
        let shift = 64 - w * (i as u32 + 1);
        ((hash >> shift) as usize) & (self.bits() - 1)
    }
}

impl TryFrom<usize> for BloomWidth {
    type Error = ConfigurationError;

    /// Map a raw bit count onto a supported width.
    fn try_from(bits: usize) -> Result<Self> {
        match bits {
            256 => Ok(BloomWidth::Width256),
            65536 => Ok(BloomWidth::Width65536),
            _ => Err(ConfigurationError::UnsupportedBloomWidth(bits)),
        }
    }
}

/// Bloom filter over byte items.
///
/// ```
/// use stream_estimators::bloom::{BloomFilter, BloomWidth};
///
/// let mut filter = BloomFilter::new(BloomWidth::Width65536);
/// filter.observe(b"apple");
/// assert!(filter.check(b"apple"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter<H: HashProvider = WyHashProvider> {
    width: BloomWidth,
    /// Bit `i` lives in word `i / 64` at position `i % 64`.
    pub(crate) words: Vec<u64>,
    hasher: H,
}

impl BloomFilter {
    /// Creates an empty filter of the given width using the default hash provider.
    pub fn new(width: BloomWidth) -> Self {
        Self::with_hasher(width, WyHashProvider::default())
    }

    /// Creates an empty filter from a raw bit count, which must be one of the
    /// supported widths.
    pub fn with_bits(bits: usize) -> Result<Self> {
        let width = BloomWidth::try_from(bits).inspect_err(|err| {
            warn!(bits, %err, "rejecting bloom filter configuration");
        })?;
        Ok(Self::new(width))
    }
}

impl<H: HashProvider> BloomFilter<H> {
    /// Creates an empty filter which hashes items with `hasher`.
    pub fn with_hasher(width: BloomWidth, hasher: H) -> Self {
        debug!(
            bits = width.bits(),
            hashes = width.hashes(),
            "creating bloom filter"
        );
        Self {
            width,
            words: vec![0; width.words()],
            hasher,
        }
    }

    /// Adds an item to the filter.
    #[inline]
    pub fn observe<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) {
        let hash = self.hasher.hash64(item.as_ref());
        self.observe_hash(hash);
    }

    /// Alias for [`BloomFilter::observe`].
    #[inline]
    pub fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) {
        self.observe(item);
    }

    /// Adds an already hashed item to the filter.
    #[inline]
    pub fn observe_hash(&mut self, hash: u64) {
        for i in 0..self.width.hashes() {
            let bit = self.width.sub_hash(hash, i);
            self.words[bit / 64] |= 1 << (bit % 64);
        }
    }

    /// Returns `false` if the item was definitely never observed, `true` if it
    /// probably was.
    #[inline]
    pub fn check<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool {
        self.check_hash(self.hasher.hash64(item.as_ref()))
    }

    /// Same as [`BloomFilter::check`] for an already hashed item.
    #[inline]
    pub fn check_hash(&self, hash: u64) -> bool {
        (0..self.width.hashes()).all(|i| {
            let bit = self.width.sub_hash(hash, i);
            self.words[bit / 64] & (1 << (bit % 64)) != 0
        })
    }

    /// Probability of a false positive after `n` distinct items were observed:
    /// `(1 - e^(-k * (n + 0.5) / (m - 1)))^k`.
    pub fn false_positive_probability(&self, n: u64) -> f64 {
        let k = self.width.hashes() as f64;
        let m = self.width.bits() as f64;
        (1.0 - (-k * (n as f64 + 0.5) / (m - 1.0)).exp()).powf(k)
    }

    /// Configured width
    #[inline]
    pub fn width(&self) -> BloomWidth {
        self.width
    }

    #[inline]
    pub fn num_bits(&self) -> usize {
        self.width.bits()
    }

    #[inline]
    pub fn num_hashes(&self) -> usize {
        self.width.hashes()
    }

    /// Number of bits currently set
    pub fn bits_set(&self) -> usize {
        count_ones_in_words(&self.words) as usize
    }

    /// Fraction of bits currently set
    pub fn fill_ratio(&self) -> f64 {
        self.bits_set() as f64 / self.num_bits() as f64
    }

    /// False positive rate implied by the current fill ratio, `fill_ratio^k`.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        self.fill_ratio().powi(self.num_hashes() as i32)
    }

    /// Return memory size of `BloomFilter`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.words.as_slice())
    }

    /// Build a filter around existing words, which must hold exactly `width.words()` entries.
    #[cfg(feature = "with_serde")]
    pub(crate) fn from_words(width: BloomWidth, words: Vec<u64>, hasher: H) -> Result<Self> {
        if words.len() != width.words() {
            return Err(ConfigurationError::InvalidWordCount {
                expected: width.words(),
                found: words.len(),
            });
        }
        Ok(Self {
            width,
            words,
            hasher,
        })
    }
}

impl<H: HashProvider + PartialEq> BloomFilter<H> {
    /// Merges `rhs` into `self`, producing the filter that would result from
    /// observing both streams. Widths and hash providers must match, otherwise
    /// `self` is left unchanged.
    pub fn merge(&mut self, rhs: &Self) -> Result<()> {
        if self.width != rhs.width {
            warn!(expected = ?self.width, found = ?rhs.width, "refusing to merge bloom filters");
            return Err(ConfigurationError::BloomWidthMismatch {
                expected: self.width,
                found: rhs.width,
            });
        }
        if self.hasher != rhs.hasher {
            warn!(
                bits = self.width.bits(),
                "refusing to merge bloom filters with different hashers"
            );
            return Err(ConfigurationError::HashProviderMismatch);
        }
        debug!(bits = self.width.bits(), "merging bloom filters");
        self.words
            .iter_mut()
            .zip(rhs.words.iter())
            .for_each(|(lhs, rhs)| *lhs |= rhs);
        Ok(())
    }
}

impl<H: HashProvider> Debug for BloomFilter<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ bits: {}, hashes: {}, bits_set: {}, size: {} }}",
            self.num_bits(),
            self.num_hashes(),
            self.bits_set(),
            self.size_of()
        )
    }
}
