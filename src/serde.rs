//! # Serde module for BloomFilter and CardinalityEstimator
//!
//! Enabled with the `with_serde` feature.
//!
//! `BloomFilter` is serialized as a tuple `(num_bits, words)`: `num_bits` is the
//! width tag (256 or 65536) and `words` is the bit vector as `u64` words in index
//! order, where bit `i` is bit `i % 64` of word `i / 64`.
//!
//! `CardinalityEstimator` is serialized as its bucket values, one `u8` per bucket in
//! bucket-index order.
//!
//! The hash provider is not part of the serialized form, deserialized values use
//! `H::default()`. Deserializing into a provider different from the one used to
//! build the original value silently breaks lookups.
//!
//! Deserialization validates the configuration and fails with the corresponding
//! `ConfigurationError` message on unsupported widths, wrong word counts, bucket
//! counts which are not a power of two, and bucket values above 64.
use serde::de::Error;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::bloom::{BloomFilter, BloomWidth};
use crate::estimator::CardinalityEstimator;
use crate::hash::HashProvider;

impl<H: HashProvider> Serialize for BloomFilter<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.num_bits())?;
        tup.serialize_element(&self.words)?;
        tup.end()
    }
}

impl<'de, H: HashProvider + Default> Deserialize<'de> for BloomFilter<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (bits, words): (usize, Vec<u64>) = Deserialize::deserialize(deserializer)?;
        BloomWidth::try_from(bits)
            .and_then(|width| BloomFilter::from_words(width, words, H::default()))
            .map_err(D::Error::custom)
    }
}

impl<H: HashProvider> Serialize for CardinalityEstimator<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.buckets.serialize(serializer)
    }
}

impl<'de, H: HashProvider + Default> Deserialize<'de> for CardinalityEstimator<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let buckets: Vec<u8> = Deserialize::deserialize(deserializer)?;
        CardinalityEstimator::from_buckets(buckets, H::default()).map_err(D::Error::custom)
    }
}
