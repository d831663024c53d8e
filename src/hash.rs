//! Hash providers used to turn item bytes into the 64-bit value both sketches slice up.
//!
//! Every bit-slice of a provider's output is treated as an independent uniform hash,
//! so providers must have good avalanche behaviour. Cryptographic strength is not required.

use std::hash::{BuildHasherDefault, Hasher};

/// Seed perturbation used to derive the second half of 128-bit outputs.
const SEED_SPLIT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Source of deterministic hashes for arbitrary byte input.
pub trait HashProvider {
    /// Return a 64-bit hash of `bytes`.
    fn hash64(&self, bytes: &[u8]) -> u64;

    /// Return a 128-bit hash of `bytes`. Not used by the sketches themselves.
    fn hash128(&self, bytes: &[u8]) -> u128;
}

/// [wyhash](https://github.com/wangyi-fudan/wyhash) based provider, used by default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WyHashProvider {
    pub seed: u64,
}

impl WyHashProvider {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl HashProvider for WyHashProvider {
    #[inline]
    fn hash64(&self, bytes: &[u8]) -> u64 {
        wyhash::wyhash(bytes, self.seed)
    }

    #[inline]
    fn hash128(&self, bytes: &[u8]) -> u128 {
        let hi = wyhash::wyhash(bytes, self.seed);
        let lo = wyhash::wyhash(bytes, self.seed ^ SEED_SPLIT);
        (u128::from(hi) << 64) | u128::from(lo)
    }
}

/// MurmurHash3 (x64, 128-bit variant) provider.
///
/// `hash64` returns the first half of the 128-bit digest, which matches the
/// widespread `Sum64` convention, so filters built with seed 0 index the same bits
/// as other MurmurHash3 based implementations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Murmur3Provider {
    pub seed: u32,
}

impl Murmur3Provider {
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

impl HashProvider for Murmur3Provider {
    #[inline]
    fn hash64(&self, bytes: &[u8]) -> u64 {
        mur3::murmurhash3_x64_128(bytes, self.seed).0
    }

    #[inline]
    fn hash128(&self, bytes: &[u8]) -> u128 {
        let (h1, h2) = mur3::murmurhash3_x64_128(bytes, self.seed);
        (u128::from(h1) << 64) | u128::from(h2)
    }
}

/// Any default-constructible [`Hasher`] can act as a provider. Bytes are written
/// without a length prefix, so `hash64(b)` equals `H::default()` fed `write(b)`.
impl<H: Hasher + Default> HashProvider for BuildHasherDefault<H> {
    #[inline]
    fn hash64(&self, bytes: &[u8]) -> u64 {
        let mut hasher = H::default();
        hasher.write(bytes);
        hasher.finish()
    }

    fn hash128(&self, bytes: &[u8]) -> u128 {
        let hi = self.hash64(bytes);
        let mut hasher = H::default();
        hasher.write_u8(0xff);
        hasher.write(bytes);
        (u128::from(hi) << 64) | u128::from(hasher.finish())
    }
}
