#![no_main]

use libfuzzer_sys::fuzz_target;
use stream_estimators::{BloomFilter, BloomWidth};

fuzz_target!(|data: &[u8]| {
    for width in [BloomWidth::Width256, BloomWidth::Width65536] {
        let mut filter = BloomFilter::new(width);
        for chunk in data.chunks(3) {
            filter.observe(chunk);
        }
        assert!(data.chunks(3).all(|chunk| filter.check(chunk)));
        assert!(filter.bits_set() <= data.len().div_ceil(3) * width.hashes());
    }
});
