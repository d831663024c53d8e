#![no_main]

use libfuzzer_sys::fuzz_target;
use stream_estimators::{BloomFilter, CardinalityEstimator};

fuzz_target!(|data: &[u8]| {
    if let Ok(mut estimator) = serde_json::from_slice::<CardinalityEstimator>(data) {
        estimator.observe(&1u64.to_be_bytes());
        assert!(estimator.buckets().iter().all(|&b| b <= 64));
        assert_eq!(estimator.hyper_estimate(), estimator.hyper_estimate());
    }
    if let Ok(mut filter) = serde_json::from_slice::<BloomFilter>(data) {
        filter.observe(&1u64.to_be_bytes());
        assert!(filter.check(&1u64.to_be_bytes()));
    }
});
