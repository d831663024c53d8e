#![no_main]

use libfuzzer_sys::fuzz_target;
use stream_estimators::CardinalityEstimator;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut estimator1 = CardinalityEstimator::new(64).unwrap();
    let mut replay = CardinalityEstimator::new(64).unwrap();
    for chunk in first_half.chunks(4) {
        let before = estimator1.buckets().to_vec();
        estimator1.observe(chunk);
        replay.observe(chunk);
        assert!(before.iter().zip(estimator1.buckets()).all(|(old, new)| new >= old));
        assert!(estimator1.estimate() > 0);
    }

    let mut estimator2 = CardinalityEstimator::new(64).unwrap();
    for chunk in second_half.chunks(4) {
        estimator2.observe(chunk);
        replay.observe(chunk);
    }

    estimator1.merge(&estimator2).unwrap();
    assert_eq!(estimator1, replay);
    assert_eq!(estimator1.super_estimate(), replay.super_estimate());
});
