use stream_estimators::CardinalityEstimator;

fn main() {
    let mut estimator1 = CardinalityEstimator::new(1024).unwrap();
    for i in 0u64..10_000 {
        estimator1.observe(&i.to_be_bytes());
    }
    println!(
        "estimator1 estimate = {}, super = {}, hyper = {}",
        estimator1.estimate(),
        estimator1.super_estimate(),
        estimator1.hyper_estimate()
    );

    let mut estimator2 = CardinalityEstimator::new(1024).unwrap();
    for i in 5_000u64..15_000 {
        estimator2.observe(&i.to_be_bytes());
    }
    println!("estimator2 hyper = {}", estimator2.hyper_estimate());

    estimator1.merge(&estimator2).unwrap();
    println!("merged hyper = {}", estimator1.hyper_estimate());

    if let Err(err) = CardinalityEstimator::new(1000) {
        println!("1000 buckets: {err}");
    }
}
