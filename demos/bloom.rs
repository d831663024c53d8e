use stream_estimators::{BloomFilter, BloomWidth};

fn main() {
    let mut filter = BloomFilter::new(BloomWidth::Width65536);
    for word in ["apple", "banana", "cherry"] {
        filter.observe(word);
    }

    for word in ["apple", "banana", "cherry", "durian"] {
        println!("{word}: {}", filter.check(word));
    }
    println!(
        "false positive probability at 3 items = {:.3e}, {:?}",
        filter.false_positive_probability(3),
        filter
    );
}
