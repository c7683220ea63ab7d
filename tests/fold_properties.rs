//! Property tests: stream pipelines agree with their iterator equivalents,
//! and cancellation cuts delivery at exactly the cancel point.

mod common;

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use spindle::{stream, Scheduler, Stream};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fold_matches_iterator_fold(values in prop::collection::vec(any::<i32>(), 0..64)) {
        common::init_test_logging();
        let source = Stream::new();
        let total = stream::fold(&source, 0_i64, |acc, v: &i32| acc + i64::from(*v));

        for value in &values {
            source.emit(*value);
        }

        let expected: i64 = values.iter().copied().map(i64::from).sum();
        prop_assert_eq!(total.value(), expected);
    }

    #[test]
    fn scheduled_pipeline_matches_iterator_pipeline(
        values in prop::collection::vec(-1000_i32..1000, 0..32),
    ) {
        common::init_test_logging();
        let scheduler = Scheduler::new(1);
        let handle = scheduler.handle();

        let source = Stream::new();
        let evens = stream::filter_via(&handle, &source, |v: &i32| v % 2 == 0);
        let scaled = stream::map_via(&handle, &evens, |v| v * 10);
        let total = stream::fold_via(&handle, &scaled, 0_i64, |acc, v: &i32| {
            acc + i64::from(*v)
        });

        for value in &values {
            source.emit_via(&handle, *value);
        }
        scheduler.run();

        let expected: i64 = values
            .iter()
            .copied()
            .filter(|v| v % 2 == 0)
            .map(|v| i64::from(v) * 10)
            .sum();
        prop_assert_eq!(total.value(), expected);
    }

    #[test]
    fn cancelling_after_k_emissions_observes_exactly_the_first_k(
        values in prop::collection::vec(any::<i32>(), 0..32),
        cut in 0_usize..32,
    ) {
        common::init_test_logging();
        let source = Stream::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        let mut subscription = source.subscribe(move |v: &i32| log.lock().unwrap().push(*v));

        let cut = cut.min(values.len());
        for value in &values[..cut] {
            source.emit(*value);
        }
        subscription.unsubscribe();
        for value in &values[cut..] {
            source.emit(*value);
        }

        let seen = seen.lock().unwrap();
        prop_assert_eq!(seen.as_slice(), &values[..cut]);
    }
}
