//! End-to-end reactive graph behavior in the scheduled delivery mode.
//!
//! Ordering assertions run on a single-worker scheduler, where dispatch
//! tasks execute in spawn order and deliveries are deterministic.

mod common;

use std::sync::{Arc, Mutex};

use spindle::{signal, stream, Scheduler, Signal, Stream};

#[test]
fn signal_reads_back_its_initial_value() {
    common::init_test_logging();
    let signal = Signal::new("ready");
    assert_eq!(signal.value(), "ready");
}

#[test]
fn mapped_signal_seeds_eagerly_and_tracks_scheduled_updates() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let handle = scheduler.handle();

    let celsius = Signal::new(25_i32);
    let fahrenheit = signal::map_via(&handle, &celsius, |c| c * 9 / 5 + 32);
    assert_eq!(fahrenheit.value(), 77, "derived cell is seeded at build");

    celsius.set_via(&handle, 100);
    scheduler.run();
    assert_eq!(fahrenheit.value(), 212);
}

#[test]
fn combined_signal_applies_each_input_update() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let handle = scheduler.handle();

    let left = Signal::new(1_i32);
    let right = Signal::new(2_i32);
    let sum = signal::combine_via(&handle, &left, &right, |a, b| a + b);
    assert_eq!(sum.value(), 3);

    left.set_via(&handle, 5);
    scheduler.run();
    assert_eq!(sum.value(), 7);

    right.set_via(&handle, 4);
    scheduler.run();
    assert_eq!(sum.value(), 9);
}

#[test]
fn diamond_update_recomputes_per_input_with_visible_intermediate() {
    common::init_test_logging();
    let source = Signal::new(1_i32);
    let plus_one = signal::map(&source, |v| v + 1);
    let doubled = signal::map(&source, |v| v * 2);
    let sum = signal::combine(&plus_one, &doubled, |a, b| a + b);
    assert_eq!(sum.value(), 4);

    let updates = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&updates);
    sum.keep_alive(sum.subscribe(move |v| log.lock().unwrap().push(*v)));

    source.set(3);
    // Each input edge recomputes independently: the first recompute still
    // sees the stale second arm, then the second recompute settles it.
    assert_eq!(*updates.lock().unwrap(), vec![6, 10]);
    assert_eq!(sum.value(), 10);
}

#[test]
fn scheduled_fold_accumulates_in_emission_order() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let handle = scheduler.handle();

    let numbers = Stream::new();
    let total = stream::fold_via(&handle, &numbers, 0_i32, |acc, v| acc + v);

    let updates = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&updates);
    total.keep_alive(total.subscribe(move |v| log.lock().unwrap().push(*v)));

    for value in [1, 2, 3] {
        numbers.emit_via(&handle, value);
    }
    scheduler.run();

    assert_eq!(total.value(), 6);
    assert_eq!(*updates.lock().unwrap(), vec![1, 3, 6]);
}

#[test]
fn scheduled_filter_map_fold_pipeline_totals() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let handle = scheduler.handle();

    let numbers = Stream::new();
    let evens = stream::filter_via(&handle, &numbers, |v: &i32| v % 2 == 0);
    let scaled = stream::map_via(&handle, &evens, |v| v * 10);
    let total = stream::fold_via(&handle, &scaled, 0_i32, |acc, v| acc + v);

    let updates = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&updates);
    total.keep_alive(total.subscribe(move |v| log.lock().unwrap().push(*v)));

    for value in 1..=4 {
        numbers.emit_via(&handle, value);
    }
    scheduler.run();

    assert_eq!(total.value(), 60);
    assert_eq!(*updates.lock().unwrap(), vec![20, 60]);
}

#[test]
fn cancellation_stops_deliveries_that_start_after_it() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let handle = scheduler.handle();

    let stream = Stream::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut subscription = stream.subscribe(move |v: &i32| log.lock().unwrap().push(*v));

    stream.emit_via(&handle, 1);
    stream.emit_via(&handle, 2);
    scheduler.run();

    subscription.unsubscribe();
    stream.emit_via(&handle, 3);
    scheduler.run();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn cancellation_does_not_retract_an_already_snapshotted_delivery() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let handle = scheduler.handle();

    let stream = Stream::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut subscription = stream.subscribe(move |v: &i32| log.lock().unwrap().push(*v));

    // The observer snapshot is taken at emission time; cancelling before the
    // scheduler runs the delivery does not undo it.
    stream.emit_via(&handle, 1);
    subscription.unsubscribe();
    scheduler.run();

    assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[test]
fn dropping_an_unretained_subscription_decouples_silently() {
    common::init_test_logging();
    let source = Signal::new(0_i32);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    let subscription = source.subscribe(move |v| log.lock().unwrap().push(*v));
    source.set(1);
    drop(subscription);
    source.set(2);

    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(source.observer_count(), 0);
}

#[test]
fn keep_alive_holds_the_edge_for_the_nodes_lifetime() {
    common::init_test_logging();
    let source = Signal::new(0_i32);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Signal::new(0_i32);
    let log = Arc::clone(&seen);
    sink.keep_alive(source.subscribe(move |v| log.lock().unwrap().push(*v)));

    source.set(1);
    assert_eq!(*seen.lock().unwrap(), vec![1]);

    drop(sink);
    source.set(2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![1],
        "edge is cancelled when its owner drops"
    );
}
