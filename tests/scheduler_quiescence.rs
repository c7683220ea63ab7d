//! Quiescence semantics of `Scheduler::run` and cooperative yielding across
//! worker configurations.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spindle::{yield_now, Scheduler, Task};

#[test]
fn run_waits_for_recursively_spawned_chains() {
    common::init_test_logging();
    let scheduler = Scheduler::new(4);
    let handle = scheduler.handle();
    let completed = Arc::new(AtomicUsize::new(0));

    fn spawn_chain(handle: spindle::SchedulerHandle, completed: Arc<AtomicUsize>, depth: usize) {
        if depth == 0 {
            return;
        }
        let next_handle = handle.clone();
        handle.spawn(Task::new(async move {
            yield_now().await;
            completed.fetch_add(1, Ordering::SeqCst);
            spawn_chain(next_handle.clone(), Arc::clone(&completed), depth - 1);
        }));
    }

    spawn_chain(handle, Arc::clone(&completed), 50);
    scheduler.run();
    assert_eq!(completed.load(Ordering::SeqCst), 50);
    assert!(scheduler.is_quiescent());
}

#[test]
fn many_yielding_tasks_all_complete() {
    common::init_test_logging();
    let scheduler = Scheduler::new(4);
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let completed = Arc::clone(&completed);
        scheduler.spawn(Task::new(async move {
            for _ in 0..3 {
                yield_now().await;
            }
            completed.fetch_add(1, Ordering::SeqCst);
        }));
    }

    scheduler.run();
    assert_eq!(completed.load(Ordering::SeqCst), 100);
    assert_eq!(scheduler.queued_tasks(), 0);
    assert_eq!(scheduler.active_tasks(), 0);
}

#[test]
fn work_spawned_after_run_needs_another_run() {
    common::init_test_logging();
    let scheduler = Scheduler::new(2);
    let first = Arc::new(AtomicBool::new(false));
    let second = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&first);
    scheduler.spawn(Task::new(async move {
        flag.store(true, Ordering::SeqCst);
    }));
    scheduler.run();
    assert!(first.load(Ordering::SeqCst));

    let flag = Arc::clone(&second);
    scheduler.spawn(Task::new(async move {
        flag.store(true, Ordering::SeqCst);
    }));
    scheduler.run();
    assert!(second.load(Ordering::SeqCst));
}

#[test]
fn single_worker_round_robins_yielding_tasks() {
    common::init_test_logging();
    let scheduler = Scheduler::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for id in 1..=3_u32 {
        let order = Arc::clone(&order);
        scheduler.spawn(Task::new(async move {
            for _ in 0..3 {
                order.lock().unwrap().push(id);
                yield_now().await;
            }
        }));
    }

    scheduler.run();
    assert_eq!(
        *order.lock().unwrap(),
        vec![1, 2, 3, 1, 2, 3, 1, 2, 3],
        "yielded tasks rejoin at the back of the queue"
    );
}

#[test]
fn mutually_waiting_tasks_complete_by_yielding() {
    common::init_test_logging();
    let scheduler = Scheduler::new(2);
    let first_ready = Arc::new(AtomicBool::new(false));
    let second_ready = Arc::new(AtomicBool::new(false));

    let mine = Arc::clone(&first_ready);
    let theirs = Arc::clone(&second_ready);
    scheduler.spawn(Task::new(async move {
        mine.store(true, Ordering::SeqCst);
        while !theirs.load(Ordering::SeqCst) {
            yield_now().await;
        }
    }));

    let mine = Arc::clone(&second_ready);
    let theirs = Arc::clone(&first_ready);
    scheduler.spawn(Task::new(async move {
        mine.store(true, Ordering::SeqCst);
        while !theirs.load(Ordering::SeqCst) {
            yield_now().await;
        }
    }));

    // Cooperative yielding lets both make progress on any worker count.
    scheduler.run();
    assert!(scheduler.is_quiescent());
}

#[test]
fn handles_spawn_from_other_threads() {
    common::init_test_logging();
    let scheduler = Scheduler::new(2);
    let handle = scheduler.handle();
    let completed = Arc::new(AtomicUsize::new(0));

    let spawners: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            let completed = Arc::clone(&completed);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let completed = Arc::clone(&completed);
                    handle.spawn(Task::new(async move {
                        completed.fetch_add(1, Ordering::SeqCst);
                    }));
                }
            })
        })
        .collect();
    for spawner in spawners {
        spawner.join().unwrap();
    }

    scheduler.run();
    assert_eq!(completed.load(Ordering::SeqCst), 100);
}
