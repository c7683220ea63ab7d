//! A long-running task reporting progress through a stream.
//!
//! The worker task does one slice of work per turn and yields between
//! slices; a monitor actor prints each progress step and stops itself when
//! the work is complete.

use spindle::{yield_now, ReactiveContext, Scheduler, Task};

fn main() {
    let scheduler = Scheduler::new(2);
    let ctx = ReactiveContext::new(scheduler.handle());

    let progress = ctx.stream();
    let monitor = ctx.actor();
    let stopper = monitor.clone();
    progress.keep_alive(monitor.subscribe(&progress, move |step: u32| {
        println!("progress: {}%", step * 25);
        if step == 4 {
            stopper.stop();
        }
    }));
    scheduler.spawn(monitor.run());

    let emitter = progress.clone();
    let handle = ctx.scheduler().clone();
    ctx.spawn(Task::new(async move {
        for step in 1..=4_u32 {
            emitter.emit_via(&handle, step);
            yield_now().await;
        }
    }));

    scheduler.run();
    println!("done");
}
