//! Temperature conversion graph feeding a logging actor.
//!
//! Two source cells, two derived conversions, a combined delta, and an actor
//! that serializes the printing. The writes cascade on the main thread, so
//! every line is queued in the logger's mailbox before the stop message lands
//! behind them; the single `run()` at the end drains the lot.

use spindle::{signal, Actor, Scheduler, Signal};

fn main() {
    let scheduler = Scheduler::new(2);

    let celsius = Signal::new(20.0_f64);
    let room = Signal::new(22.0_f64);
    let fahrenheit = signal::map(&celsius, |c| c * 9.0 / 5.0 + 32.0);
    let kelvin = signal::map(&celsius, |c| c + 273.15);
    let delta = signal::combine(&celsius, &room, |c, r| c - r);

    let logger = Actor::new(&scheduler.handle());
    fahrenheit.keep_alive(logger.subscribe(&fahrenheit, |f: f64| {
        println!("fahrenheit: {f:.1}");
    }));
    kelvin.keep_alive(logger.subscribe(&kelvin, |k: f64| {
        println!("kelvin: {k:.2}");
    }));
    delta.keep_alive(logger.subscribe(&delta, |d: f64| {
        println!("delta from room: {d:.1}");
    }));
    scheduler.spawn(logger.run());

    celsius.set(25.0);
    room.set(20.0);
    celsius.set(30.0);

    let stopper = logger.clone();
    logger.post(move || stopper.stop());
    scheduler.run();
}
