//! One sensor stream fanned out to several printer actors.
//!
//! A filter keeps only spike readings; every printer actor gets its own
//! mailbox, so each printer's lines come out in emission order. The
//! emissions cascade on the main thread, landing every spike in every
//! mailbox before the stop messages do; one `run()` then drains all five
//! loops.

use spindle::{stream, Actor, Scheduler, Stream};

fn main() {
    let scheduler = Scheduler::new(4);

    let samples = Stream::new();
    let spikes = stream::filter(&samples, |v: &i32| *v > 50);

    let printers: Vec<_> = (0..5)
        .map(|id| {
            let printer = Actor::new(&scheduler.handle());
            spikes.keep_alive(printer.subscribe(&spikes, move |value: i32| {
                println!("printer {id}: spike {value}");
            }));
            scheduler.spawn(printer.run());
            printer
        })
        .collect();

    for value in [12, 88, 45, 61, 99, 3] {
        samples.emit(value);
    }

    for printer in &printers {
        let stopper = printer.clone();
        printer.post(move || stopper.stop());
    }
    scheduler.run();
}
