//! A fixed pool of workers draining a shared job queue.
//!
//! The queue has no notion of being closed, so shutdown is signalled in-band:
//! after the last job the main thread pushes one `Job::Stop` per worker.

use std::thread;
use std::time::Duration;
use std::time::Instant;

use ticket_queue::BoundedTicketQueue;
use tracing::Level;
use tracing::info;

const WORKERS: usize = 4;
const JOBS: u64 = 64;

enum Job {
    /// Sum the integers below this bound.
    Sum(u64),
    /// Tells the receiving worker to exit.
    Stop,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_thread_names(true)
        .init();

    let jobs = BoundedTicketQueue::with_capacity(8);
    let results = BoundedTicketQueue::with_capacity(JOBS as usize);
    let start = Instant::now();

    thread::scope(|s| {
        for index in 0..WORKERS {
            let jobs = &jobs;
            let results = &results;
            thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn_scoped(s, move || {
                    let mut done = 0;
                    loop {
                        match jobs.pop() {
                            Job::Sum(bound) => {
                                results.push((0..bound).sum::<u64>());
                                done += 1;
                            }
                            Job::Stop => break,
                        }
                    }
                    info!(done, "worker exiting");
                })
                .unwrap();
        }

        for n in 0..JOBS {
            // A full queue means the workers are behind, so back off briefly
            // instead of spinning in `push`.
            let mut job = Job::Sum(n * 1_000);
            while let Err(rejected) = jobs.try_push(job) {
                job = rejected;
                thread::sleep(Duration::from_micros(50));
            }
        }

        for _ in 0..WORKERS {
            jobs.push(Job::Stop);
        }
    });

    let mut total = 0u64;
    while let Some(sum) = results.try_pop() {
        total += sum;
    }

    info!(
        total,
        elapsed = ?start.elapsed(),
        "all jobs complete"
    );
}
