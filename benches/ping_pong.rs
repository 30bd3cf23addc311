//! A latency benchmark: two threads bounce a value back and forth.

use std::sync::mpsc::sync_channel;
use std::thread;

use divan::Bencher;
use ticket_queue::BoundedTicketQueue;

const ROUND_TRIPS: &[usize] = &[1, 100, 10_000];

fn round_trips() -> impl Iterator<Item = usize> {
    ROUND_TRIPS.iter().copied()
}

// -----------------------------------------------------------------------------
// Benchmark

#[divan::bench(args = round_trips(), threads = false)]
fn ticket_queue(bencher: Bencher, trips: usize) {
    let ping = BoundedTicketQueue::new(1).unwrap();
    let pong = BoundedTicketQueue::new(1).unwrap();

    bencher.bench_local(|| {
        thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..trips {
                    let value: usize = ping.pop();
                    pong.push(value + 1);
                }
            });

            let mut value = 0;
            for _ in 0..trips {
                ping.push(value);
                value = pong.pop();
            }
            divan::black_box(value)
        })
    });
}

#[divan::bench(args = round_trips(), threads = false)]
fn std_sync_channel(bencher: Bencher, trips: usize) {
    bencher.bench_local(|| {
        let (ping_tx, ping_rx) = sync_channel::<usize>(1);
        let (pong_tx, pong_rx) = sync_channel::<usize>(1);

        thread::scope(|s| {
            s.spawn(move || {
                for _ in 0..trips {
                    let value = ping_rx.recv().unwrap();
                    pong_tx.send(value + 1).unwrap();
                }
            });

            let mut value = 0;
            for _ in 0..trips {
                ping_tx.send(value).unwrap();
                value = pong_rx.recv().unwrap();
            }
            divan::black_box(value)
        })
    });
}

fn main() {
    divan::main();
}
