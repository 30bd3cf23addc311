//! Tests using the Shuttle testing framework.

#![cfg(feature = "shuttle")]

use shuttle::sync::Arc;
use shuttle::thread;

use ticket_queue::BoundedTicketQueue;

// -----------------------------------------------------------------------------
// Infrastructure

/// Spawns `producers` threads that each push `per_producer` values tagged with
/// their index, and `consumers` threads that pop an equal share. Returns every
/// value received, in the order each consumer saw them.
fn exchange(
    capacity: usize,
    producers: usize,
    consumers: usize,
    per_producer: usize,
) -> Vec<Vec<(usize, usize)>> {
    let queue = Arc::new(BoundedTicketQueue::new(capacity).unwrap());
    let total = producers * per_producer;
    assert_eq!(total % consumers, 0);

    let producer_handles: Vec<_> = (0..producers)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    queue.push((p, i));
                }
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                (0..total / consumers)
                    .map(|_| queue.pop())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in producer_handles {
        handle.join().unwrap();
    }

    consumer_handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect()
}

fn check_exactly_once(received: &[Vec<(usize, usize)>], producers: usize, per_producer: usize) {
    let mut all: Vec<_> = received.iter().flatten().copied().collect();
    all.sort();
    let expected: Vec<_> = (0..producers)
        .flat_map(|p| (0..per_producer).map(move |i| (p, i)))
        .collect();
    assert_eq!(all, expected);
}

// -----------------------------------------------------------------------------
// Blocking operations

/// One producer, one consumer: values arrive in push order.
#[test]
pub fn spsc_fifo() {
    shuttle::check_random(
        || {
            let received = exchange(2, 1, 1, 5);
            let values: Vec<_> = received[0].iter().map(|&(_, i)| i).collect();
            assert_eq!(values, [0, 1, 2, 3, 4]);
        },
        1_000,
    );
}

/// Several producers and consumers: nothing lost, nothing duplicated, and each
/// consumer sees any one producer's values in order.
#[test]
pub fn mpmc_exactly_once() {
    shuttle::check_pct(
        || {
            let received = exchange(2, 2, 2, 3);
            check_exactly_once(&received, 2, 3);

            for values in &received {
                for p in 0..2 {
                    let from_p: Vec<_> = values.iter().filter(|v| v.0 == p).collect();
                    assert!(from_p.windows(2).all(|w| w[0].1 < w[1].1));
                }
            }
        },
        1_000,
        3,
    );
}

// -----------------------------------------------------------------------------
// Non-blocking operations

/// Producers retry `try_push` and consumers retry `try_pop` until everything
/// has been delivered.
#[test]
pub fn try_exchange() {
    shuttle::check_random(
        || {
            let queue = Arc::new(BoundedTicketQueue::new(1).unwrap());

            let producers: Vec<_> = (0..2)
                .map(|p| {
                    let queue = queue.clone();
                    thread::spawn(move || {
                        for i in 0..2 {
                            let mut value = (p, i);
                            while let Err(back) = queue.try_push(value) {
                                value = back;
                                thread::yield_now();
                            }
                        }
                    })
                })
                .collect();

            let mut received = Vec::new();
            while received.len() < 4 {
                match queue.try_pop() {
                    Some(value) => received.push(value),
                    None => thread::yield_now(),
                }
            }

            for handle in producers {
                handle.join().unwrap();
            }

            check_exactly_once(&[received], 2, 2);
            assert!(queue.is_empty());
        },
        1_000,
    );
}
