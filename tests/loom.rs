//! Tests using the `loom` testing framework.

#![cfg(loom)]

use loom::model::Builder;
use loom::sync::Arc;
use loom::thread;
use tracing::Level;
use tracing::info;
use tracing_subscriber::fmt::Subscriber;

use ticket_queue::BoundedTicketQueue;

fn model<F>(f: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let subscriber = Subscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .without_time()
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut model = Builder::new();
        model.log = true;
        model.check(f);
    });
}

// A single producer and consumer hand two values through a queue that can
// only hold one, so every push after the first waits on a pop.
#[test]
pub fn spsc_blocking() {
    model(|| {
        let queue = Arc::new(BoundedTicketQueue::new(1).unwrap());

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                queue.push(1);
                queue.push(2);
            })
        };

        assert_eq!(queue.pop(), 1);
        assert_eq!(queue.pop(), 2);
        producer.join().unwrap();
        info!("### MODEL COMPLETE");
    });
}

// Two producers race for the same slot, and the consumer must see both values
// exactly once.
#[test]
pub fn mpsc_blocking() {
    model(|| {
        let queue = Arc::new(BoundedTicketQueue::new(2).unwrap());

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let queue = queue.clone();
                thread::spawn(move || queue.push(i))
            })
            .collect();

        let a = queue.pop();
        let b = queue.pop();
        assert_ne!(a, b);
        assert_eq!(a + b, 1);

        for handle in handles {
            handle.join().unwrap();
        }
    });
}

// Two consumers race for one value each.
#[test]
pub fn spmc_blocking() {
    model(|| {
        let queue = Arc::new(BoundedTicketQueue::new(2).unwrap());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.pop())
            })
            .collect();

        queue.push(10);
        queue.push(20);

        let mut received: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        received.sort();
        assert_eq!(received, [10, 20]);
    });
}

// The non-blocking variants may fail, but may never lose or duplicate values.
#[test]
pub fn try_push_try_pop() {
    model(|| {
        let queue = Arc::new(BoundedTicketQueue::new(1).unwrap());

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut pushed = 0;
                for i in 0..2 {
                    if queue.try_push(i).is_ok() {
                        pushed += 1;
                    }
                }
                pushed
            })
        };

        let mut popped = 0;
        if queue.try_pop().is_some() {
            popped += 1;
        }

        let pushed = producer.join().unwrap();
        while queue.try_pop().is_some() {
            popped += 1;
        }

        assert!(pushed >= 1);
        assert_eq!(pushed, popped);
        assert!(queue.is_empty());
    });
}

// Values still in the queue when the last handle goes away are dropped.
#[test]
pub fn drop_with_values() {
    model(|| {
        let tracker = Arc::new(());
        let queue = Arc::new(BoundedTicketQueue::new(2).unwrap());

        let producer = {
            let queue = queue.clone();
            let tracker = tracker.clone();
            thread::spawn(move || queue.push(tracker))
        };

        queue.push(tracker.clone());
        producer.join().unwrap();
        drop(queue);

        assert_eq!(Arc::strong_count(&tracker), 1);
    });
}
