//! Contains a set of compile failure doctests.

// -----------------------------------------------------------------------------
// Ensures a queue of non-send values cannot be shared across threads.

/** ```compile_fail,E0277

use std::rc::Rc;
use ticket_queue::BoundedTicketQueue;

let queue = BoundedTicketQueue::new(4).unwrap();

std::thread::scope(|s| {
    s.spawn(|| queue.push(Rc::new(22))); //~ ERROR
});

``` */
mod nonsend_shared {}

// -----------------------------------------------------------------------------
// Ensures a queue of non-send values cannot be moved to another thread.

/** ```compile_fail,E0277

use std::rc::Rc;
use ticket_queue::BoundedTicketQueue;

let queue = BoundedTicketQueue::new(4).unwrap();
queue.push(Rc::new(22));

std::thread::spawn(move || queue.pop()); //~ ERROR

``` */
mod nonsend_moved {}

// -----------------------------------------------------------------------------
// Ensures popped values cannot outlive borrowed data pushed into the queue.

/** ```compile_fail,E0597

use ticket_queue::BoundedTicketQueue;

let queue = BoundedTicketQueue::new(4).unwrap();
{
    let local = String::from("short lived");
    queue.push(&local); //~ ERROR
}
let _ = queue.pop();

``` */
mod borrowed_value_outlived {}
