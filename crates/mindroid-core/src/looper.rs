//! A thread-bound cooperative event loop.
//!
//! Exactly one `Looper` may be prepared per thread. Most code never calls
//! [`Looper::prepare`] directly — use [`crate::handler_thread::HandlerThread`]
//! to spin up a thread with a Looper already running.

use crate::queue::MessageQueue;
use std::cell::RefCell;
use std::sync::Arc;

pub struct Looper {
    queue: Arc<MessageQueue>,
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<Looper>>> = const { RefCell::new(None) };
}

impl Looper {
    /// Prepares a Looper for the calling thread. Panics if this thread
    /// already has one — Android's `Looper.prepare()` throws for the same
    /// reason: a second message queue per thread has no sensible owner.
    pub fn prepare() -> Arc<Looper> {
        CURRENT.with(|cell| {
            let mut slot = cell.borrow_mut();
            assert!(slot.is_none(), "a Looper is already prepared for this thread");
            let looper = Arc::new(Looper {
                queue: Arc::new(MessageQueue::new()),
            });
            *slot = Some(looper.clone());
            looper
        })
    }

    /// The calling thread's Looper, if [`Looper::prepare`] has run on it.
    pub fn my_looper() -> Option<Arc<Looper>> {
        CURRENT.with(|cell| cell.borrow().clone())
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// Runs the loop: repeatedly dequeues the head message and dispatches
    /// it, until the queue reports quit.
    pub fn run(looper: &Arc<Looper>) {
        while let Some(msg) = looper.queue.next() {
            let _span = crate::observability::dispatch_span(msg.what).entered();
            crate::handler::dispatch(msg);
        }
    }

    pub fn quit(&self) {
        self.queue.quit();
    }
}
