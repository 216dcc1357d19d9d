//! A `when`-ordered queue of [`Message`]s, shared by every `Handler` bound
//! to one `Looper`.

use crate::error::{MindroidError, Result};
use crate::handler::Handler;
use crate::message::{Message, Token};
use crate::time::now_millis;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

struct State {
    messages: Vec<Message>,
    quitting: bool,
}

pub struct MessageQueue {
    state: Mutex<State>,
    wakeup: Condvar,
    seq: AtomicU64,
}

impl MessageQueue {
    pub fn new() -> Self {
        MessageQueue {
            state: Mutex::new(State {
                messages: Vec::new(),
                quitting: false,
            }),
            wakeup: Condvar::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Inserts `msg` at the position dictated by ascending `when`, breaking
    /// ties by arrival order. Rejects once the queue has started quitting.
    pub fn enqueue(&self, mut msg: Message) -> Result<()> {
        let mut state = self.state.lock();
        if state.quitting {
            return Err(MindroidError::illegal_state("enqueue into a quitting message queue"));
        }
        msg.seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let position = state
            .messages
            .partition_point(|existing| existing.when <= msg.when);
        let was_head = position == 0;
        state.messages.insert(position, msg);
        if was_head {
            self.wakeup.notify_one();
        }
        Ok(())
    }

    /// Blocks until the head message's `when` has arrived or the queue is
    /// quitting; returns `None` on quit.
    pub fn next(&self) -> Option<Message> {
        let mut state = self.state.lock();
        loop {
            if state.quitting {
                return None;
            }
            match state.messages.first() {
                None => {
                    self.wakeup.wait(&mut state);
                }
                Some(head) => {
                    let now = now_millis();
                    if head.when <= now {
                        return Some(state.messages.remove(0));
                    }
                    let remaining = Duration::from_millis(head.when - now);
                    self.wakeup.wait_for(&mut state, remaining);
                }
            }
        }
    }

    pub fn quit(&self) {
        let mut state = self.state.lock();
        state.quitting = true;
        self.wakeup.notify_all();
    }

    pub fn remove_messages(&self, handler: &Handler, what: i32, token: Option<&Token>) {
        let mut state = self.state.lock();
        state
            .messages
            .retain(|msg| !(msg.matches_handler(handler) && msg.callback.is_none() && msg.what == what && token_matches(msg.token(), token)));
    }

    pub fn remove_callbacks(&self, handler: &Handler, token: Option<&Token>) {
        let mut state = self.state.lock();
        state
            .messages
            .retain(|msg| !(msg.matches_handler(handler) && msg.callback.is_some() && token_matches(msg.token(), token)));
    }

    pub fn remove_callbacks_and_messages(&self, handler: &Handler, token: Option<&Token>) {
        let mut state = self.state.lock();
        state
            .messages
            .retain(|msg| !(msg.matches_handler(handler) && token_matches(msg.token(), token)));
    }

    pub fn has_messages(&self, handler: &Handler, what: i32, token: Option<&Token>) -> bool {
        let state = self.state.lock();
        state
            .messages
            .iter()
            .any(|msg| msg.matches_handler(handler) && msg.callback.is_none() && msg.what == what && token_matches(msg.token(), token))
    }

    pub fn has_callbacks(&self, handler: &Handler, token: Option<&Token>) -> bool {
        let state = self.state.lock();
        state
            .messages
            .iter()
            .any(|msg| msg.matches_handler(handler) && msg.callback.is_some() && token_matches(msg.token(), token))
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        MessageQueue::new()
    }
}

fn token_matches(candidate: Option<&Token>, wanted: Option<&Token>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => candidate == Some(wanted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_thread::HandlerThread;

    #[test]
    fn dequeues_in_ascending_when_order_with_stable_ties() {
        let thread = HandlerThread::start("queue-test");
        let handler = Handler::new(thread.looper().clone());
        let queue = MessageQueue::new();

        let mut m1 = Message::new(1);
        m1.when = 10;
        m1.target = Some(handler.clone());
        let mut m2 = Message::new(2);
        m2.when = 5;
        m2.target = Some(handler.clone());
        let mut m3 = Message::new(3);
        m3.when = 5;
        m3.target = Some(handler.clone());

        queue.enqueue(m1).unwrap();
        queue.enqueue(m2).unwrap();
        queue.enqueue(m3).unwrap();

        let first = queue.state.lock().messages[0].what;
        let second = queue.state.lock().messages[1].what;
        let third = queue.state.lock().messages[2].what;
        assert_eq!((first, second, third), (2, 3, 1));
        thread.quit();
    }

    #[test]
    fn enqueue_rejected_once_quitting() {
        let thread = HandlerThread::start("queue-quit-test");
        let handler = Handler::new(thread.looper().clone());
        let queue = MessageQueue::new();
        queue.quit();
        let msg = Message::new(1);
        assert!(queue.enqueue(msg).is_err());
        let _ = handler;
        thread.quit();
    }
}
