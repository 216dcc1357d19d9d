//! A façade that submits messages and runnables to a Looper.

use crate::executor::Executor;
use crate::looper::Looper;
use crate::message::{Message, Runnable, Token};
use crate::time::now_millis;
use crate::error::Result;
use std::sync::Arc;

type CallbackFn = dyn Fn(&Message) -> bool + Send + Sync;
type HandleMessageFn = dyn Fn(&Message) + Send + Sync;

struct HandlerInner {
    looper: Arc<Looper>,
    callback: Option<Box<CallbackFn>>,
    handle_message: Option<Box<HandleMessageFn>>,
}

/// Dispatch policy, in order: a message-local callback runs if present;
/// otherwise the handler's constructor-supplied callback runs and can
/// short-circuit `handleMessage` by returning `true`; otherwise
/// `handleMessage` runs.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl Handler {
    pub fn new(looper: Arc<Looper>) -> Self {
        Handler {
            inner: Arc::new(HandlerInner {
                looper,
                callback: None,
                handle_message: None,
            }),
        }
    }

    pub fn with_handle_message(looper: Arc<Looper>, handle_message: impl Fn(&Message) + Send + Sync + 'static) -> Self {
        Handler {
            inner: Arc::new(HandlerInner {
                looper,
                callback: None,
                handle_message: Some(Box::new(handle_message)),
            }),
        }
    }

    pub fn with_callback(looper: Arc<Looper>, callback: impl Fn(&Message) -> bool + Send + Sync + 'static) -> Self {
        Handler {
            inner: Arc::new(HandlerInner {
                looper,
                callback: Some(Box::new(callback)),
                handle_message: None,
            }),
        }
    }

    pub fn looper(&self) -> &Arc<Looper> {
        &self.inner.looper
    }

    pub(crate) fn same_handler(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn send_message(&self, mut msg: Message) -> Result<()> {
        msg.target = Some(self.clone());
        msg.when = now_millis();
        self.inner.looper.queue().enqueue(msg)
    }

    pub fn send_message_delayed(&self, mut msg: Message, delay_ms: u64) -> Result<()> {
        msg.target = Some(self.clone());
        msg.when = now_millis() + delay_ms;
        self.inner.looper.queue().enqueue(msg)
    }

    pub fn send_message_at_time(&self, mut msg: Message, when_ms: u64) -> Result<()> {
        msg.target = Some(self.clone());
        msg.when = when_ms;
        self.inner.looper.queue().enqueue(msg)
    }

    pub fn post(&self, runnable: impl FnOnce() + Send + 'static) -> Result<Token> {
        self.post_at_time(runnable, now_millis())
    }

    pub fn post_delayed(&self, runnable: impl FnOnce() + Send + 'static, delay_ms: u64) -> Result<Token> {
        self.post_at_time(runnable, now_millis() + delay_ms)
    }

    pub fn post_at_time(&self, runnable: impl FnOnce() + Send + 'static, when_ms: u64) -> Result<Token> {
        let token = Token::new();
        let boxed: Runnable = Box::new(runnable);
        let mut msg = Message::new(0);
        msg.callback = Some(boxed);
        msg.target = Some(self.clone());
        msg.when = when_ms;
        msg.token = Some(token.clone());
        self.inner.looper.queue().enqueue(msg)?;
        Ok(token)
    }

    pub fn remove_messages(&self, what: i32, token: Option<&Token>) {
        self.inner.looper.queue().remove_messages(self, what, token);
    }

    pub fn remove_callbacks(&self, token: &Token) {
        self.inner.looper.queue().remove_callbacks(self, Some(token));
    }

    pub fn remove_callbacks_and_messages(&self, token: Option<&Token>) {
        self.inner.looper.queue().remove_callbacks_and_messages(self, token);
    }

    pub fn has_messages(&self, what: i32, token: Option<&Token>) -> bool {
        self.inner.looper.queue().has_messages(self, what, token)
    }

    pub fn has_callbacks(&self, token: &Token) -> bool {
        self.inner.looper.queue().has_callbacks(self, Some(token))
    }

    fn dispatch(&self, msg: &Message) {
        if let Some(callback) = &self.inner.callback {
            if callback(msg) {
                return;
            }
        }
        if let Some(handle_message) = &self.inner.handle_message {
            handle_message(msg);
        }
    }
}

impl Executor for Handler {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        let _ = self.post(move || job());
    }
}

/// Runs one dequeued message to completion: its own callback if it has one,
/// otherwise its target handler's dispatch policy. Messages with no target
/// and no callback are dropped — `Handler::send_message` always sets a
/// target, so this only happens for malformed construction.
pub(crate) fn dispatch(mut msg: Message) {
    if let Some(callback) = msg.callback.take() {
        callback();
        return;
    }
    if let Some(target) = msg.target.clone() {
        target.dispatch(&msg);
    }
}
