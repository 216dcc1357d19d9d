//! Timestamped, callback-bearing envelopes dispatched through a
//! [`crate::looper::Looper`]'s message queue.

use crate::handler::Handler;
use crate::parcel::Parcel;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque identity marker used to tag a specific posted message or
/// runnable so it can later be targeted by `remove_messages` /
/// `remove_callbacks`, without requiring closures or payloads to implement
/// equality.
#[derive(Clone)]
pub struct Token(Arc<()>);

impl Token {
    pub fn new() -> Self {
        Token(Arc::new(()))
    }
}

impl Default for Token {
    fn default() -> Self {
        Token::new()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:p})", Arc::as_ptr(&self.0))
    }
}

pub(crate) type Runnable = Box<dyn FnOnce() + Send + 'static>;

/// A single queued unit of work.
///
/// `callback`, when present, is run directly by the Looper; otherwise the
/// message is handed to `target`'s dispatch policy (see
/// [`crate::handler::Handler::dispatch`]).
pub struct Message {
    pub what: i32,
    pub arg1: i32,
    pub arg2: i32,
    pub obj: Option<Arc<dyn Any + Send + Sync>>,
    pub data: Option<Parcel>,
    pub(crate) when: u64,
    pub(crate) target: Option<Handler>,
    pub(crate) callback: Option<Runnable>,
    pub(crate) token: Option<Token>,
    pub(crate) seq: u64,
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("what", &self.what)
            .field("arg1", &self.arg1)
            .field("arg2", &self.arg2)
            .field("when", &self.when)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Message {
    pub fn new(what: i32) -> Self {
        Message {
            what,
            arg1: 0,
            arg2: 0,
            obj: None,
            data: None,
            when: 0,
            target: None,
            callback: None,
            token: None,
            seq: 0,
        }
    }

    pub fn with_data(mut self, data: Parcel) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_obj(mut self, obj: Arc<dyn Any + Send + Sync>) -> Self {
        self.obj = Some(obj);
        self
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn when(&self) -> u64 {
        self.when
    }

    pub(crate) fn matches_handler(&self, handler: &Handler) -> bool {
        self.target.as_ref().is_some_and(|target| target.same_handler(handler))
    }
}
