//! Runtime-agnostic core of the binder IPC runtime: message loop, binder
//! registry, promises, and the seam a concrete transport plugs into.

pub mod binder;
pub mod configuration;
pub mod error;
pub mod executor;
pub mod handler;
pub mod handler_thread;
pub mod looper;
pub mod message;
pub mod observability;
pub mod parcel;
pub mod promise;
pub mod proxy;
pub mod queue;
pub mod runtime;
mod time;
pub mod transport;
pub mod uri;

pub use binder::{Binder, BinderRef, BinderService, FLAG_ONE_WAY};
pub use configuration::Configuration;
pub use error::{MindroidError, Result};
pub use executor::{DirectExecutor, Executor};
pub use handler::Handler;
pub use handler_thread::HandlerThread;
pub use looper::Looper;
pub use message::{Message, Token};
pub use parcel::Parcel;
pub use promise::Promise;
pub use proxy::Proxy;
pub use queue::MessageQueue;
pub use runtime::Runtime;
pub use transport::{Frame, FrameType, TransportPlugin};
pub use uri::{id_uri, Uri};
