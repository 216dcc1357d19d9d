//! The seam a concrete transport (TCP, or anything else) plugs into the
//! runtime through: one scheme, one `TransportPlugin`, reachable from
//! `Runtime::get_proxy`.

use crate::binder::Binder;
use crate::error::Result;
use crate::parcel::Parcel;
use crate::promise::Promise;
use crate::uri::Uri;
use std::sync::Arc;

/// Frame type discriminant on the wire: big-endian `u32`, `1` for a
/// transaction, `2` for an exception-transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Transaction,
    Exception,
}

impl FrameType {
    pub fn as_u32(self) -> u32 {
        match self {
            FrameType::Transaction => 1,
            FrameType::Exception => 2,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(FrameType::Transaction),
            2 => Some(FrameType::Exception),
            _ => None,
        }
    }
}

/// One wire frame: `size:u32, type:u32, uri:utf(u16-len), transactionId:u32,
/// what:u32, payloadLen:u32, payload:bytes`. `size` itself is not stored
/// here — it is the encoded length of everything after it, computed at
/// encode time by whoever writes the frame to a socket.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: FrameType,
    pub uri: Uri,
    pub transaction_id: u32,
    pub what: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn transaction(uri: Uri, transaction_id: u32, what: u32, payload: Vec<u8>) -> Self {
        Frame {
            frame_type: FrameType::Transaction,
            uri,
            transaction_id,
            what,
            payload,
        }
    }

    pub fn exception(uri: Uri, transaction_id: u32, what: u32, message: impl Into<String>) -> Self {
        Frame {
            frame_type: FrameType::Exception,
            uri,
            transaction_id,
            what,
            payload: message.into().into_bytes(),
        }
    }
}

/// A cross-node transaction transport for one URI scheme. Accepts inbound
/// connections and dispatches their transactions against the Runtime,
/// opens outbound connections to peer nodes, and correlates replies back
/// to the Promises callers are holding.
pub trait TransportPlugin: Send + Sync + 'static {
    /// The scheme this plugin serves, e.g. `"mindroid"`.
    fn scheme(&self) -> &str;

    /// Sends a transaction to the binder addressed by `uri` and returns a
    /// Promise of the reply parcel. Callers that passed `FLAG_ONE_WAY`
    /// still get a Promise back here — discarding it is the caller's
    /// choice, matching `Proxy::transact`.
    fn transact(&self, uri: &Uri, what: i32, data: Parcel, flags: i32) -> Promise<Parcel>;

    /// Starts listening/connecting. Called once, from `Runtime::start`.
    fn start(&self) -> Result<()>;

    /// Fails every in-flight transaction and releases sockets.
    fn stop(&self);

    /// Runtime notifies a plugin whenever a new binder is attached under a
    /// name this plugin's scheme is responsible for advertising. No-op by
    /// default; a plugin overrides it to track exported services.
    fn on_attach_binder(&self, _binder: &Binder) {}

    /// Runtime notifies a plugin when it mints a new proxy id for a URI
    /// under this plugin's scheme.
    fn on_attach_proxy(&self, _proxy_id: u64, _uri: &Uri) {}
}

pub type PluginRef = Arc<dyn TransportPlugin>;
