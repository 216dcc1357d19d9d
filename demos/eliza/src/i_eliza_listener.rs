//! Hand-written binder glue for `IElizaListener`: one one-way callback,
//! `onReply(String)`, that `IEliza::ask3` invokes once a reply is ready.

use mindroid_core::error::{MindroidError, Result};
use mindroid_core::{Binder, BinderRef, BinderService, Looper, Parcel, Promise, Runtime, FLAG_ONE_WAY};
use std::sync::Arc;

pub const DESCRIPTOR: &str = "mindroid://interfaces/examples/eliza/IElizaListener";

const MSG_ON_REPLY: i32 = 1;

pub trait IElizaListener: Send + Sync + 'static {
    fn on_reply(&self, reply: &str);
}

/// Adapts a user's `IElizaListener` implementation to `BinderService`,
/// dispatching the one wire message this interface defines.
pub struct ElizaListenerStub<T: IElizaListener> {
    implementation: T,
}

impl<T: IElizaListener> ElizaListenerStub<T> {
    pub fn new(implementation: T) -> Arc<Self> {
        Arc::new(ElizaListenerStub { implementation })
    }
}

impl<T: IElizaListener> BinderService for ElizaListenerStub<T> {
    fn descriptor(&self) -> &str {
        DESCRIPTOR
    }

    fn on_transact(&self, what: i32, mut data: Parcel, result: &Promise<Parcel>) -> Result<()> {
        match what {
            MSG_ON_REPLY => {
                let reply = data.get_string()?;
                self.implementation.on_reply(&reply);
            }
            _ => {
                result.complete_with(MindroidError::transaction_failure(format!("IElizaListener: unknown message {what}")));
            }
        }
        Ok(())
    }
}

/// A remote stand-in for an `IElizaListener`, reached through whatever
/// binder the caller already resolved (local or cross-node).
pub struct ElizaListenerProxy {
    binder: BinderRef,
}

impl ElizaListenerProxy {
    pub fn new(binder: BinderRef) -> Self {
        ElizaListenerProxy { binder }
    }

    pub fn on_reply(&self, reply: &str) {
        let mut data = Parcel::new();
        data.put_string(reply);
        // ask3's whole contract is fire-and-forget, so the reply Promise
        // (if any) is dropped without inspection.
        self.binder.transact(MSG_ON_REPLY, data, FLAG_ONE_WAY);
    }
}

/// Used when a listener is hosted locally and handed straight to the
/// `Eliza` service in-process, skipping the binder/proxy plumbing
/// entirely for the common same-process case.
pub fn local_binder_ref(runtime: &Runtime, looper: Arc<Looper>, implementation: impl IElizaListener) -> BinderRef {
    let binder = Binder::new(runtime, looper, ElizaListenerStub::new(implementation));
    BinderRef::Local(binder)
}
