//! Hand-written binder glue for `IEliza`: a synchronous `ask1`, an
//! asynchronous `ask2` returning a `Promise<String>`, and a one-way
//! `ask3` that answers later through an `IElizaListener`.
//!
//! This is the pattern `spec.md` calls out as normally generated from an
//! interface definition — written out by hand here to show the shape
//! without a code generator.

use crate::i_eliza_listener::ElizaListenerProxy;
use mindroid_core::error::{MindroidError, Result};
use mindroid_core::{BinderRef, BinderService, Parcel, Promise, FLAG_ONE_WAY};
use std::sync::Arc;

pub const DESCRIPTOR: &str = "mindroid://interfaces/examples/eliza/IEliza";

const MSG_ASK1: i32 = 1;
const MSG_ASK2: i32 = 2;
const MSG_ASK3: i32 = 3;

pub trait IEliza: Send + Sync + 'static {
    fn ask1(&self, question: &str) -> String;
    fn ask2(&self, question: &str) -> Promise<String>;
    fn ask3(&self, question: &str, listener: ElizaListenerProxy);
}

pub struct ElizaStub<T: IEliza> {
    implementation: T,
}

impl<T: IEliza> ElizaStub<T> {
    pub fn new(implementation: T) -> Arc<Self> {
        Arc::new(ElizaStub { implementation })
    }
}

impl<T: IEliza> BinderService for ElizaStub<T> {
    fn descriptor(&self) -> &str {
        DESCRIPTOR
    }

    fn on_transact(&self, what: i32, mut data: Parcel, result: &Promise<Parcel>) -> Result<()> {
        match what {
            MSG_ASK1 => {
                let question = data.get_string()?;
                let reply = self.implementation.ask1(&question);
                let mut parcel = Parcel::new();
                parcel.put_string(&reply);
                result.complete(parcel);
            }
            MSG_ASK2 => {
                let question = data.get_string()?;
                let reply = self.implementation.ask2(&question);
                let parceled = reply.then_apply(|value| {
                    let mut parcel = Parcel::new();
                    parcel.put_string(&value);
                    parcel
                });
                result.complete_with_promise(&parceled);
            }
            MSG_ASK3 => {
                let question = data.get_string()?;
                let (_base, target) = data.get_binder_uri()?;
                let runtime = mindroid_core::Runtime::current().expect("Runtime must be running to dispatch ask3");
                let listener_binder = runtime
                    .get_binder(&target)
                    .ok_or_else(|| MindroidError::transaction_failure(format!("ask3: no binder at {target}")))?;
                self.implementation.ask3(&question, ElizaListenerProxy::new(listener_binder));
            }
            _ => {
                result.complete_with(MindroidError::transaction_failure(format!("IEliza: unknown message {what}")));
            }
        }
        Ok(())
    }
}

/// A remote stand-in for an `IEliza`, reached through whatever binder the
/// caller already resolved (local fast-path or cross-node).
pub struct ElizaProxy {
    binder: BinderRef,
}

impl ElizaProxy {
    pub fn new(binder: BinderRef) -> Self {
        ElizaProxy { binder }
    }

    pub fn ask1(&self, question: &str) -> Result<String> {
        let mut data = Parcel::new();
        data.put_string(question);
        let reply = self.binder.transact(MSG_ASK1, data, 0).expect("ask1 is not one-way");
        let mut parcel = reply.get()?;
        parcel.get_string()
    }

    pub fn ask2(&self, question: &str) -> Promise<String> {
        let mut data = Parcel::new();
        data.put_string(question);
        let reply = self.binder.transact(MSG_ASK2, data, 0).expect("ask2 is not one-way");
        reply.then_compose(|mut parcel| {
            let result = Promise::new();
            match parcel.get_string() {
                Ok(text) => {
                    result.complete(text);
                }
                Err(error) => {
                    result.complete_with(error);
                }
            }
            result
        })
    }

    pub fn ask3(&self, question: &str, listener: BinderRef) {
        let mut data = Parcel::new();
        data.put_string(question);
        // putBinderUri carries both the sender's own URI and the
        // listener's, matching `Parcel::put_binder_uri`'s wire shape.
        data.put_binder_uri(&self.binder.uri(), &listener.uri());
        self.binder.transact(MSG_ASK3, data, FLAG_ONE_WAY);
    }
}
