//! A locally hosted remotable object with a unique identity and a
//! serialized dispatch method.

use crate::error::Result;
use crate::handler::Handler;
use crate::looper::Looper;
use crate::parcel::Parcel;
use crate::promise::Promise;
use crate::proxy::Proxy;
use crate::runtime::Runtime;
use crate::uri::Uri;
use std::sync::{Arc, OnceLock};

/// Set on `transact`'s `flags` to fire-and-forget: the call returns
/// immediately with no `Promise` obligation.
pub const FLAG_ONE_WAY: i32 = 0x1;

/// The user-supplied half of a binder: reads arguments out of `data` in
/// declaration order, does the work, and completes `result` (or returns an
/// error, which the dispatch harness turns into a completed-with-exception
/// promise without ever unwinding the Looper thread).
pub trait BinderService: Send + Sync + 'static {
    /// Uniquely names the family of stub/proxy this service belongs to.
    fn descriptor(&self) -> &str;

    fn on_transact(&self, what: i32, data: Parcel, result: &Promise<Parcel>) -> Result<()>;
}

pub(crate) struct Inner {
    id: OnceLock<u64>,
    uri: OnceLock<Uri>,
    descriptor: String,
    looper: Arc<Looper>,
    handler: Handler,
    service: Arc<dyn BinderService>,
}

/// A local binder: attached to exactly one Looper for its lifetime, and
/// globally addressable by URI from attach until drop.
#[derive(Clone)]
pub struct Binder {
    inner: Arc<Inner>,
}

impl Binder {
    /// Builds an unattached binder bound to `looper` and immediately
    /// registers it with `runtime`, which assigns its id and URI.
    pub fn new(runtime: &Runtime, looper: Arc<Looper>, service: Arc<dyn BinderService>) -> Binder {
        let descriptor = service.descriptor().to_string();
        let handler = Handler::new(looper.clone());
        let binder = Binder {
            inner: Arc::new(Inner {
                id: OnceLock::new(),
                uri: OnceLock::new(),
                descriptor,
                looper,
                handler,
                service,
            }),
        };
        runtime.attach_binder(&binder);
        binder
    }

    /// Builds a binder and registers it under a well-known service name
    /// rather than an anonymous, counter-generated id.
    pub fn new_service(runtime: &Runtime, looper: Arc<Looper>, name: &str, service: Arc<dyn BinderService>) -> Binder {
        let descriptor = service.descriptor().to_string();
        let handler = Handler::new(looper.clone());
        let binder = Binder {
            inner: Arc::new(Inner {
                id: OnceLock::new(),
                uri: OnceLock::new(),
                descriptor,
                looper,
                handler,
                service,
            }),
        };
        runtime.attach_service(name, &binder);
        binder
    }

    pub fn id(&self) -> u64 {
        *self.inner.id.get().expect("binder used before Runtime::attach_binder completed")
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri.get().expect("binder used before Runtime::attach_binder completed")
    }

    pub fn descriptor(&self) -> &str {
        &self.inner.descriptor
    }

    pub fn looper(&self) -> &Arc<Looper> {
        &self.inner.looper
    }

    pub(crate) fn assign_identity(&self, id: u64, uri: Uri) {
        self.inner.id.set(id).expect("binder identity assigned twice");
        self.inner.uri.set(uri).expect("binder identity assigned twice");
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &std::sync::Weak<Inner>) -> Option<Binder> {
        weak.upgrade().map(|inner| Binder { inner })
    }

    /// Returns the underlying service if `descriptor` matches, letting a
    /// caller that already knows it is talking to a local binder skip
    /// marshaling entirely.
    pub fn query_local_interface(&self, descriptor: &str) -> Option<Arc<dyn BinderService>> {
        if self.inner.descriptor == descriptor {
            Some(self.inner.service.clone())
        } else {
            None
        }
    }

    /// Submits a self-addressed message to the owning Looper, unless the
    /// calling thread already *is* that Looper's thread, in which case
    /// `on_transact` runs inline — the fast path.
    pub fn transact(&self, what: i32, data: Parcel, flags: i32) -> Option<Promise<Parcel>> {
        let _span = crate::observability::transact_span(&self.uri().to_string(), what, None).entered();
        let one_way = flags & FLAG_ONE_WAY != 0;
        let result = Promise::new();
        let service = self.inner.service.clone();
        let completion = result.clone();
        let run = move || {
            if let Err(error) = service.on_transact(what, data, &completion) {
                let _ = completion.complete_with(error);
            }
        };
        let same_thread = Looper::my_looper().is_some_and(|current| Arc::ptr_eq(&current, &self.inner.looper));
        if same_thread {
            run();
        } else if let Err(error) = self.inner.handler.post(run) {
            // The owning Looper has already quit; a one-way caller has
            // nowhere to report this, but a two-way caller still gets its
            // promise failed instead of hanging in `get()` forever.
            result.complete_with(error);
        }
        if one_way {
            None
        } else {
            Some(result)
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let (Some(&id), Some(uri)) = (self.id.get(), self.uri.get()) {
            if let Some(runtime) = Runtime::current() {
                runtime.detach_binder(id, uri);
            }
        }
    }
}

impl PartialEq for Binder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Binder {}

/// Either half of what `Runtime::get_binder` can hand back: a local binder
/// reached directly, or a proxy standing in for one on another node.
#[derive(Clone)]
pub enum BinderRef {
    Local(Binder),
    Remote(Arc<Proxy>),
}

impl BinderRef {
    pub fn uri(&self) -> Uri {
        match self {
            BinderRef::Local(binder) => binder.uri().clone(),
            BinderRef::Remote(proxy) => proxy.uri().clone(),
        }
    }

    pub fn transact(&self, what: i32, data: Parcel, flags: i32) -> Option<Promise<Parcel>> {
        match self {
            BinderRef::Local(binder) => binder.transact(what, data, flags),
            BinderRef::Remote(proxy) => proxy.transact(what, data, flags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_thread::HandlerThread;
    use parking_lot::Mutex as SyncMutex;

    static RUNTIME_TEST_LOCK: SyncMutex<()> = SyncMutex::new(());

    struct Echo;

    impl BinderService for Echo {
        fn descriptor(&self) -> &str {
            "test.IEcho"
        }

        fn on_transact(&self, what: i32, mut data: Parcel, result: &Promise<Parcel>) -> Result<()> {
            let text = data.get_string()?;
            let mut reply = Parcel::new();
            reply.put_i32(what);
            reply.put_string(&text);
            result.complete(reply);
            Ok(())
        }
    }

    fn with_runtime<R>(f: impl FnOnce(Arc<Runtime>) -> R) -> R {
        let _guard = RUNTIME_TEST_LOCK.lock();
        let runtime = Runtime::start(1, "mindroid").expect("runtime starts");
        let result = f(runtime);
        Runtime::shutdown();
        result
    }

    #[test]
    fn transact_runs_inline_on_the_owning_looper_thread() {
        with_runtime(|runtime| {
            let thread = HandlerThread::start("binder-test");
            let looper = thread.looper().clone();
            let binder = Binder::new(&runtime, looper.clone(), Arc::new(Echo));

            let handler = Handler::new(looper);
            let promise: Promise<Parcel> = Promise::new();
            let completion = promise.clone();
            let binder_for_transact = binder.clone();
            handler
                .post(move || {
                    let mut data = Parcel::new();
                    data.put_string("hi");
                    let reply = binder_for_transact.transact(7, data, 0).expect("not one-way");
                    completion.complete_with_promise(&reply);
                })
                .expect("looper is still running");

            let mut reply = promise.get().expect("transact succeeds");
            reply.reset_read_cursor();
            assert_eq!(reply.get_i32().unwrap(), 7);
            assert_eq!(reply.get_string().unwrap(), "hi");
            thread.quit();
        });
    }

    #[test]
    fn one_way_transact_returns_no_promise() {
        with_runtime(|runtime| {
            let thread = HandlerThread::start("binder-test-oneway");
            let binder = Binder::new(&runtime, thread.looper().clone(), Arc::new(Echo));
            let mut data = Parcel::new();
            data.put_string("ignored");
            assert!(binder.transact(1, data, FLAG_ONE_WAY).is_none());
            thread.quit();
        });
    }

    #[test]
    fn binder_equality_is_by_identity_not_by_descriptor() {
        with_runtime(|runtime| {
            let thread = HandlerThread::start("binder-test-eq");
            let a = Binder::new(&runtime, thread.looper().clone(), Arc::new(Echo));
            let b = Binder::new(&runtime, thread.looper().clone(), Arc::new(Echo));
            assert_eq!(a, a.clone());
            assert_ne!(a, b);
            thread.quit();
        });
    }
}
