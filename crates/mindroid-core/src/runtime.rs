//! The process-wide registry binding node identity, binders, proxies and
//! transport plugins together.

use crate::binder::{Binder, BinderRef, Inner as BinderInner};
use crate::configuration::Configuration;
use crate::error::{MindroidError, Result};
use crate::parcel::Parcel;
use crate::promise::Promise;
use crate::proxy::Proxy;
use crate::transport::PluginRef;
use crate::uri::{id_uri, Uri};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Local ids below this are reserved for well-known services, assigned by
/// name rather than by a counter.
pub const RESERVED_ID_RANGE: u32 = 1000;

/// Set on a local id to mark it as a proxy id rather than a stub id.
const PROXY_ID_FLAG: u32 = 0x8000_0000;

static CURRENT: Mutex<Option<Arc<Runtime>>> = Mutex::new(None);

struct Registry {
    binders_by_id: RwLock<HashMap<u64, Weak<BinderInner>>>,
    binders_by_uri: RwLock<HashMap<Uri, Weak<BinderInner>>>,
    services: RwLock<HashMap<Uri, Binder>>,
    proxies: RwLock<HashMap<Uri, Weak<Proxy>>>,
    plugins: RwLock<HashMap<String, PluginRef>>,
}

/// Process-wide singleton: created by [`Runtime::start`], torn down by
/// [`Runtime::shutdown`]. Reserved ids 1..`RESERVED_ID_RANGE` are handed
/// out by name through [`Runtime::attach_service`] with an explicit id;
/// everything else comes from the two monotone counters below.
pub struct Runtime {
    node_id: u32,
    native_scheme: String,
    stub_id_seq: AtomicU32,
    proxy_id_seq: AtomicU32,
    configuration: RwLock<Option<Configuration>>,
    registry: Registry,
}

fn full_id(node_id: u32, local_id: u32) -> u64 {
    ((node_id as u64) << 32) | local_id as u64
}

impl Runtime {
    /// Creates and installs the process-wide Runtime. Fails with
    /// `IllegalState` if one is already running.
    pub fn start(node_id: u32, native_scheme: impl Into<String>) -> Result<Arc<Runtime>> {
        let mut current = CURRENT.lock();
        if current.is_some() {
            return Err(MindroidError::illegal_state("Runtime already started; call Runtime::shutdown() first"));
        }
        let runtime = Arc::new(Runtime {
            node_id,
            native_scheme: native_scheme.into(),
            stub_id_seq: AtomicU32::new(RESERVED_ID_RANGE + 1),
            proxy_id_seq: AtomicU32::new(1),
            configuration: RwLock::new(None),
            registry: Registry {
                binders_by_id: RwLock::new(HashMap::new()),
                binders_by_uri: RwLock::new(HashMap::new()),
                services: RwLock::new(HashMap::new()),
                proxies: RwLock::new(HashMap::new()),
                plugins: RwLock::new(HashMap::new()),
            },
        });
        *current = Some(runtime.clone());
        Ok(runtime)
    }

    /// Starts the Runtime using `configuration.node_id()` as the node id,
    /// and keeps `configuration` around so `attach_service` can resolve
    /// well-known service names to their reserved ids.
    pub fn start_with_configuration(configuration: Configuration, native_scheme: impl Into<String>) -> Result<Arc<Runtime>> {
        let runtime = Self::start(configuration.node_id(), native_scheme)?;
        *runtime.configuration.write() = Some(configuration);
        Ok(runtime)
    }

    /// The running Runtime, if [`Runtime::start`] has been called and
    /// [`Runtime::shutdown`] has not.
    pub fn current() -> Option<Arc<Runtime>> {
        CURRENT.lock().clone()
    }

    /// Stops every registered plugin and clears the registry.
    pub fn shutdown() {
        let runtime = CURRENT.lock().take();
        if let Some(runtime) = runtime {
            for plugin in runtime.registry.plugins.read().values() {
                plugin.stop();
            }
            runtime.registry.binders_by_id.write().clear();
            runtime.registry.binders_by_uri.write().clear();
            runtime.registry.services.write().clear();
            runtime.registry.proxies.write().clear();
            runtime.registry.plugins.write().clear();
        }
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn native_scheme(&self) -> &str {
        &self.native_scheme
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.configuration.read().clone()
    }

    pub fn register_plugin(&self, plugin: PluginRef) -> Result<()> {
        plugin.start()?;
        self.registry.plugins.write().insert(plugin.scheme().to_string(), plugin);
        Ok(())
    }

    /// Assigns the next anonymous stub id and installs `binder` in both
    /// the id and URI maps.
    pub fn attach_binder(&self, binder: &Binder) {
        let local_id = self.stub_id_seq.fetch_add(1, Ordering::Relaxed);
        self.install_binder(binder, local_id);
    }

    /// Attaches `binder` under a well-known service name: the symbolic URI
    /// maps to it strongly, and its numeric id/URI are also installed so
    /// it is reachable either way.
    pub fn attach_service(&self, name: &str, binder: &Binder) {
        let reserved_id = self.configuration.read().as_ref().and_then(|configuration| configuration.service_id(name));
        let local_id = reserved_id.unwrap_or_else(|| self.stub_id_seq.fetch_add(1, Ordering::Relaxed));
        self.install_binder(binder, local_id);
        let symbolic = Uri::new(&self.native_scheme, name, "");
        self.registry.services.write().insert(symbolic, binder.clone());
        if let Some(plugin) = self.registry.plugins.read().get(&self.native_scheme) {
            plugin.on_attach_binder(binder);
        }
    }

    fn install_binder(&self, binder: &Binder, local_id: u32) {
        let uri = id_uri(&self.native_scheme, self.node_id, local_id);
        let id = full_id(self.node_id, local_id);
        binder.assign_identity(id, uri.clone());
        self.registry.binders_by_id.write().insert(id, binder.downgrade());
        self.registry.binders_by_uri.write().insert(uri, binder.downgrade());
    }

    pub(crate) fn detach_binder(&self, id: u64, uri: &Uri) {
        self.registry.binders_by_id.write().remove(&id);
        self.registry.binders_by_uri.write().remove(uri);
    }

    /// Resolves `uri` first against well-known service names, then against
    /// locally attached binders by URI; on a miss it falls back to a proxy
    /// obtained through the URI scheme's transport plugin.
    pub fn get_binder(&self, uri: &Uri) -> Option<BinderRef> {
        if let Some(binder) = self.registry.services.read().get(uri).cloned() {
            return Some(BinderRef::Local(binder));
        }
        if let Some(binder) = self.registry.binders_by_uri.read().get(uri).and_then(Binder::from_weak) {
            return Some(BinderRef::Local(binder));
        }
        self.get_proxy(uri).map(BinderRef::Remote)
    }

    /// Returns a cached proxy for `uri`, or mints one via the scheme's
    /// registered plugin and caches it weakly.
    pub fn get_proxy(&self, uri: &Uri) -> Option<Arc<Proxy>> {
        if let Some(proxy) = self.registry.proxies.read().get(uri).and_then(Weak::upgrade) {
            return Some(proxy);
        }
        let plugin = self.registry.plugins.read().get(uri.scheme()).cloned()?;
        let proxy_id = PROXY_ID_FLAG | self.proxy_id_seq.fetch_add(1, Ordering::Relaxed);
        let proxy = Arc::new(Proxy::new(uri.clone(), full_id(self.node_id, proxy_id), plugin.clone()));
        self.registry.proxies.write().insert(uri.clone(), Arc::downgrade(&proxy));
        plugin.on_attach_proxy(proxy.remote_id(), uri);
        Some(proxy)
    }

    pub fn transact(&self, binder: &BinderRef, what: i32, data: Parcel, flags: i32) -> Option<Promise<Parcel>> {
        binder.transact(what, data, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{Binder, BinderService};
    use crate::handler_thread::HandlerThread;
    use crate::parcel::Parcel;
    use crate::promise::Promise;

    static RUNTIME_TEST_LOCK: Mutex<()> = Mutex::new(());

    struct Noop;

    impl BinderService for Noop {
        fn descriptor(&self) -> &str {
            "test.INoop"
        }

        fn on_transact(&self, _what: i32, _data: Parcel, result: &Promise<Parcel>) -> Result<()> {
            result.complete(Parcel::new());
            Ok(())
        }
    }

    fn with_runtime<R>(f: impl FnOnce(Arc<Runtime>) -> R) -> R {
        let _guard = RUNTIME_TEST_LOCK.lock();
        let runtime = Runtime::start(7, "mindroid").expect("runtime starts");
        let result = f(runtime);
        Runtime::shutdown();
        result
    }

    #[test]
    fn anonymous_binders_get_distinct_ids_above_the_reserved_range() {
        with_runtime(|runtime| {
            let thread = HandlerThread::start("runtime-test-ids");
            let a = Binder::new(&runtime, thread.looper().clone(), Arc::new(Noop));
            let b = Binder::new(&runtime, thread.looper().clone(), Arc::new(Noop));
            assert_ne!(a.id(), b.id());
            assert!(a.id() & 0xffff_ffff > RESERVED_ID_RANGE as u64);
            thread.quit();
        });
    }

    #[test]
    fn get_binder_round_trips_by_uri() {
        with_runtime(|runtime| {
            let thread = HandlerThread::start("runtime-test-lookup");
            let binder = Binder::new(&runtime, thread.looper().clone(), Arc::new(Noop));
            let resolved = runtime.get_binder(binder.uri()).expect("binder is registered");
            match resolved {
                BinderRef::Local(resolved) => assert_eq!(resolved, binder),
                BinderRef::Remote(_) => panic!("expected a local binder"),
            }
            thread.quit();
        });
    }

    #[test]
    fn dropping_a_binder_detaches_it_from_the_registry() {
        with_runtime(|runtime| {
            let thread = HandlerThread::start("runtime-test-drop");
            let binder = Binder::new(&runtime, thread.looper().clone(), Arc::new(Noop));
            let uri = binder.uri().clone();
            drop(binder);
            assert!(runtime.registry.binders_by_uri.read().get(&uri).is_none());
            thread.quit();
        });
    }

    #[test]
    fn attach_service_uses_the_configured_reserved_id() {
        let document = r#"
            [node]
            id = 7

            [service.eliza]
            id = 17
            interface = "test.IEliza"
        "#;
        let configuration = Configuration::parse(document).unwrap();
        let _guard = RUNTIME_TEST_LOCK.lock();
        let runtime = Runtime::start_with_configuration(configuration, "mindroid").expect("runtime starts");
        let thread = HandlerThread::start("runtime-test-reserved");
        let binder = Binder::new_service(&runtime, thread.looper().clone(), "eliza", Arc::new(Noop));
        assert_eq!(binder.id(), full_id(7, 17));
        thread.quit();
        Runtime::shutdown();
    }
}
