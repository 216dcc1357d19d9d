//! The `mindroid` native-scheme transport plugin: a Tokio-based server
//! and per-node client sitting behind `mindroid_core::TransportPlugin`.
//!
//! `mindroid-core` is deliberately runtime-agnostic — Looper, Handler and
//! Promise are plain OS threads and `parking_lot` locks. This crate owns
//! its own Tokio runtime and bridges the two worlds: `transact` runs
//! synchronously from the caller's point of view (it hands back a
//! `Promise` immediately) while the actual I/O happens on the Tokio
//! runtime's worker threads.

mod client;
mod error;
mod frame;
mod server;

pub use client::{MindroidTcpClient, DEFAULT_TRANSACTION_TIMEOUT};
pub use error::map_io_error;

use mindroid_core::error::{MindroidError, Result};
use mindroid_core::{Configuration, Parcel, Promise, TransportPlugin, Uri};
use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Upper bound on concurrent in-flight transactions per inbound
/// connection, enforced by `server::handle_connection`'s semaphore.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

pub struct MindroidTransportPlugin {
    scheme: String,
    rt: tokio::runtime::Runtime,
    bind_addr: Option<SocketAddr>,
    peer_addrs: HashMap<u32, SocketAddr>,
    clients: Mutex<HashMap<u32, Arc<MindroidTcpClient>>>,
    server_task: Mutex<Option<JoinHandle<()>>>,
    max_in_flight: usize,
    timeout: Duration,
}

impl MindroidTransportPlugin {
    pub fn new(scheme: impl Into<String>, bind_addr: Option<SocketAddr>, peer_addrs: HashMap<u32, SocketAddr>) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mindroid-transport-tcp")
            .build()
            .map_err(|e| MindroidError::illegal_state(format!("failed to start transport runtime: {e}")))?;
        Ok(MindroidTransportPlugin {
            scheme: scheme.into(),
            rt,
            bind_addr,
            peer_addrs,
            clients: Mutex::new(HashMap::new()),
            server_task: Mutex::new(None),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            timeout: DEFAULT_TRANSACTION_TIMEOUT,
        })
    }

    /// Builds a plugin from a parsed configuration document: `server_uri`
    /// in `[plugin.<scheme>]` (if its authority resolves to a socket
    /// address) becomes the bind address, and every `[node.<id>]` peer
    /// becomes a dial target.
    pub fn from_configuration(configuration: &Configuration, scheme: &str) -> Result<Self> {
        let bind_addr = configuration
            .plugin(scheme)
            .and_then(|section| section.server_uri.as_deref())
            .and_then(|uri| resolve_socket_addr(uri).ok());
        let mut peer_addrs = HashMap::new();
        for (node_id, uri) in configuration.peers() {
            if let Ok(addr) = resolve_socket_addr(&uri.to_string()) {
                peer_addrs.insert(node_id, addr);
            }
        }
        Self::new(scheme, bind_addr, peer_addrs)
    }

    fn client_for(&self, node_id: u32) -> Result<Arc<MindroidTcpClient>> {
        if let Some(client) = self.clients.lock().unwrap().get(&node_id).cloned() {
            return Ok(client);
        }
        let addr = *self
            .peer_addrs
            .get(&node_id)
            .ok_or_else(|| MindroidError::transaction_failure(format!("no peer address configured for node {node_id}")))?;
        let client = self.rt.block_on(MindroidTcpClient::connect(addr, self.timeout))?;
        self.clients.lock().unwrap().insert(node_id, client.clone());
        Ok(client)
    }
}

fn resolve_socket_addr(uri: &str) -> Result<SocketAddr> {
    let uri: Uri = uri.parse()?;
    uri.authority()
        .to_socket_addrs()
        .map_err(|e| MindroidError::parse_error(format!("{} is not a resolvable host:port: {e}", uri.authority())))?
        .next()
        .ok_or_else(|| MindroidError::parse_error(format!("{} resolved to no addresses", uri.authority())))
}

impl TransportPlugin for MindroidTransportPlugin {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn transact(&self, uri: &Uri, what: i32, data: Parcel, _flags: i32) -> Promise<Parcel> {
        let node_id = match uri.node_id() {
            Some(node_id) => node_id,
            None => {
                let promise = Promise::new();
                promise.complete_with(MindroidError::transaction_failure("proxy uri has no numeric node id"));
                return promise;
            }
        };
        match self.client_for(node_id) {
            Ok(client) => client.transact(uri, what, data),
            Err(error) => {
                let promise = Promise::new();
                promise.complete_with(error);
                promise
            }
        }
    }

    fn start(&self) -> Result<()> {
        if let Some(bind_addr) = self.bind_addr {
            let max_in_flight = self.max_in_flight;
            let handle = self.rt.spawn(async move {
                if let Err(error) = server::serve(bind_addr, max_in_flight).await {
                    tracing::error!(%error, "mindroid transport server exited");
                }
            });
            *self.server_task.lock().unwrap() = Some(handle);
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(handle) = self.server_task.lock().unwrap().take() {
            handle.abort();
        }
        let clients = self.clients.lock().unwrap().drain().map(|(_, client)| client).collect::<Vec<_>>();
        for client in clients {
            client.fail_all_pending(MindroidError::transaction_failure("transport plugin stopped"));
        }
    }
}
