//! End-to-end coverage of the native-scheme transport plugin against a
//! real socket: a hosted binder on one side, a raw client on the other.

use mindroid_core::{Binder, BinderService, HandlerThread, Parcel, Promise, Runtime};
use mindroid_transport_tcp::{MindroidTcpClient, DEFAULT_TRANSACTION_TIMEOUT};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const ASK: i32 = 1;

/// `Runtime` is a process-wide singleton; every test in this file that
/// starts one must hold this lock for its whole lifetime so two tests
/// never contend over the same `Runtime::start`/`shutdown` pair.
static RUNTIME_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

struct Eliza;

impl BinderService for Eliza {
    fn descriptor(&self) -> &str {
        "mindroid://interfaces/IEliza"
    }

    fn on_transact(&self, what: i32, mut data: Parcel, result: &Promise<Parcel>) -> mindroid_core::error::Result<()> {
        let _question = data.get_string()?;
        let mut reply = Parcel::new();
        match what {
            ASK => reply.put_string("Tell me more about that."),
            _ => reply.put_string(""),
        }
        result.complete(reply);
        Ok(())
    }
}

#[test]
fn cross_node_transaction_reaches_the_hosted_service() {
    let _guard = RUNTIME_TEST_LOCK.lock().unwrap();

    let addr: SocketAddr = "127.0.0.1:47111".parse().unwrap();
    let runtime = Runtime::start(1, "mindroid").expect("runtime starts");
    let plugin = Arc::new(
        mindroid_transport_tcp::MindroidTransportPlugin::new("mindroid", Some(addr), HashMap::new()).expect("plugin builds"),
    );
    runtime.register_plugin(plugin.clone()).expect("plugin starts");

    let host_thread = HandlerThread::start("eliza-host");
    let binder = Binder::new_service(&runtime, host_thread.looper().clone(), "eliza", Arc::new(Eliza));
    let uri = binder.uri().clone();

    // Give the listener a moment to come up before the raw client dials in.
    std::thread::sleep(Duration::from_millis(100));

    let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap();
    let client = rt.block_on(MindroidTcpClient::connect(addr, DEFAULT_TRANSACTION_TIMEOUT)).expect("client connects");

    let mut question = Parcel::new();
    question.put_string("how do you feel today?");
    let reply = client.transact(&uri, ASK, question);
    let mut parcel = reply.get().expect("transaction succeeds within the default timeout");
    let answer = parcel.get_string().unwrap();
    assert!(!answer.is_empty());

    host_thread.quit();
    plugin.stop();
    Runtime::shutdown();
}

#[test]
fn calling_an_unknown_binder_fails_with_a_remote_exception() {
    let _guard = RUNTIME_TEST_LOCK.lock().unwrap();

    let addr: SocketAddr = "127.0.0.1:47112".parse().unwrap();
    let runtime = Runtime::start(1, "mindroid").expect("runtime starts");
    let plugin = Arc::new(
        mindroid_transport_tcp::MindroidTransportPlugin::new("mindroid", Some(addr), HashMap::new()).expect("plugin builds"),
    );
    runtime.register_plugin(plugin.clone()).expect("plugin starts");

    std::thread::sleep(Duration::from_millis(100));

    let rt = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap();
    let client = rt.block_on(MindroidTcpClient::connect(addr, DEFAULT_TRANSACTION_TIMEOUT)).expect("client connects");

    let nobody: mindroid_core::Uri = "mindroid://1/ff".parse().unwrap();
    let result = client.transact(&nobody, ASK, Parcel::new()).get();
    assert!(result.is_err());

    plugin.stop();
    Runtime::shutdown();
}
