//! Runnable worked example: hosts an `IEliza` service on its own
//! `HandlerThread`, then drives all three of its call shapes from the
//! main thread through the binder it gets back from the registry.

mod i_eliza;
mod i_eliza_listener;

use i_eliza::{ElizaProxy, ElizaStub, IEliza};
use i_eliza_listener::{ElizaListenerProxy, IElizaListener};
use mindroid_core::{observability, BinderRef, HandlerThread, Promise, Runtime};
use std::sync::mpsc;
use std::time::Duration;
use tracing::info;

struct Eliza;

impl IEliza for Eliza {
    fn ask1(&self, question: &str) -> String {
        reply_to(question)
    }

    fn ask2(&self, question: &str) -> Promise<String> {
        let promise = Promise::new();
        promise.complete(reply_to(question));
        promise
    }

    fn ask3(&self, question: &str, listener: ElizaListenerProxy) {
        listener.on_reply(&reply_to(question));
    }
}

fn reply_to(question: &str) -> String {
    let question = question.trim();
    if question.is_empty() {
        "Please, go on.".to_string()
    } else if question.ends_with('?') {
        format!("Why do you ask whether {}", question.to_lowercase())
    } else {
        format!("Tell me more about {question}")
    }
}

struct PrintingListener {
    sender: parking_lot::Mutex<mpsc::Sender<String>>,
}

impl IElizaListener for PrintingListener {
    fn on_reply(&self, reply: &str) {
        let _ = self.sender.lock().send(reply.to_string());
    }
}

fn main() {
    observability::init_tracing();

    let runtime = Runtime::start(1, "mindroid").expect("runtime starts exactly once per process");
    info!(target: "eliza_demo", "runtime started, hosting IEliza on its own HandlerThread");

    let host_thread = HandlerThread::start("eliza-host");
    let binder = mindroid_core::Binder::new_service(&runtime, host_thread.looper().clone(), "eliza", ElizaStub::new(Eliza));
    let uri = binder.uri().clone();

    let eliza = match runtime.get_binder(&uri) {
        Some(BinderRef::Local(binder)) => ElizaProxy::new(BinderRef::Local(binder)),
        _ => unreachable!("just attached this binder under its own uri"),
    };

    let answer = eliza.ask1("I feel stuck today").expect("ask1 round-trips locally");
    println!("ask1: {answer}");

    let promise = eliza.ask2("Why do I keep procrastinating?");
    let answer = promise.get().expect("ask2 round-trips locally");
    println!("ask2: {answer}");

    let (sender, receiver) = mpsc::channel();
    let listener_binder = i_eliza_listener::local_binder_ref(&runtime, host_thread.looper().clone(), PrintingListener { sender });
    eliza.ask3("What should I do about it?", listener_binder);
    let answer = receiver.recv_timeout(Duration::from_secs(5)).expect("ask3's listener callback arrives");
    println!("ask3: {answer}");

    host_thread.quit();
    Runtime::shutdown();
}
