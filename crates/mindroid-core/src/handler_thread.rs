//! Spins up a dedicated OS thread with a `Looper` already prepared and
//! running, the way Android's `HandlerThread` does.

use crate::looper::Looper;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct HandlerThread {
    looper: Arc<Looper>,
    join_handle: Option<JoinHandle<()>>,
}

impl HandlerThread {
    pub fn start(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel();
        let join_handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let looper = Looper::prepare();
                tx.send(looper.clone()).expect("HandlerThread owner dropped the receiver before startup");
                Looper::run(&looper);
            })
            .expect("failed to spawn HandlerThread");
        let looper = rx.recv().expect("HandlerThread thread died before publishing its Looper");
        HandlerThread {
            looper,
            join_handle: Some(join_handle),
        }
    }

    pub fn looper(&self) -> &Arc<Looper> {
        &self.looper
    }

    /// Signals the Looper to quit and blocks until the thread exits.
    pub fn quit(mut self) {
        self.looper.quit();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HandlerThread {
    fn drop(&mut self) {
        self.looper.quit();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}
