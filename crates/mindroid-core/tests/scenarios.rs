//! Cross-module end-to-end scenarios that don't fit naturally inside any
//! single module's `#[cfg(test)]` block.

use mindroid_core::{Handler, HandlerThread, Promise};
use std::time::Duration;

#[test]
fn echo_across_handlers() {
    let a = HandlerThread::start("scenario-a");
    let b = HandlerThread::start("scenario-b");
    let handler_a = Handler::new(a.looper().clone());
    let handler_b = Handler::new(b.looper().clone());

    let promise: Promise<i32> = Promise::new();
    let completion = promise.clone();
    handler_a
        .post(move || {
            handler_b
                .post(move || {
                    completion.complete(123);
                })
                .expect("looper is still running");
        })
        .expect("looper is still running");

    assert_eq!(promise.get().unwrap(), 123);
    a.quit();
    b.quit();
}

#[test]
fn delayed_callback_removal() {
    let thread = HandlerThread::start("scenario-delay");
    let handler = Handler::new(thread.looper().clone());
    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = ran.clone();
    let token = handler
        .post_delayed(move || flag.store(true, std::sync::atomic::Ordering::SeqCst), 1000)
        .expect("looper is still running");
    handler.remove_callbacks(&token);
    std::thread::sleep(Duration::from_millis(1200));
    assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    thread.quit();
}

#[test]
fn splitting_on_a_literal_separator_keeps_every_empty_field() {
    let parts: Vec<&str> = "abc\n\n\ndef\r\nxyz".split('\n').collect();
    assert_eq!(parts, vec!["abc", "", "", "def\r", "xyz"]);
}

#[test]
fn promise_chain_runs_through_without_the_error_handler() {
    let errored = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = errored.clone();

    let source: Promise<i32> = Promise::new();
    source.complete(42);

    let stringified = source.then_apply(|n| n.to_string());
    let accepted = stringified.then_accept(|s| assert_eq!(s, "42"));
    let guarded = accepted.catch_exception(move |_| {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    guarded.get().unwrap();
    assert!(!errored.load(std::sync::atomic::Ordering::SeqCst));
}
