//! A composable deferred result with one-shot terminal states and
//! executor-bound continuations.

use crate::error::{MindroidError, Result};
use crate::executor::{DirectExecutor, Executor};
use crate::handler::Handler;
use crate::looper::Looper;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Outcome<T> = std::result::Result<Arc<T>, Arc<MindroidError>>;

enum State<T> {
    Pending { continuations: Vec<Box<dyn FnOnce(Outcome<T>) + Send>> },
    Done(Outcome<T>),
}

struct Inner<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
    executor: Arc<dyn Executor>,
}

/// Three observable terminal states: pending, fulfilled, failed. Every
/// transition is one-shot; later calls to `complete`/`complete_with` are
/// no-ops.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise { inner: self.inner.clone() }
    }
}

fn default_executor() -> Arc<dyn Executor> {
    match Looper::my_looper() {
        Some(looper) => Arc::new(Handler::new(looper)),
        None => Arc::new(DirectExecutor),
    }
}

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// Binds to the calling thread's Looper executor if one is prepared,
    /// else runs continuations inline on whatever thread completes it.
    pub fn new() -> Self {
        Self::with_executor(default_executor())
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Promise {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending { continuations: Vec::new() }),
                ready: Condvar::new(),
                executor,
            }),
        }
    }

    pub fn complete(&self, value: T) -> bool {
        self.settle_outcome(Ok(Arc::new(value)))
    }

    pub fn complete_with(&self, error: MindroidError) -> bool {
        self.settle_outcome(Err(Arc::new(error)))
    }

    /// Attempts to fail a still-pending promise with an interrupted-style
    /// error; a no-op, returning `false`, if it already has an outcome. Does
    /// not preempt whatever producer is computing the value.
    pub fn cancel(&self) -> bool {
        self.complete_with(MindroidError::interrupted("promise cancelled"))
    }

    /// Arranges this promise to assume `other`'s terminal state once it
    /// arrives.
    pub fn complete_with_promise(&self, other: &Promise<T>) {
        let this = self.clone();
        other.on_settle(move |outcome| {
            this.settle_outcome(outcome);
        });
    }

    fn settle_outcome(&self, outcome: Outcome<T>) -> bool {
        let continuations = {
            let mut state = self.inner.state.lock();
            if matches!(&*state, State::Done(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, State::Done(outcome.clone())) {
                State::Pending { continuations } => continuations,
                State::Done(_) => unreachable!(),
            }
        };
        self.inner.ready.notify_all();
        for continuation in continuations {
            let outcome = outcome.clone();
            let executor = self.inner.executor.clone();
            executor.execute(Box::new(move || continuation(outcome)));
        }
        true
    }

    fn on_settle(&self, action: impl FnOnce(Outcome<T>) + Send + 'static) {
        let mut state = self.inner.state.lock();
        if let State::Done(outcome) = &*state {
            let outcome = outcome.clone();
            drop(state);
            self.inner.executor.execute(Box::new(move || action(outcome)));
            return;
        }
        if let State::Pending { continuations } = &mut *state {
            continuations.push(Box::new(action));
        }
    }

    pub fn then_apply<U: Clone + Send + Sync + 'static>(&self, f: impl FnOnce(T) -> U + Send + 'static) -> Promise<U> {
        let derived = Promise::with_executor(self.inner.executor.clone());
        let out = derived.clone();
        self.on_settle(move |outcome| match outcome {
            Ok(value) => {
                out.complete(f((*value).clone()));
            }
            Err(error) => {
                out.complete_with((*error).clone());
            }
        });
        derived
    }

    pub fn then_accept(&self, f: impl FnOnce(T) + Send + 'static) -> Promise<()> {
        self.then_apply(move |value| f(value))
    }

    pub fn then_run(&self, f: impl FnOnce() + Send + 'static) -> Promise<()> {
        self.then_apply(move |_| f())
    }

    /// Recovers a failure into a value of the same type; a success passes
    /// through unchanged.
    pub fn catch_exception(&self, f: impl FnOnce(MindroidError) -> T + Send + 'static) -> Promise<T> {
        let derived = Promise::with_executor(self.inner.executor.clone());
        let out = derived.clone();
        self.on_settle(move |outcome| match outcome {
            Ok(value) => {
                out.complete((*value).clone());
            }
            Err(error) => {
                out.complete(f((*error).clone()));
            }
        });
        derived
    }

    pub fn then_compose<U: Clone + Send + Sync + 'static>(&self, f: impl FnOnce(T) -> Promise<U> + Send + 'static) -> Promise<U> {
        let derived = Promise::with_executor(self.inner.executor.clone());
        let out = derived.clone();
        self.on_settle(move |outcome| match outcome {
            Ok(value) => {
                let next = f((*value).clone());
                out.complete_with_promise(&next);
            }
            Err(error) => {
                out.complete_with((*error).clone());
            }
        });
        derived
    }

    /// Completed when every input completes; fails with the first failure
    /// but still waits for the rest to settle.
    pub fn all_of(promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
        let derived = Promise::new();
        let total = promises.len();
        if total == 0 {
            derived.complete(Vec::new());
            return derived;
        }
        let results: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new(vec![None; total]));
        let remaining = Arc::new(AtomicUsize::new(total));
        let first_error: Arc<Mutex<Option<MindroidError>>> = Arc::new(Mutex::new(None));
        for (index, promise) in promises.into_iter().enumerate() {
            let derived = derived.clone();
            let results = results.clone();
            let remaining = remaining.clone();
            let first_error = first_error.clone();
            promise.on_settle(move |outcome| {
                match outcome {
                    Ok(value) => results.lock()[index] = Some((*value).clone()),
                    Err(error) => {
                        let mut guard = first_error.lock();
                        if guard.is_none() {
                            *guard = Some((*error).clone());
                        }
                    }
                }
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    match first_error.lock().take() {
                        Some(error) => {
                            derived.complete_with(error);
                        }
                        None => {
                            let values = results.lock().drain(..).map(|slot| slot.expect("all_of: every slot filled on the success path")).collect();
                            derived.complete(values);
                        }
                    }
                }
            });
        }
        derived
    }

    /// Completed with whichever input reaches a terminal state first.
    pub fn any_of(promises: Vec<Promise<T>>) -> Promise<T> {
        let derived = Promise::new();
        for promise in promises {
            let derived = derived.clone();
            promise.on_settle(move |outcome| match outcome {
                Ok(value) => {
                    derived.complete((*value).clone());
                }
                Err(error) => {
                    derived.complete_with((*error).clone());
                }
            });
        }
        derived
    }

    /// A derived promise that fails with a timeout after `timeout` if this
    /// one is still pending.
    pub fn or_timeout(&self, timeout: Duration) -> Promise<T> {
        let derived = Promise::with_executor(self.inner.executor.clone());
        let out = derived.clone();
        self.on_settle(move |outcome| match outcome {
            Ok(value) => {
                out.complete((*value).clone());
            }
            Err(error) => {
                out.complete_with((*error).clone());
            }
        });
        let timeout_target = derived.clone();
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            timeout_target.complete_with(MindroidError::timeout("promise timed out"));
        });
        derived
    }

    pub fn get(&self) -> Result<T> {
        let mut state = self.inner.state.lock();
        loop {
            if let State::Done(outcome) = &*state {
                return unwrap_outcome(outcome.clone());
            }
            self.inner.ready.wait(&mut state);
        }
    }

    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        let mut state = self.inner.state.lock();
        let deadline = Instant::now() + timeout;
        loop {
            if let State::Done(outcome) = &*state {
                return unwrap_outcome(outcome.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(MindroidError::timeout("promise wait timed out"));
            }
            self.inner.ready.wait_for(&mut state, deadline - now);
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(&*self.inner.state.lock(), State::Done(_))
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Promise<T> {
    fn default() -> Self {
        Promise::new()
    }
}

fn unwrap_outcome<T: Clone>(outcome: Outcome<T>) -> Result<T> {
    match outcome {
        Ok(value) => Ok((*value).clone()),
        Err(error) => Err((*error).clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_one_shot() {
        let promise: Promise<i32> = Promise::new();
        assert!(promise.complete(1));
        assert!(!promise.complete(2));
        assert_eq!(promise.get().unwrap(), 1);
    }

    #[test]
    fn then_apply_chains_after_completion() {
        let promise: Promise<i32> = Promise::new();
        let derived = promise.then_apply(|value| value * 2);
        promise.complete(21);
        assert_eq!(derived.get().unwrap(), 42);
    }

    #[test]
    fn then_apply_runs_immediately_for_an_already_terminal_promise() {
        let promise: Promise<i32> = Promise::new();
        promise.complete(10);
        let derived = promise.then_apply(|value| value + 1);
        assert_eq!(derived.get().unwrap(), 11);
    }

    #[test]
    fn catch_exception_recovers_a_failure() {
        let promise: Promise<i32> = Promise::new();
        let recovered = promise.catch_exception(|_| -1);
        promise.complete_with(MindroidError::transaction_failure("boom"));
        assert_eq!(recovered.get().unwrap(), -1);
    }

    #[test]
    fn all_of_waits_for_every_input_and_reports_first_failure() {
        let a: Promise<i32> = Promise::new();
        let b: Promise<i32> = Promise::new();
        let combined = Promise::all_of(vec![a.clone(), b.clone()]);
        a.complete_with(MindroidError::transaction_failure("first"));
        assert!(!combined.is_done());
        b.complete(7);
        assert!(combined.get().is_err());
    }

    #[test]
    fn any_of_completes_with_the_first_terminal() {
        let a: Promise<i32> = Promise::new();
        let b: Promise<i32> = Promise::new();
        let first = Promise::any_of(vec![a.clone(), b.clone()]);
        b.complete(5);
        a.complete(9);
        assert_eq!(first.get().unwrap(), 5);
    }

    #[test]
    fn get_timeout_fails_when_still_pending() {
        let promise: Promise<i32> = Promise::new();
        let result = promise.get_timeout(Duration::from_millis(20));
        assert!(result.is_err());
    }

    #[test]
    fn cancel_fails_a_pending_promise_but_not_an_already_done_one() {
        let promise: Promise<i32> = Promise::new();
        assert!(promise.cancel());
        assert!(promise.get().is_err());

        let done: Promise<i32> = Promise::new();
        done.complete(1);
        assert!(!done.cancel());
        assert_eq!(done.get().unwrap(), 1);
    }
}
