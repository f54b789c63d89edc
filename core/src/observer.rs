//! Callback adapter over lifecycle streams.
//!
//! # Design
//! Hosts that cannot poll a Rust `Stream` subscribe an `Observer` instead.
//! `subscribe` spawns one collector task on the runtime handle it is given;
//! that runtime is the delivery context. Pass the handle of a current-thread
//! runtime driven by the host's UI thread (or a dedicated thread, as the FFI
//! bridge does) and every callback fires on that one thread.
//!
//! Guarantees per subscription:
//! - callbacks never overlap; each runs under the subscription's gate,
//! - every emitted value reaches `on_each`, including `Failure` states,
//! - exactly one of `on_complete` / `on_error` fires, unless cancelled first,
//! - once `cancel()` returns, no further callback fires. When `cancel()` is
//!   called from inside a callback, a callback of the target already running
//!   on another thread may still finish, but none starts afterwards.
//!
//! `on_error` is reserved for faults in the delivery machinery itself: a
//! panic while polling the stream or inside `on_each`. Upstream failures are
//! ordinary values.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::{FutureExt, Stream, StreamExt};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// A fault raised while iterating a subscribed stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("subscription fault: {message}")]
pub struct SubscriptionFault {
    pub message: String,
}

impl SubscriptionFault {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self { message }
    }
}

/// Receives the values and the terminal outcome of one subscription.
pub trait Observer<T>: Send + 'static {
    fn on_each(&mut self, value: T);
    fn on_complete(&mut self);
    fn on_error(&mut self, fault: SubscriptionFault);
}

/// `Observer` assembled from three closures.
pub struct Callbacks<T> {
    on_each: Box<dyn FnMut(T) + Send>,
    on_complete: Box<dyn FnMut() + Send>,
    on_error: Box<dyn FnMut(SubscriptionFault) + Send>,
}

impl<T> Callbacks<T> {
    pub fn new(
        on_each: impl FnMut(T) + Send + 'static,
        on_complete: impl FnMut() + Send + 'static,
        on_error: impl FnMut(SubscriptionFault) + Send + 'static,
    ) -> Self {
        Self {
            on_each: Box::new(on_each),
            on_complete: Box::new(on_complete),
            on_error: Box::new(on_error),
        }
    }
}

impl<T: 'static> Observer<T> for Callbacks<T> {
    fn on_each(&mut self, value: T) {
        (self.on_each)(value)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }

    fn on_error(&mut self, fault: SubscriptionFault) {
        (self.on_error)(fault)
    }
}

enum Delivery {
    Delivered,
    Skipped,
    Panicked(SubscriptionFault),
}

thread_local! {
    /// Number of subscription callbacks running on this thread.
    static CALLBACK_DEPTH: Cell<usize> = const { Cell::new(0) };
}

fn in_callback() -> bool {
    CALLBACK_DEPTH.with(|depth| depth.get() > 0)
}

/// Marks the current thread as inside a callback until dropped.
struct CallbackScope;

impl CallbackScope {
    fn enter() -> Self {
        CALLBACK_DEPTH.with(|depth| depth.set(depth.get() + 1));
        CallbackScope
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        CALLBACK_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Default)]
struct Shared {
    cancelled: AtomicBool,
    terminated: AtomicBool,
    gate: Mutex<()>,
}

impl Shared {
    /// Run one callback under the gate unless the subscription is over.
    fn deliver(&self, terminal: bool, callback: impl FnOnce()) -> Delivery {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cancelled.load(Ordering::Acquire) || self.terminated.load(Ordering::Acquire) {
            return Delivery::Skipped;
        }
        if terminal {
            self.terminated.store(true, Ordering::Release);
        }
        let scope = CallbackScope::enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(callback));
        drop(scope);
        match outcome {
            Ok(()) => Delivery::Delivered,
            Err(payload) => Delivery::Panicked(SubscriptionFault::from_panic(payload)),
        }
    }
}

/// Handle to one running subscription.
pub struct Subscription {
    id: Uuid,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `true` until the subscription terminates or is cancelled.
    pub fn is_active(&self) -> bool {
        !self.shared.cancelled.load(Ordering::Acquire)
            && !self.shared.terminated.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Stop delivery and free the collector task. Idempotent, and safe to
    /// call from inside one of this subscription's callbacks. A request
    /// already on the wire is dropped with the task; its result is never
    /// delivered.
    pub fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wait out a running callback. Inside a callback the gate may be our
        // own or held by a subscription waiting on us; `deliver` re-checks
        // `cancelled` under the gate either way.
        if !in_callback() {
            drop(self.shared.gate.lock().unwrap_or_else(PoisonError::into_inner));
        }
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        debug!(subscription = %self.id, "subscription cancelled");
    }
}

/// Drive `stream` on `runtime`, reporting to `observer`.
///
/// Dropping the returned handle does not cancel the subscription.
pub fn subscribe<S, O>(stream: S, observer: O, runtime: &Handle) -> Subscription
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
    O: Observer<S::Item>,
{
    let id = Uuid::new_v4();
    let shared = Arc::new(Shared::default());
    let task = runtime.spawn(collect(id, stream, observer, Arc::clone(&shared)));
    debug!(subscription = %id, "subscribed");
    Subscription {
        id,
        shared,
        task: Mutex::new(Some(task)),
    }
}

/// Method form of [`subscribe`].
pub trait SubscribeExt: Stream + Sized {
    fn subscribe<O>(self, observer: O, runtime: &Handle) -> Subscription
    where
        Self: Send + 'static,
        Self::Item: Send + 'static,
        O: Observer<Self::Item>,
    {
        subscribe(self, observer, runtime)
    }
}

impl<S: Stream> SubscribeExt for S {}

async fn collect<S, O>(id: Uuid, stream: S, mut observer: O, shared: Arc<Shared>)
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
    O: Observer<S::Item>,
{
    let mut stream = Box::pin(stream);
    loop {
        let fault = match AssertUnwindSafe(stream.next()).catch_unwind().await {
            Ok(Some(value)) => match shared.deliver(false, || observer.on_each(value)) {
                Delivery::Delivered => continue,
                Delivery::Skipped => return,
                Delivery::Panicked(fault) => fault,
            },
            Ok(None) => {
                if let Delivery::Panicked(fault) = shared.deliver(true, || observer.on_complete()) {
                    warn!(subscription = %id, %fault, "on_complete panicked");
                }
                return;
            }
            Err(payload) => SubscriptionFault::from_panic(payload),
        };

        warn!(subscription = %id, %fault, "subscription faulted");
        if let Delivery::Panicked(fault) = shared.deliver(true, || observer.on_error(fault.clone())) {
            warn!(subscription = %id, %fault, "on_error panicked");
        }
        return;
    }
}
