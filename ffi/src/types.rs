//! `#[repr(C)]` types and owned handles for the FFI boundary.
//!
//! # Design
//! C callers see three things: an opaque `FfiSdk`, an opaque
//! `FfiSubscription`, and the `FfiCallbacks` table they fill in. Lifecycle
//! states cross the boundary as JSON C strings so the C side needs no mirror
//! of the record types. The conversion and delivery plumbing lives here to
//! keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::io;
use std::os::raw::c_char;
use std::thread::{self, JoinHandle, ThreadId};

use pokedex_core::observer::{Observer, Subscription, SubscriptionFault};
use pokedex_core::{LifecycleState, PokemonSdk};
use serde::Serialize;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::warn;

/// Name of the thread every callback fires on.
pub const DELIVERY_THREAD_NAME: &str = "pokedex-delivery";

/// Opaque handle to an SDK instance and its delivery thread.
pub struct FfiSdk {
    pub(crate) sdk: PokemonSdk,
    pub(crate) delivery: DeliveryThread,
}

/// Opaque handle to one running subscription.
pub struct FfiSubscription {
    pub(crate) inner: Subscription,
}

/// Callback table supplied by the C caller.
///
/// `on_each` receives every lifecycle state as a JSON C string, valid only
/// for the duration of the call. After that exactly one of `on_complete` or
/// `on_error` fires, unless the subscription was cancelled first. Any entry
/// may be null. `user_data` is passed back untouched and must be usable from
/// the delivery thread.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiCallbacks {
    pub user_data: *mut c_void,
    pub on_each: Option<extern "C" fn(user_data: *mut c_void, state_json: *const c_char)>,
    pub on_complete: Option<extern "C" fn(user_data: *mut c_void)>,
    pub on_error: Option<extern "C" fn(user_data: *mut c_void, message: *const c_char)>,
}

/// Routes observer events to an `FfiCallbacks` table.
pub(crate) struct CallbackObserver {
    callbacks: FfiCallbacks,
}

// The caller vouches for `user_data` being usable from the delivery thread.
unsafe impl Send for CallbackObserver {}

impl CallbackObserver {
    pub(crate) fn new(callbacks: FfiCallbacks) -> Self {
        Self { callbacks }
    }
}

impl<T: Serialize> Observer<LifecycleState<T>> for CallbackObserver {
    fn on_each(&mut self, state: LifecycleState<T>) {
        if let Some(on_each) = self.callbacks.on_each {
            let json = state_json(&state);
            on_each(self.callbacks.user_data, json.as_ptr());
        }
    }

    fn on_complete(&mut self) {
        if let Some(on_complete) = self.callbacks.on_complete {
            on_complete(self.callbacks.user_data);
        }
    }

    fn on_error(&mut self, fault: SubscriptionFault) {
        if let Some(on_error) = self.callbacks.on_error {
            let message = c_string(fault.message);
            on_error(self.callbacks.user_data, message.as_ptr());
        }
    }
}

/// `{"state":"success","data":...}` and friends.
pub(crate) fn state_json<T: Serialize>(state: &LifecycleState<T>) -> CString {
    let json = serde_json::to_string(state).unwrap_or_else(|e| {
        serde_json::json!({ "state": "failure", "message": format!("unserializable state: {e}") })
            .to_string()
    });
    c_string(json)
}

/// JSON and `Display` output never contain NUL, so the fallback is unreachable
/// in practice.
fn c_string(s: String) -> CString {
    CString::new(s).unwrap_or_default()
}

/// Dedicated thread driving a current-thread runtime. Every subscription of
/// one `FfiSdk` is collected here, so all of its callbacks share one thread.
pub(crate) struct DeliveryThread {
    handle: Handle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl DeliveryThread {
    pub(crate) fn spawn() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let (shutdown, stopped) = oneshot::channel::<()>();
        let thread = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = stopped.await;
                });
            })?;
        Ok(Self {
            handle,
            shutdown: Some(shutdown),
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Drop for DeliveryThread {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Freed from inside a callback: the thread winds down on its own.
        if thread::current().id() == self.thread_id {
            return;
        }
        if thread.join().is_err() {
            warn!("delivery thread panicked");
        }
    }
}
