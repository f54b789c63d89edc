//! C-ABI bridge over `pokedex-core`.
//!
//! # Overview
//! Hosts that cannot poll Rust streams call the SDK through `extern "C"`
//! functions and receive lifecycle states through a callback table. Each
//! operation returns an `FfiSubscription` handle that can be cancelled.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Each `FfiSdk` owns one delivery thread running a current-thread tokio
//!   runtime. Requests and callbacks for that SDK all run there; a callback
//!   that blocks stalls every other subscription of the same SDK.
//! - States are delivered as JSON C strings (`{"state":"pending"}`,
//!   `{"state":"success","data":...}`, `{"state":"failure","message":...}`).
//!   Upstream failures arrive through `on_each`; `on_error` is reserved for
//!   faults in the delivery machinery.
//! - Null handles and null or non-UTF-8 strings make a function return null
//!   (or `false`) without side effects.
//! - The C caller owns returned handles and releases them with the matching
//!   `pokedex_*_free` function.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use pokedex_core::observer::subscribe;
use pokedex_core::{LifecycleStream, PokemonSdk, SdkConfig, SdkError};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use types::*;

// ---------------------------------------------------------------------------
// SDK lifecycle
// ---------------------------------------------------------------------------

/// Create an SDK instance.
///
/// Settings come from `POKEDEX_BASE_URL` / `POKEDEX_TIMEOUT_SECS`; a non-null
/// `base_url` overrides the base. Returns null if `base_url` is not UTF-8 or
/// the SDK could not be started. Free with `pokedex_sdk_free`.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_sdk_new(base_url: *const c_char) -> *mut FfiSdk {
    catch_unwind(|| {
        let mut config = SdkConfig::from_env();
        if !base_url.is_null() {
            match unsafe { borrow_str(base_url) } {
                Some(url) => config = config.with_base_url(url),
                None => return std::ptr::null_mut(),
            }
        }

        let delivery = match DeliveryThread::spawn() {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(error = %e, "failed to start delivery thread");
                return std::ptr::null_mut();
            }
        };
        let sdk = match PokemonSdk::with_config(config) {
            Ok(sdk) => sdk,
            Err(e) => {
                warn!(error = %e, "failed to create sdk");
                return std::ptr::null_mut();
            }
        };
        Box::into_raw(Box::new(FfiSdk { sdk, delivery }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an SDK created by `pokedex_sdk_new`. Safe to call with null.
///
/// Stops the delivery thread; subscriptions still running are dropped
/// without further callbacks. Subscription handles stay valid and must still
/// be freed.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_sdk_free(sdk: *mut FfiSdk) {
    if !sdk.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(sdk) });
        }));
    }
}

/// Close the SDK's transport. Returns `true` on the first call and `false`
/// afterwards or for null. Every operation on a disposed SDK returns null.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_sdk_dispose(sdk: *const FfiSdk) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(sdk) = (unsafe { sdk.as_ref() }) else {
            return false;
        };
        sdk.sdk.dispose().is_ok()
    }))
    .unwrap_or(false)
}

/// Drop cached records and rewind the listing. Returns `false` for null or
/// a disposed SDK.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_clear_cache(sdk: *const FfiSdk) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(sdk) = (unsafe { sdk.as_ref() }) else {
            return false;
        };
        sdk.sdk.clear_cache().is_ok()
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Next listing page, or the first page again when `refresh` is set.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_get_pokemon_list(
    sdk: *const FfiSdk,
    refresh: bool,
    callbacks: FfiCallbacks,
) -> *mut FfiSubscription {
    start(sdk, callbacks, |sdk| sdk.get_pokemon_list(refresh))
}

/// Case-insensitive substring search over the catalog names.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_search_pokemon(
    sdk: *const FfiSdk,
    query: *const c_char,
    callbacks: FfiCallbacks,
) -> *mut FfiSubscription {
    let Some(query) = (unsafe { borrow_str(query) }) else {
        return std::ptr::null_mut();
    };
    start(sdk, callbacks, |sdk| sdk.search_pokemon(query))
}

/// Detail record by numeric id, served from cache unless `force_refresh`.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_get_pokemon_detail(
    sdk: *const FfiSdk,
    id: u32,
    force_refresh: bool,
    callbacks: FfiCallbacks,
) -> *mut FfiSubscription {
    start(sdk, callbacks, |sdk| sdk.get_pokemon_detail(id, force_refresh))
}

/// Detail record by name (case-insensitive).
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_get_pokemon_detail_by_name(
    sdk: *const FfiSdk,
    name: *const c_char,
    force_refresh: bool,
    callbacks: FfiCallbacks,
) -> *mut FfiSubscription {
    let Some(name) = (unsafe { borrow_str(name) }) else {
        return std::ptr::null_mut();
    };
    start(sdk, callbacks, |sdk| {
        sdk.get_pokemon_detail_by_name(name, force_refresh)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn pokedex_get_ability_detail(
    sdk: *const FfiSdk,
    name: *const c_char,
    callbacks: FfiCallbacks,
) -> *mut FfiSubscription {
    let Some(name) = (unsafe { borrow_str(name) }) else {
        return std::ptr::null_mut();
    };
    start(sdk, callbacks, |sdk| sdk.get_ability_detail(name))
}

#[unsafe(no_mangle)]
pub extern "C" fn pokedex_get_type_detail(
    sdk: *const FfiSdk,
    name: *const c_char,
    callbacks: FfiCallbacks,
) -> *mut FfiSubscription {
    let Some(name) = (unsafe { borrow_str(name) }) else {
        return std::ptr::null_mut();
    };
    start(sdk, callbacks, |sdk| sdk.get_type_detail(name))
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Stop delivery. No callback fires after this returns. Idempotent, and safe
/// to call from inside one of the subscription's own callbacks.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_subscription_cancel(subscription: *const FfiSubscription) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        if let Some(subscription) = unsafe { subscription.as_ref() } {
            subscription.inner.cancel();
        }
    }));
}

/// `true` until the subscription completes, faults, or is cancelled.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_subscription_is_active(subscription: *const FfiSubscription) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        unsafe { subscription.as_ref() }.is_some_and(|s| s.inner.is_active())
    }))
    .unwrap_or(false)
}

/// Free a subscription handle. Does not cancel it. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_subscription_free(subscription: *mut FfiSubscription) {
    if !subscription.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(subscription) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a `tracing` subscriber writing to stderr, filtered by `RUST_LOG`
/// (default `info`). Returns `false` if a subscriber was already installed.
#[unsafe(no_mangle)]
pub extern "C" fn pokedex_init_logging() -> bool {
    catch_unwind(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Borrow a C string as UTF-8. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Open a stream on `sdk` and subscribe `callbacks` to it on the SDK's
/// delivery thread.
fn start<T, F>(sdk: *const FfiSdk, callbacks: FfiCallbacks, open: F) -> *mut FfiSubscription
where
    T: Serialize + Send + 'static,
    F: FnOnce(&PokemonSdk) -> Result<LifecycleStream<T>, SdkError>,
{
    catch_unwind(AssertUnwindSafe(|| {
        let Some(sdk) = (unsafe { sdk.as_ref() }) else {
            return std::ptr::null_mut();
        };
        let stream = match open(&sdk.sdk) {
            Ok(stream) => stream,
            Err(e) => {
                info!(error = %e, "operation rejected");
                return std::ptr::null_mut();
            }
        };
        let inner = subscribe(stream, CallbackObserver::new(callbacks), sdk.delivery.handle());
        Box::into_raw(Box::new(FfiSubscription { inner }))
    }))
    .unwrap_or(std::ptr::null_mut())
}
