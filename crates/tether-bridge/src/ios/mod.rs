// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS gateway over the native plugin's C ABI.
//
// The plugin (Objective-C/Swift, linked statically into the app) exports
// three symbols:
//
// - `tether_native_call(request)` takes a NUL-terminated JSON request and
//   returns the inline JSON answer, or null. The returned string belongs to
//   the plugin and is released with `tether_native_free`.
// - `tether_native_set_engine_callback(ctx, cb)` stores the function the
//   plugin calls, from any thread, with each asynchronous JSON response.
//   Passing a null callback unregisters it.
//
// `ctx` carries an `EngineContext` id, not an address. A callback that races
// with teardown finds the id released and drops the response.

#![cfg(target_os = "ios")]

use std::ffi::{CStr, CString, c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error, warn};

use tether_core::error::{Result, TetherError};
use tether_core::value::{Object, Value};

use crate::context::{EngineContext, deliver_to};
use crate::traits::{NativeGateway, ResponseSink};

/// Signature of the engine callback handed to the plugin.
pub type EngineCallback = unsafe extern "C" fn(ctx: *mut c_void, response: *const c_char);

unsafe extern "C" {
    fn tether_native_call(request: *const c_char) -> *mut c_char;
    fn tether_native_free(response: *mut c_char);
    fn tether_native_set_engine_callback(ctx: *mut c_void, callback: Option<EngineCallback>);
}

/// Called by the plugin with one asynchronous response.
///
/// # Safety
///
/// `response` must be null or a valid NUL-terminated string for the
/// duration of the call. `ctx` is only read as an integer.
unsafe extern "C" fn engine_callback(ctx: *mut c_void, response: *const c_char) {
    if ctx.is_null() || response.is_null() {
        warn!("native response delivered with a null pointer");
        return;
    }
    // No unwind may cross back into the plugin.
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: the caller guarantees a valid C string.
        let text = unsafe { CStr::from_ptr(response) }.to_string_lossy();
        deliver_to(ctx as usize as u64, &text);
    }));
    if outcome.is_err() {
        error!("panic while delivering native response");
    }
}

/// Gateway that calls into the iOS plugin.
pub struct IosGateway {
    context: EngineContext,
}

impl IosGateway {
    /// Register the engine callback with the plugin.
    pub fn new(sink: Arc<dyn ResponseSink>) -> Self {
        let context = EngineContext::register(sink);
        let ctx = context.id() as usize as *mut c_void;
        // SAFETY: `ctx` is never dereferenced; `engine_callback` has the
        // signature the plugin expects.
        unsafe { tether_native_set_engine_callback(ctx, Some(engine_callback)) };
        Self { context }
    }
}

impl Drop for IosGateway {
    fn drop(&mut self) {
        // SAFETY: plain unregistration. `context` is released after this.
        unsafe { tether_native_set_engine_callback(std::ptr::null_mut(), None) };
        debug!(id = self.context.id(), "engine callback unregistered");
    }
}

impl NativeGateway for IosGateway {
    fn platform_name(&self) -> &str {
        "iOS"
    }

    fn invoke(&self, request: &Value) -> Result<Value> {
        let request = CString::new(request.to_text())
            .map_err(|e| TetherError::BridgeUnavailable(format!("request not representable as C string: {e}")))?;

        // SAFETY: `request` is a valid C string for the duration of the call.
        let raw = unsafe { tether_native_call(request.as_ptr()) };
        if raw.is_null() {
            return Ok(Value::Object(Object::new()));
        }

        // SAFETY: non-null answers are NUL-terminated strings owned by the plugin.
        let inline = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        // SAFETY: `raw` came from `tether_native_call` and is released exactly once.
        unsafe { tether_native_free(raw) };

        if inline.trim().is_empty() {
            return Ok(Value::Object(Object::new()));
        }
        Ok(Value::parse(&inline).unwrap_or_else(|e| {
            warn!(error = %e, "malformed inline answer from native layer");
            Value::Object(Object::new())
        }))
    }
}
