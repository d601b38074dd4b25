// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic seams between the bridge and the native layer.
//
// Requests leave through a `NativeGateway`; asynchronous responses come back
// through a `ResponseSink`; each feature module interprets its own responses
// with a `ResponseDecoder`.

use std::sync::Arc;

use tether_core::error::Result;
use tether_core::value::Value;

use crate::payload::Payload;

/// Outbound half of the bridge: hands a request to the native layer.
pub trait NativeGateway: Send + Sync {
    /// Human-readable platform name (e.g. "iOS", "Android", "Desktop (stub)").
    fn platform_name(&self) -> &str;

    /// Send one request and return whatever the native layer answers inline.
    ///
    /// The inline value may already be the final result, or just an empty
    /// acknowledgement when the real answer arrives later through the sink.
    /// Returns `TetherError::BridgeUnavailable` if the native layer cannot be
    /// reached. The gateway never touches the handler registry.
    fn invoke(&self, request: &Value) -> Result<Value>;
}

impl<T: NativeGateway + ?Sized> NativeGateway for Arc<T> {
    fn platform_name(&self) -> &str {
        (**self).platform_name()
    }

    fn invoke(&self, request: &Value) -> Result<Value> {
        (**self).invoke(request)
    }
}

/// Inbound half of the bridge: receives responses from the native layer.
///
/// Implementations must tolerate calls from any thread, including reentrant
/// calls made from inside `NativeGateway::invoke`.
pub trait ResponseSink: Send + Sync {
    fn deliver(&self, response: Value);
}

/// Per-module interpretation of response payloads.
pub trait ResponseDecoder: Send + Sync {
    /// Module name as it appears in the `module` field of the wire envelope.
    fn module(&self) -> &'static str;

    /// Decode the method-specific part of a response.
    ///
    /// Returns `None` when the module does not know `method`. Known methods
    /// always decode, substituting empty values for absent or malformed
    /// fields.
    fn decode(&self, method: &str, response: &Value) -> Option<Payload>;
}
