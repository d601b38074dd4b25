// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outgoing call envelopes.

use tracing::warn;

use tether_core::config::BridgeConfig;
use tether_core::types::Handle;
use tether_core::value::{Object, Value};

use crate::callback::Callback;
use crate::registry::HandlerRegistry;

/// Header keys stamped by the bridge. Argument fields cannot override them.
pub const RESERVED_KEYS: [&str; 5] = ["module", "method", "platform", "targetObject", "handler"];

/// One outgoing request: target module and method, optional correlation
/// handle, and the argument fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    module: String,
    method: String,
    handle: Option<Handle>,
    fields: Object,
}

impl CallEnvelope {
    /// A fire-and-forget envelope with no correlation handle.
    pub fn new(module: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            method: method.into(),
            handle: None,
            fields: Object::new(),
        }
    }

    /// Append an argument field, replacing an earlier field of the same name.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.push_field(key, value);
        self
    }

    pub fn push_field(&mut self, key: &str, value: impl Into<Value>) {
        if RESERVED_KEYS.contains(&key) {
            warn!(module = %self.module, method = %self.method, key, "ignoring argument that shadows a header field");
            return;
        }
        self.fields.insert(key, value);
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    pub fn fields(&self) -> &Object {
        &self.fields
    }

    /// Wire form: `{module, method, platform, targetObject, handler?, ...args}`.
    ///
    /// Builds a fresh value each time, so nothing handed to the native layer
    /// aliases the envelope.
    pub fn to_value(&self, config: &BridgeConfig) -> Value {
        let mut wire = Object::new();
        wire.insert("module", self.module.as_str());
        wire.insert("method", self.method.as_str());
        wire.insert("platform", config.platform.as_str());
        wire.insert("targetObject", config.target_object.as_str());
        if let Some(handle) = self.handle {
            wire.insert("handler", handle.to_wire());
        }
        for (key, value) in self.fields.iter() {
            wire.insert(key, value.clone());
        }
        Value::Object(wire)
    }
}

/// Build an envelope, registering `callback` under a fresh handle first.
///
/// Registration completes before this returns, so even a native layer that
/// answers synchronously from inside the gateway call finds the handler.
pub fn build(
    registry: &HandlerRegistry,
    module: &str,
    method: &str,
    callback: Option<Callback>,
) -> CallEnvelope {
    let mut envelope = CallEnvelope::new(module, method);
    envelope.handle = callback.map(|cb| registry.register_new(module, method, cb));
    envelope
}
