// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Response dispatch: the native layer's way back into the engine.
//
// A `Dispatcher` per feature module resolves the method, pops the handler,
// decodes the ResultAPI and payload, and runs the callback once. The `Router`
// picks the dispatcher by the response's `module` field. Nothing that arrives
// here is ever reported as an error: malformed, stray or unknown responses
// are logged and dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, warn};

use tether_core::result::ResultEnvelope;
use tether_core::types::Handle;
use tether_core::value::Value;

use crate::payload::Payload;
use crate::registry::HandlerRegistry;
use crate::traits::{ResponseDecoder, ResponseSink};

/// What became of one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A pending callback was popped and invoked.
    Delivered,
    /// A handle-less event went to a persistent listener.
    Listener,
    /// The handle was not pending (late, duplicate or cancelled).
    Stray,
    /// The module does not know the method. Any popped handler was discarded.
    UnknownMethod,
    /// No dispatcher is registered for the module.
    UnknownModule,
    /// A handle-less event with no listener set.
    Unaddressed,
    /// The response text could not be parsed.
    Malformed,
}

// ---------------------------------------------------------------------------
// Persistent listeners
// ---------------------------------------------------------------------------

/// Multi-shot handler for handle-less native events.
pub type Listener = Arc<dyn Fn(ResultEnvelope, Payload) + Send + Sync>;

/// Listeners keyed by `(module, method)`.
#[derive(Default)]
pub struct ListenerTable {
    inner: Mutex<HashMap<(String, String), Listener>>,
}

impl ListenerTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), Listener>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the listener for `(module, method)`, replacing any previous one.
    pub fn set(&self, module: &str, method: &str, listener: Listener) -> Option<Listener> {
        self.lock().insert((module.to_owned(), method.to_owned()), listener)
    }

    pub fn remove(&self, module: &str, method: &str) -> Option<Listener> {
        self.lock().remove(&(module.to_owned(), method.to_owned()))
    }

    pub fn get(&self, module: &str, method: &str) -> Option<Listener> {
        self.lock().get(&(module.to_owned(), method.to_owned())).cloned()
    }

    pub fn clear(&self) -> usize {
        let dropped = std::mem::take(&mut *self.lock());
        dropped.len()
    }
}

// ---------------------------------------------------------------------------
// Per-module dispatcher
// ---------------------------------------------------------------------------

/// Delivers responses for one feature module.
pub struct Dispatcher {
    decoder: Box<dyn ResponseDecoder>,
    registry: Arc<HandlerRegistry>,
    listeners: Arc<ListenerTable>,
    warn_on_stray: bool,
}

impl Dispatcher {
    pub fn new(
        decoder: Box<dyn ResponseDecoder>,
        registry: Arc<HandlerRegistry>,
        listeners: Arc<ListenerTable>,
    ) -> Self {
        Self {
            decoder,
            registry,
            listeners,
            warn_on_stray: false,
        }
    }

    /// Log stray responses at `warn` instead of `debug`.
    pub fn warn_on_stray(mut self, enabled: bool) -> Self {
        self.warn_on_stray = enabled;
        self
    }

    pub fn module(&self) -> &'static str {
        self.decoder.module()
    }

    /// Deliver one response. Runs the callback, if any, before returning.
    #[instrument(skip(self, response), fields(module = self.module()))]
    pub fn dispatch(&self, response: &Value) -> Delivery {
        let method = response.str_or("method", "");

        let Some(handle) = Handle::from_wire(response.get_field("handler")) else {
            return self.dispatch_event(method, response);
        };

        let Some(entry) = self.registry.pop(handle) else {
            if self.warn_on_stray {
                warn!(%handle, method, "no pending handler for response");
            } else {
                debug!(%handle, method, "no pending handler for response");
            }
            return Delivery::Stray;
        };

        let Some(payload) = self.decoder.decode(method, response) else {
            debug!(%handle, method, "unknown method, discarding handler");
            return Delivery::UnknownMethod;
        };

        let result = ResultEnvelope::from_response(response);
        debug!(%handle, method, success = result.is_success(), "delivering response");
        entry.callback.deliver(result, payload);
        Delivery::Delivered
    }

    fn dispatch_event(&self, method: &str, response: &Value) -> Delivery {
        let Some(payload) = self.decoder.decode(method, response) else {
            debug!(method, "unknown method");
            return Delivery::UnknownMethod;
        };
        // The table lock is released before the listener runs.
        let Some(listener) = self.listeners.get(self.module(), method) else {
            debug!(method, "no listener for event");
            return Delivery::Unaddressed;
        };
        listener(ResultEnvelope::from_response(response), payload);
        Delivery::Listener
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes responses to the dispatcher named by their `module` field.
#[derive(Default)]
pub struct Router {
    dispatchers: HashMap<&'static str, Dispatcher>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher, replacing any existing one for the same module.
    pub fn add(&mut self, dispatcher: Dispatcher) {
        self.dispatchers.insert(dispatcher.module(), dispatcher);
    }

    pub fn dispatcher(&self, module: &str) -> Option<&Dispatcher> {
        self.dispatchers.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dispatchers.keys().copied()
    }

    pub fn route(&self, response: &Value) -> Delivery {
        let module = response.str_or("module", "");
        match self.dispatchers.get(module) {
            Some(dispatcher) => dispatcher.dispatch(response),
            None => {
                debug!(module, "no dispatcher for module");
                Delivery::UnknownModule
            }
        }
    }

    /// Parse native response text and route it.
    pub fn route_text(&self, text: &str) -> Delivery {
        match Value::parse(text) {
            Ok(response) => self.route(&response),
            Err(e) => {
                warn!(error = %e, "dropping malformed native response");
                Delivery::Malformed
            }
        }
    }
}

impl ResponseSink for Router {
    fn deliver(&self, response: Value) {
        self.route(&response);
    }
}

/// Parse native text and hand it to a sink. Malformed text is logged and dropped.
pub fn deliver_text(sink: &dyn ResponseSink, text: &str) -> bool {
    match Value::parse(text) {
        Ok(response) => {
            sink.deliver(response);
            true
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed native response");
            false
        }
    }
}
