// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pending-call callbacks.
//
// One variant per callback signature used by the feature modules. A callback
// is consumed by `deliver`, so it can run at most once.

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::oneshot;
use tracing::warn;

use tether_core::error::{Result, TetherError};
use tether_core::result::ResultEnvelope;

use crate::payload::{Achievement, Payload};

/// Completion callback stored in the handler registry.
pub enum Callback {
    Result(Box<dyn FnOnce(ResultEnvelope) + Send>),
    Text(Box<dyn FnOnce(ResultEnvelope, String) + Send>),
    Mapping(Box<dyn FnOnce(ResultEnvelope, BTreeMap<String, String>) + Send>),
    KeyedMapping(Box<dyn FnOnce(ResultEnvelope, String, BTreeMap<i64, String>) + Send>),
    Achievements(Box<dyn FnOnce(ResultEnvelope, Vec<Achievement>) + Send>),
    Permissions(Box<dyn FnOnce(ResultEnvelope, Vec<String>, Vec<String>) + Send>),
    /// Receives the decoded payload untouched.
    Any(Box<dyn FnOnce(ResultEnvelope, Payload) + Send>),
}

impl Callback {
    pub fn result(f: impl FnOnce(ResultEnvelope) + Send + 'static) -> Self {
        Callback::Result(Box::new(f))
    }

    pub fn text(f: impl FnOnce(ResultEnvelope, String) + Send + 'static) -> Self {
        Callback::Text(Box::new(f))
    }

    pub fn mapping(f: impl FnOnce(ResultEnvelope, BTreeMap<String, String>) + Send + 'static) -> Self {
        Callback::Mapping(Box::new(f))
    }

    pub fn keyed_mapping(
        f: impl FnOnce(ResultEnvelope, String, BTreeMap<i64, String>) + Send + 'static,
    ) -> Self {
        Callback::KeyedMapping(Box::new(f))
    }

    pub fn achievements(f: impl FnOnce(ResultEnvelope, Vec<Achievement>) + Send + 'static) -> Self {
        Callback::Achievements(Box::new(f))
    }

    pub fn permissions(
        f: impl FnOnce(ResultEnvelope, Vec<String>, Vec<String>) + Send + 'static,
    ) -> Self {
        Callback::Permissions(Box::new(f))
    }

    pub fn any(f: impl FnOnce(ResultEnvelope, Payload) + Send + 'static) -> Self {
        Callback::Any(Box::new(f))
    }

    /// A callback that forwards its outcome to an awaitable [`Reply`].
    pub fn oneshot() -> (Self, Reply) {
        let (tx, rx) = oneshot::channel();
        let callback = Callback::any(move |result, payload| {
            // The receiver may already be gone; nobody is waiting then.
            let _ = tx.send((result, payload));
        });
        (callback, Reply { rx })
    }

    /// Short name of the expected payload shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Callback::Result(_) => "result",
            Callback::Text(_) => "text",
            Callback::Mapping(_) => "mapping",
            Callback::KeyedMapping(_) => "keyed-mapping",
            Callback::Achievements(_) => "achievements",
            Callback::Permissions(_) => "permissions",
            Callback::Any(_) => "any",
        }
    }

    /// Run the callback with a result and its decoded payload.
    ///
    /// A payload of the wrong shape is replaced by the empty value of the
    /// shape the callback expects. An `Empty` payload (engine-side failures)
    /// is accepted silently by every variant.
    pub fn deliver(self, result: ResultEnvelope, payload: Payload) {
        let kind = self.kind();
        let mismatch = |payload: &Payload| {
            if !payload.is_empty() {
                warn!(callback = kind, payload = payload.kind(), "payload shape mismatch, delivering empty value");
            }
        };

        match (self, payload) {
            (Callback::Result(f), _) => f(result),
            (Callback::Any(f), payload) => f(result, payload),
            (Callback::Text(f), Payload::Text(text)) => f(result, text),
            (Callback::Mapping(f), Payload::Mapping(map)) => f(result, map),
            (Callback::KeyedMapping(f), Payload::KeyedMapping { key, entries }) => f(result, key, entries),
            (Callback::Achievements(f), Payload::Achievements(list)) => f(result, list),
            (Callback::Permissions(f), Payload::Permissions { granted, denied }) => {
                f(result, granted, denied)
            }
            (Callback::Text(f), other) => {
                mismatch(&other);
                f(result, String::new())
            }
            (Callback::Mapping(f), other) => {
                mismatch(&other);
                f(result, BTreeMap::new())
            }
            (Callback::KeyedMapping(f), other) => {
                mismatch(&other);
                f(result, String::new(), BTreeMap::new())
            }
            (Callback::Achievements(f), other) => {
                mismatch(&other);
                f(result, Vec::new())
            }
            (Callback::Permissions(f), other) => {
                mismatch(&other);
                f(result, Vec::new(), Vec::new())
            }
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.kind()).finish()
    }
}

/// Awaitable outcome of a call issued with [`Callback::oneshot`].
#[derive(Debug)]
pub struct Reply {
    rx: oneshot::Receiver<(ResultEnvelope, Payload)>,
}

impl Reply {
    /// Wait for the response. Fails with `TetherError::Cancelled` if the
    /// pending call was dropped without being answered (teardown).
    pub async fn wait(self) -> Result<(ResultEnvelope, Payload)> {
        self.rx.await.map_err(|_| TetherError::Cancelled)
    }

    /// Non-blocking check for an already delivered response.
    pub fn try_take(&mut self) -> Option<(ResultEnvelope, Payload)> {
        self.rx.try_recv().ok()
    }
}
