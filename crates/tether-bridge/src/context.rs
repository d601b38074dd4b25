// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine contexts handed to native plugins.
//
// A plugin never holds a pointer into the bridge. It holds a non-zero
// integer id, and every delivery resolves that id under a lock, cloning the
// sink out before running it. Once the owning `EngineContext` is dropped the
// id resolves to nothing, so a delivery racing with teardown is dropped
// instead of touching freed memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::dispatch::deliver_text;
use crate::traits::ResponseSink;

type Table = HashMap<u64, Arc<dyn ResponseSink>>;

static CONTEXTS: LazyLock<Mutex<Table>> = LazyLock::new(|| Mutex::new(HashMap::new()));

// 0 is what plugins store once the context is cleared.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn contexts() -> MutexGuard<'static, Table> {
    CONTEXTS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration of a response sink under an id a native plugin can hold.
///
/// The id stays resolvable until this value is dropped.
#[derive(Debug)]
pub struct EngineContext {
    id: u64,
}

impl EngineContext {
    pub fn register(sink: Arc<dyn ResponseSink>) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        contexts().insert(id, sink);
        debug!(id, "engine context registered");
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        // The sink itself is released after the table lock.
        let sink = contexts().remove(&self.id);
        drop(sink);
        debug!(id = self.id, "engine context released");
    }
}

/// Deliver native response text to the sink registered under `id`.
///
/// Returns `false` when the id is unknown (zero, stale or released) or the
/// text is malformed.
pub fn deliver_to(id: u64, text: &str) -> bool {
    let sink = contexts().get(&id).cloned();
    match sink {
        Some(sink) => deliver_text(sink.as_ref(), text),
        None => {
            warn!(id, "native response for a released engine context");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use tether_core::value::Value;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Value>>,
    }

    impl ResponseSink for Recorder {
        fn deliver(&self, response: Value) {
            self.seen.lock().expect("lock").push(response);
        }
    }

    const RESPONSE: &str = r#"{"module":"DataStore","method":"set","handler":3}"#;

    #[test]
    fn registered_context_receives_responses() {
        let recorder = Arc::new(Recorder::default());
        let context = EngineContext::register(Arc::clone(&recorder) as Arc<dyn ResponseSink>);
        assert_ne!(context.id(), 0);

        assert!(deliver_to(context.id(), RESPONSE));
        assert!(!deliver_to(context.id(), "{broken"));
        assert_eq!(recorder.seen.lock().expect("lock").len(), 1);
    }

    #[test]
    fn released_context_drops_late_responses() {
        let recorder = Arc::new(Recorder::default());
        let context = EngineContext::register(Arc::clone(&recorder) as Arc<dyn ResponseSink>);
        let id = context.id();
        drop(context);

        assert!(!deliver_to(id, RESPONSE));
        assert!(!deliver_to(0, RESPONSE));
        assert!(recorder.seen.lock().expect("lock").is_empty());
        // The table no longer keeps the sink alive.
        assert_eq!(Arc::strong_count(&recorder), 1);
    }

    #[test]
    fn delivery_outlives_concurrent_release() {
        let recorder = Arc::new(Recorder::default());
        let context = EngineContext::register(Arc::clone(&recorder) as Arc<dyn ResponseSink>);
        let id = context.id();

        let native = std::thread::spawn(move || (0..200).filter(|_| deliver_to(id, RESPONSE)).count());
        drop(context);
        let delivered = native.join().expect("join");

        assert_eq!(recorder.seen.lock().expect("lock").len(), delivered);
        assert!(!deliver_to(id, RESPONSE));
    }
}
