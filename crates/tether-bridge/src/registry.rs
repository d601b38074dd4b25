// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handler registry: pending callbacks keyed by correlation handle.
//
// Every operation holds the lock only for a map insert or remove. Callbacks
// are handed back to the caller and never run while the lock is held, so a
// callback may re-enter the bridge freely.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use tether_core::error::{Result, TetherError};
use tether_core::types::Handle;

use crate::callback::Callback;

/// One outstanding call awaiting its native response.
#[derive(Debug)]
pub struct HandlerEntry {
    pub handle: Handle,
    pub module: String,
    pub method: String,
    pub callback: Callback,
    pub registered_at: DateTime<Utc>,
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Entries ever registered.
    pub registered: u64,
    /// Entries popped for delivery.
    pub delivered: u64,
    /// Pops that found nothing (late, duplicate or unknown handles).
    pub stray: u64,
    /// Entries dropped by teardown.
    pub invalidated: u64,
    /// Entries removed by caller-driven expiry.
    pub expired: u64,
    /// Entries currently pending.
    pub pending: usize,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Handle, HandlerEntry>,
    next: u64,
    stats: RegistryStats,
}

/// Process-wide table of pending callbacks.
pub struct HandlerRegistry {
    inner: Mutex<Inner>,
}

impl HandlerRegistry {
    /// Create an empty registry whose first generated handle is `first_handle`.
    ///
    /// A `first_handle` above [`Handle::MAX`] cannot cross the wire intact
    /// and is replaced by 0.
    pub fn new(first_handle: u64) -> Self {
        let first_handle = if first_handle > Handle::MAX {
            warn!(first_handle, max = Handle::MAX, "first handle out of wire range, starting at 0");
            0
        } else {
            first_handle
        };
        Self {
            inner: Mutex::new(Inner {
                next: first_handle,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic elsewhere cannot leave the map half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an entry under its own handle.
    ///
    /// Fails with `DuplicateHandle` if the handle is live; the existing entry
    /// is left untouched.
    pub fn register(&self, entry: HandlerEntry) -> Result<()> {
        let mut inner = self.lock();
        if inner.entries.contains_key(&entry.handle) {
            return Err(TetherError::DuplicateHandle(entry.handle));
        }
        debug!(handle = %entry.handle, module = %entry.module, method = %entry.method, "handler registered");
        inner.stats.registered += 1;
        inner.entries.insert(entry.handle, entry);
        Ok(())
    }

    /// Generate a fresh handle and register `callback` under it in one step.
    ///
    /// Handles increase monotonically up to [`Handle::MAX`], then wrap to 0;
    /// a handle still live after wrap-around is skipped.
    pub fn register_new(&self, module: &str, method: &str, callback: Callback) -> Handle {
        let mut inner = self.lock();
        let handle = loop {
            let candidate = Handle(inner.next);
            inner.next = if inner.next >= Handle::MAX { 0 } else { inner.next + 1 };
            if !inner.entries.contains_key(&candidate) {
                break candidate;
            }
        };
        debug!(handle = %handle, module, method, callback = callback.kind(), "handler registered");
        inner.stats.registered += 1;
        inner.entries.insert(
            handle,
            HandlerEntry {
                handle,
                module: module.to_owned(),
                method: method.to_owned(),
                callback,
                registered_at: Utc::now(),
            },
        );
        handle
    }

    /// Remove and return the entry for `handle`.
    ///
    /// A handle resolves at most once; every later pop returns `None`.
    pub fn pop(&self, handle: Handle) -> Option<HandlerEntry> {
        let mut inner = self.lock();
        let entry = inner.entries.remove(&handle);
        if entry.is_some() {
            inner.stats.delivered += 1;
        } else {
            inner.stats.stray += 1;
        }
        entry
    }

    /// Whether `handle` is currently pending.
    pub fn contains(&self, handle: Handle) -> bool {
        self.lock().entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every pending entry without invoking it. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let dropped = {
            let mut inner = self.lock();
            let dropped = std::mem::take(&mut inner.entries);
            inner.stats.invalidated += dropped.len() as u64;
            dropped
        };
        // Callbacks are dropped after the lock is released.
        let count = dropped.len();
        drop(dropped);
        info!(count, "pending handlers invalidated");
        count
    }

    /// Remove entries registered strictly before `cutoff`, oldest first.
    pub fn take_registered_before(&self, cutoff: DateTime<Utc>) -> Vec<HandlerEntry> {
        let mut inner = self.lock();
        let stale: Vec<Handle> = inner
            .entries
            .values()
            .filter(|e| e.registered_at < cutoff)
            .map(|e| e.handle)
            .collect();
        let mut taken: Vec<HandlerEntry> = stale
            .into_iter()
            .filter_map(|h| inner.entries.remove(&h))
            .collect();
        inner.stats.expired += taken.len() as u64;
        drop(inner);

        taken.sort_by_key(|e| (e.registered_at, e.handle));
        taken
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.lock();
        RegistryStats {
            pending: inner.entries.len(),
            ..inner.stats
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Duration;

    use super::*;

    fn entry(handle: u64) -> HandlerEntry {
        HandlerEntry {
            handle: Handle(handle),
            module: "DataStore".into(),
            method: "get".into(),
            callback: Callback::result(|_| {}),
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn pop_is_destructive() {
        let registry = HandlerRegistry::default();
        registry.register(entry(7)).expect("register");
        assert!(registry.pop(Handle(7)).is_some());
        assert!(registry.pop(Handle(7)).is_none());
        assert!(registry.pop(Handle(7)).is_none());
        let stats = registry.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.stray, 2);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let registry = HandlerRegistry::default();
        registry.register(entry(3)).expect("first");
        let err = registry.register(entry(3)).expect_err("duplicate");
        assert!(matches!(err, TetherError::DuplicateHandle(Handle(3))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn generated_handles_are_monotonic() {
        let registry = HandlerRegistry::new(100);
        let a = registry.register_new("DataStore", "get", Callback::result(|_| {}));
        let b = registry.register_new("DataStore", "get", Callback::result(|_| {}));
        assert_eq!(a, Handle(100));
        assert_eq!(b, Handle(101));
        let popped = registry.pop(a).expect("pending");
        assert_eq!(popped.module, "DataStore");
        assert_eq!(popped.method, "get");
    }

    #[test]
    fn generated_handles_skip_live_entries() {
        let registry = HandlerRegistry::new(5);
        registry.register(entry(5)).expect("register");
        let h = registry.register_new("DataStore", "set", Callback::result(|_| {}));
        assert_eq!(h, Handle(6));
    }

    #[test]
    fn first_handle_beyond_wire_range_starts_at_zero() {
        let registry = HandlerRegistry::new((1 << 53) + 1);
        let h = registry.register_new("DataStore", "get", Callback::result(|_| {}));
        assert_eq!(h, Handle(0));
    }

    #[test]
    fn generated_handles_wrap_at_wire_limit() {
        let registry = HandlerRegistry::new(Handle::MAX);
        registry.register(entry(0)).expect("register");
        let last = registry.register_new("DataStore", "get", Callback::result(|_| {}));
        let wrapped = registry.register_new("DataStore", "get", Callback::result(|_| {}));
        assert_eq!(last, Handle(Handle::MAX));
        assert_eq!(wrapped, Handle(1));
    }

    #[test]
    fn invalidate_all_drops_without_invoking() {
        let registry = HandlerRegistry::default();
        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        registry.register_new("DataStore", "get", Callback::result(move |_| *flag.lock().expect("lock") = true));
        registry.register_new("DataStore", "set", Callback::result(|_| {}));

        assert_eq!(registry.invalidate_all(), 2);
        assert!(registry.is_empty());
        assert!(!*fired.lock().expect("lock"));
        assert_eq!(registry.stats().invalidated, 2);
    }

    #[test]
    fn expiry_takes_only_old_entries() {
        let registry = HandlerRegistry::default();
        let mut old = entry(1);
        old.registered_at = Utc::now() - Duration::seconds(60);
        registry.register(old).expect("register");
        registry.register(entry(2)).expect("register");

        let taken = registry.take_registered_before(Utc::now() - Duration::seconds(30));
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].handle, Handle(1));
        assert!(registry.contains(Handle(2)));
        assert_eq!(registry.stats().expired, 1);
    }

    #[test]
    fn concurrent_pops_deliver_once() {
        let registry = Arc::new(HandlerRegistry::default());
        let handles: Vec<Handle> = (0..64)
            .map(|_| registry.register_new("DataStore", "get", Callback::result(|_| {})))
            .collect();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let handles = handles.clone();
                thread::spawn(move || handles.iter().filter(|h| registry.pop(**h).is_some()).count())
            })
            .collect();
        let total: usize = workers.into_iter().map(|w| w.join().expect("join")).sum();

        assert_eq!(total, 64);
        let stats = registry.stats();
        assert_eq!(stats.delivered, 64);
        assert_eq!(stats.stray, 64 * 3);
    }
}
