// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FIFO of native responses waiting to be dispatched on the host's main thread.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tether_core::value::Value;

#[derive(Debug, Default)]
pub struct MainQueue {
    pending: Mutex<VecDeque<Value>>,
}

impl MainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Value>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, response: Value) {
        self.lock().push_back(response);
    }

    /// Take everything queued so far, in arrival order.
    ///
    /// Responses pushed while the caller processes the batch wait for the
    /// next drain.
    pub fn drain(&self) -> Vec<Value> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> usize {
        let mut pending = self.lock();
        let count = pending.len();
        pending.clear();
        count
    }
}
