// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared identifiers for the bridge protocol.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Wire value meaning "no handler expected".
pub const NO_HANDLER: i64 = -1;

/// Correlation id linking one outstanding native call to its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u64);

impl Handle {
    /// Largest handle that survives a round trip through a JSON number.
    pub const MAX: u64 = (1 << 53) - 1;

    /// Read a handle from the `handler` field of a native response.
    ///
    /// Only a non-negative whole number up to [`Handle::MAX`] names a handle.
    /// The `-1` sentinel, a missing field, or any other shape means the
    /// response expects no handler.
    pub fn from_wire(value: Option<&Value>) -> Option<Self> {
        let n = value?.as_f64()?;
        if n >= 0.0 && n.fract() == 0.0 && n <= Self::MAX as f64 {
            Some(Self(n as u64))
        } else {
            None
        }
    }

    /// Wire representation stamped into request envelopes.
    pub fn to_wire(self) -> Value {
        Value::from(self.0)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
