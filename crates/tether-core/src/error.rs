// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the Tether bridge.
//
// Only bridge-internal faults and transport loss are errors. Anything that
// comes from a native payload (missing field, unknown method, stray response)
// degrades locally and never reaches this enum.

use thiserror::Error;

use crate::types::Handle;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum TetherError {
    // -- Value model --
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    // -- Native gateway --
    #[error("native bridge unavailable: {0}")]
    BridgeUnavailable(String),

    // -- Handler registry --
    #[error("handle {0} is already registered")]
    DuplicateHandle(Handle),

    #[error("pending call was invalidated before a response arrived")]
    Cancelled,

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TetherError>;
