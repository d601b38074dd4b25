// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tether — value model, result envelope and shared types for the
// managed/native bridge.

pub mod config;
pub mod error;
pub mod result;
pub mod types;
pub mod value;

pub use config::BridgeConfig;
pub use error::{Result, TetherError};
pub use result::{Code, ErrorCode, ResultEnvelope};
pub use types::*;
pub use value::{Object, Value, to_mapping};
