// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feature modules: thin call sites plus the decoders for their responses.

pub mod analytics;
pub mod data_store;
pub mod platform_helper;
pub mod provider_apple;

use crate::traits::ResponseDecoder;

pub use analytics::Analytics;
pub use data_store::DataStore;
pub use platform_helper::{PlatformHelper, PlatformShare, ShareType};
pub use provider_apple::ProviderApple;

/// One decoder per built-in feature module.
pub fn decoders() -> Vec<Box<dyn ResponseDecoder>> {
    vec![
        Box::new(analytics::AnalyticsDecoder),
        Box::new(data_store::DataStoreDecoder),
        Box::new(platform_helper::PlatformHelperDecoder),
        Box::new(provider_apple::ProviderAppleDecoder),
    ]
}
