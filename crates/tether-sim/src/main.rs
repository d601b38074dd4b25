// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tether simulator — drives the bridge end to end against an in-process
// native layer.
//
// Usage: tether-sim [config.json]

mod native;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use tether_bridge::{Bridge, NativeGateway, Payload};
use tether_core::config::BridgeConfig;
use tether_core::error::Result;
use tether_core::value::Object;

use native::SimNative;

/// How long the simulated native layer takes to answer.
const NATIVE_LATENCY: Duration = Duration::from_millis(40);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Tether simulator starting");

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load_or_default(path),
        None => BridgeConfig::default(),
    };

    let bridge = Arc::new(Bridge::with_gateway(config, |sink| {
        Box::new(SimNative::new(sink, NATIVE_LATENCY)) as Box<dyn NativeGateway>
    }));

    // Stand-in for the host's main loop when responses are queued.
    let pump = bridge.config().queue_native_responses.then(|| {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(5));
            loop {
                tick.tick().await;
                bridge.pump();
            }
        })
    });

    if let Err(e) = run(&bridge).await {
        error!(error = %e, "simulated session failed");
    }

    let stats = bridge.stats();
    info!(
        registered = stats.registered,
        delivered = stats.delivered,
        stray = stats.stray,
        expired = stats.expired,
        pending = stats.pending,
        "registry"
    );

    if let Some(pump) = pump {
        pump.abort();
    }
    bridge.shutdown();
}

/// One scripted session covering every response path.
async fn run(bridge: &Bridge) -> Result<()> {
    info!(platform = bridge.platform_name(), "session started");

    // -- DataStore round trips --

    let mut fields = Object::new();
    fields.insert("key", "score");
    fields.insert("value", "50");
    let (result, _) = bridge.request("DataStore", "set", fields).wait().await?;
    info!(%result, "DataStore.set");

    let (result, payload) = bridge.data_store().fetch("score").wait().await?;
    if let Payload::Text(score) = &payload {
        info!(%result, score = %score, "DataStore.get");
    }

    let (result, payload) = bridge.request("DataStore", "getMyData", Object::new()).wait().await?;
    if let Payload::Mapping(mine) = &payload {
        info!(%result, entries = mine.len(), "DataStore.getMyData");
    }

    let mut fields = Object::new();
    fields.insert("key", "score");
    let (result, payload) = bridge.request("DataStore", "getUsersData", fields).wait().await?;
    if let Payload::KeyedMapping { key, entries } = &payload {
        for (player, value) in entries {
            info!(key = %key, player, value = %value, "DataStore.getUsersData");
        }
        info!(%result, players = entries.len(), "DataStore.getUsersData");
    }

    // -- Inline answers --

    let analytics = bridge.analytics();
    let mut log = Object::new();
    log.insert("stage", 3);
    let accepted = analytics.send_analytics_log(log);
    let remaining = analytics.get_remain_analytics_log_count();
    info!(accepted, remaining, "Analytics");

    // -- Unsupported call --

    let (result, _) = bridge.request("ProviderApple", "showLeaderboard", Object::new()).wait().await?;
    info!(%result, "ProviderApple.showLeaderboard");

    // -- Caller-driven expiry; the late answer arrives as a stray --

    let late = bridge.data_store().fetch("score");
    tokio::time::sleep(NATIVE_LATENCY / 4).await;
    let expired = bridge.expire_older_than(chrono::Duration::milliseconds(5));
    let (result, _) = late.wait().await?;
    warn!(expired, %result, "DataStore.get expired");
    tokio::time::sleep(NATIVE_LATENCY * 2).await;

    Ok(())
}
