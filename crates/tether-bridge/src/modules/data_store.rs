// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DataStore: server-side key/value storage per player.
//
// Nested results arrive pre-encoded as JSON text (`myData`, `usersData`);
// text that does not decode to an object yields an empty mapping.

use std::collections::BTreeMap;

use tether_core::result::ResultEnvelope;
use tether_core::value::{Object, Value, to_mapping};

use crate::Bridge;
use crate::callback::{Callback, Reply};
use crate::payload::Payload;
use crate::traits::ResponseDecoder;

pub const MODULE: &str = "DataStore";

/// Decoder for DataStore responses.
pub struct DataStoreDecoder;

impl ResponseDecoder for DataStoreDecoder {
    fn module(&self) -> &'static str {
        MODULE
    }

    fn decode(&self, method: &str, response: &Value) -> Option<Payload> {
        let payload = match method {
            "set" => Payload::Empty,
            "get" => Payload::Text(response.str_or("data", "").to_owned()),
            "getMyData" => Payload::Mapping(nested_mapping(response, "myData")),
            "getUsersData" => Payload::KeyedMapping {
                key: response.str_or("key", "").to_owned(),
                entries: users_data(response),
            },
            _ => return None,
        };
        Some(payload)
    }
}

fn nested_mapping(response: &Value, key: &str) -> BTreeMap<String, String> {
    response.get_field(key).map(to_mapping).unwrap_or_default()
}

/// Per-player values keyed by player id. Keys that are not integers are skipped.
fn users_data(response: &Value) -> BTreeMap<i64, String> {
    nested_mapping(response, "usersData")
        .into_iter()
        .filter_map(|(player, value)| player.trim().parse::<i64>().ok().map(|id| (id, value)))
        .collect()
}

/// DataStore call site.
pub struct DataStore<'a> {
    bridge: &'a Bridge,
}

impl<'a> DataStore<'a> {
    pub fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    /// Store one value under `key`.
    pub fn set(&self, key: &str, value: &str, on_set: impl FnOnce(ResultEnvelope) + Send + 'static) {
        let envelope = self
            .bridge
            .envelope(MODULE, "set", Some(Callback::result(on_set)))
            .field("key", key)
            .field("value", value);
        self.bridge.submit(envelope);
    }

    /// Store several values at once. The map travels as JSON text in `data`.
    pub fn set_all(
        &self,
        data: &BTreeMap<String, String>,
        on_set: impl FnOnce(ResultEnvelope) + Send + 'static,
    ) {
        let encoded: Object = data.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let envelope = self
            .bridge
            .envelope(MODULE, "set", Some(Callback::result(on_set)))
            .field("data", Value::Object(encoded).to_text());
        self.bridge.submit(envelope);
    }

    pub fn get(&self, key: &str, on_get: impl FnOnce(ResultEnvelope, String) + Send + 'static) {
        let envelope = self
            .bridge
            .envelope(MODULE, "get", Some(Callback::text(on_get)))
            .field("key", key);
        self.bridge.submit(envelope);
    }

    /// Awaitable form of [`get`](Self::get).
    pub fn fetch(&self, key: &str) -> Reply {
        let (callback, reply) = Callback::oneshot();
        let envelope = self.bridge.envelope(MODULE, "get", Some(callback)).field("key", key);
        self.bridge.submit(envelope);
        reply
    }

    /// All values stored for the signed-in player.
    pub fn get_my_data(
        &self,
        on_my_data: impl FnOnce(ResultEnvelope, BTreeMap<String, String>) + Send + 'static,
    ) {
        self.bridge.call(MODULE, "getMyData", Some(Callback::mapping(on_my_data)));
    }

    /// The value stored under `key` for every player, keyed by player id.
    pub fn get_users_data(
        &self,
        key: &str,
        on_users_data: impl FnOnce(ResultEnvelope, String, BTreeMap<i64, String>) + Send + 'static,
    ) {
        let envelope = self
            .bridge
            .envelope(MODULE, "getUsersData", Some(Callback::keyed_mapping(on_users_data)))
            .field("key", key);
        self.bridge.submit(envelope);
    }
}
