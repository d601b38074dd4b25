// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated native layer.
//
// DataStore calls are answered asynchronously from tokio tasks after a short
// delay, the way a platform SDK answers from its own threads. Analytics calls
// are answered inline. Everything else is unsupported.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle as Runtime;
use tracing::{debug, instrument};

use tether_bridge::stub::unsupported_response;
use tether_bridge::{NativeGateway, ResponseSink};
use tether_core::error::Result;
use tether_core::result::ResultEnvelope;
use tether_core::types::Handle;
use tether_core::value::{Object, Value, to_mapping};

/// Id the simulated signed-in player stores under.
pub const LOCAL_PLAYER: i64 = 1001;

/// Per-player key/value tables.
type Tables = BTreeMap<i64, BTreeMap<String, String>>;

/// In-process stand-in for a platform plugin.
pub struct SimNative {
    sink: Arc<dyn ResponseSink>,
    runtime: Runtime,
    latency: Duration,
    tables: Arc<Mutex<Tables>>,
    pending_logs: Mutex<u32>,
}

impl SimNative {
    /// Must be called from inside a tokio runtime.
    pub fn new(sink: Arc<dyn ResponseSink>, latency: Duration) -> Self {
        let mut tables = Tables::new();
        for (player, score) in [(1002, "70"), (1003, "90")] {
            tables.entry(player).or_default().insert("score".into(), score.into());
        }
        Self {
            sink,
            runtime: Runtime::current(),
            latency,
            tables: Arc::new(Mutex::new(tables)),
            pending_logs: Mutex::new(0),
        }
    }

    fn answer_later(&self, response: Value) {
        let sink = Arc::clone(&self.sink);
        let latency = self.latency;
        self.runtime.spawn(async move {
            tokio::time::sleep(latency).await;
            sink.deliver(response);
        });
    }

    fn data_store(&self, method: &str, request: &Value) -> Option<Object> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut answer = Object::new();
        match method {
            "set" => {
                let mine = tables.entry(LOCAL_PLAYER).or_default();
                if let Some(key) = request.get_field("key").and_then(Value::as_str) {
                    mine.insert(key.to_owned(), request.str_or("value", "").to_owned());
                }
                // Bulk form: `data` holds an encoded object.
                if let Some(data) = request.get_field("data") {
                    mine.extend(to_mapping(data));
                }
            }
            "get" => {
                let key = request.str_or("key", "");
                let data = tables
                    .get(&LOCAL_PLAYER)
                    .and_then(|mine| mine.get(key))
                    .cloned()
                    .unwrap_or_default();
                answer.insert("data", data);
            }
            "getMyData" => {
                let mine: Object = tables
                    .get(&LOCAL_PLAYER)
                    .into_iter()
                    .flatten()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                answer.insert("myData", Value::Object(mine).to_text());
            }
            "getUsersData" => {
                let key = request.str_or("key", "");
                let users: Object = tables
                    .iter()
                    .filter_map(|(player, data)| data.get(key).map(|v| (player.to_string(), v.as_str())))
                    .collect();
                answer.insert("key", key);
                answer.insert("usersData", Value::Object(users).to_text());
            }
            _ => return None,
        }
        Some(answer)
    }

    fn analytics(&self, method: &str) -> Value {
        let mut pending = self.pending_logs.lock().unwrap_or_else(PoisonError::into_inner);
        let mut inline = Object::new();
        match method {
            "sendAnalyticsLog" => {
                *pending += 1;
                inline.insert("sendAnalyticsLog", true);
            }
            "getRemainAnalyticsLogCount" => {
                inline.insert("getRemainAnalyticsLogCount", *pending);
            }
            _ => {}
        }
        Value::Object(inline)
    }
}

fn success_response(request: &Value, handle: Handle, mut fields: Object, latency: Duration) -> Value {
    let result = ResultEnvelope {
        latency_ms: i64::try_from(latency.as_millis()).unwrap_or(i64::MAX),
        ..ResultEnvelope::default()
    };
    fields.insert("module", request.str_or("module", ""));
    fields.insert("method", request.str_or("method", ""));
    fields.insert("handler", handle.to_wire());
    fields.insert("resultAPI", result.to_value());
    Value::Object(fields)
}

impl NativeGateway for SimNative {
    fn platform_name(&self) -> &str {
        "Simulator"
    }

    #[instrument(skip_all, fields(module = request.str_or("module", ""), method = request.str_or("method", "")))]
    fn invoke(&self, request: &Value) -> Result<Value> {
        let module = request.str_or("module", "");
        let method = request.str_or("method", "");
        let handle = Handle::from_wire(request.get_field("handler"));

        if module == "Analytics" {
            return Ok(self.analytics(method));
        }

        let answer = match module {
            "DataStore" => self.data_store(method, request),
            _ => None,
        };
        match (answer, handle) {
            (Some(fields), Some(handle)) => {
                debug!(%handle, "answering asynchronously");
                self.answer_later(success_response(request, handle, fields, self.latency));
            }
            (None, Some(handle)) => {
                let response = unsupported_response(request, handle);
                debug!(%handle, result = %ResultEnvelope::from_response(&response), "unsupported");
                self.answer_later(response);
            }
            (_, None) => {}
        }
        Ok(Value::Object(Object::new()))
    }
}
