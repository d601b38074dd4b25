// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tether — request/response correlation between the engine and the native
// platform layer.
//
// Outgoing calls register their callback under a fresh handle before the
// request reaches the native gateway. Responses come back through the
// response sink, are routed to the feature module's dispatcher, and resolve
// their handle exactly once.

pub mod callback;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod main_queue;
pub mod modules;
pub mod payload;
pub mod registry;
pub mod stub;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};

use tether_core::config::BridgeConfig;
use tether_core::error::Result;
use tether_core::result::{Code, ErrorCode, ResultEnvelope};
use tether_core::value::{Object, Value};

pub use callback::{Callback, Reply};
pub use dispatch::{Delivery, Dispatcher, Listener, ListenerTable, Router};
pub use envelope::CallEnvelope;
pub use main_queue::MainQueue;
pub use payload::{Achievement, Payload};
pub use registry::{HandlerEntry, HandlerRegistry, RegistryStats};
pub use traits::{NativeGateway, ResponseDecoder, ResponseSink};

use modules::{Analytics, DataStore, PlatformHelper, ProviderApple};

/// Selects the gateway for the target operating system.
///
/// `sink` is where the native layer's asynchronous responses must go.
pub fn platform_gateway(sink: Arc<dyn ResponseSink>) -> Box<dyn NativeGateway> {
    #[cfg(target_os = "ios")]
    {
        // iOS: C ABI exported by the native plugin.
        Box::new(ios::IosGateway::new(sink))
    }
    #[cfg(target_os = "android")]
    {
        // Android: JNI static methods on the plugin class.
        match android::AndroidGateway::new(Arc::clone(&sink)) {
            Ok(gateway) => Box::new(gateway) as Box<dyn NativeGateway>,
            Err(e) => {
                warn!(error = %e, "Android gateway unavailable, falling back to stub");
                Box::new(stub::StubGateway::new(sink))
            }
        }
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        // DESKTOP/CI: every call is answered as unsupported.
        Box::new(stub::StubGateway::new(sink))
    }
}

/// Entry point for native responses: routes them at once, or queues them for
/// [`Bridge::pump`] when responses must be handled on the host's main thread.
struct BridgeSink {
    router: Arc<Router>,
    queue: Option<Arc<MainQueue>>,
}

impl ResponseSink for BridgeSink {
    fn deliver(&self, response: Value) {
        match &self.queue {
            Some(queue) => queue.push(response),
            None => {
                self.router.route(&response);
            }
        }
    }
}

/// A bridge instance: registry, router and gateway with one shared lifetime.
pub struct Bridge {
    config: BridgeConfig,
    registry: Arc<HandlerRegistry>,
    listeners: Arc<ListenerTable>,
    router: Arc<Router>,
    queue: Arc<MainQueue>,
    sink: Arc<dyn ResponseSink>,
    gateway: Box<dyn NativeGateway>,
}

impl Bridge {
    /// Bridge over the platform's native gateway.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_gateway(config, platform_gateway)
    }

    /// Bridge over a caller-supplied gateway. `make_gateway` receives the
    /// sink the gateway must deliver asynchronous responses to.
    pub fn with_gateway<F>(config: BridgeConfig, make_gateway: F) -> Self
    where
        F: FnOnce(Arc<dyn ResponseSink>) -> Box<dyn NativeGateway>,
    {
        let registry = Arc::new(HandlerRegistry::new(config.first_handle));
        let listeners = Arc::new(ListenerTable::default());

        let mut router = Router::new();
        for decoder in modules::decoders() {
            router.add(
                Dispatcher::new(decoder, Arc::clone(&registry), Arc::clone(&listeners))
                    .warn_on_stray(config.warn_on_stray_responses),
            );
        }
        let router = Arc::new(router);
        let queue = Arc::new(MainQueue::new());

        let sink: Arc<dyn ResponseSink> = Arc::new(BridgeSink {
            router: Arc::clone(&router),
            queue: config.queue_native_responses.then(|| Arc::clone(&queue)),
        });
        let gateway = make_gateway(Arc::clone(&sink));

        info!(
            platform = gateway.platform_name(),
            modules = ?router.modules().collect::<Vec<_>>(),
            queued = config.queue_native_responses,
            "bridge started"
        );

        Self {
            config,
            registry,
            listeners,
            router,
            queue,
            sink,
            gateway,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn platform_name(&self) -> &str {
        self.gateway.platform_name()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// Where native layers deliver asynchronous responses.
    pub fn sink(&self) -> Arc<dyn ResponseSink> {
        Arc::clone(&self.sink)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    // -- Calls --

    /// Build a call envelope, registering `callback` first if one is given.
    pub fn envelope(&self, module: &str, method: &str, callback: Option<Callback>) -> CallEnvelope {
        envelope::build(&self.registry, module, method, callback)
    }

    /// Hand an envelope to the native gateway and return its inline answer.
    ///
    /// On failure the call's handler stays pending; see [`submit`](Self::submit).
    #[instrument(skip(self, envelope), fields(module = envelope.module(), method = envelope.method()))]
    pub fn invoke(&self, envelope: &CallEnvelope) -> Result<Value> {
        self.gateway.invoke(&envelope.to_value(&self.config))
    }

    /// Invoke, turning gateway failure into a NOT_SUPPORTED result delivered
    /// through the call's own callback. Returns the inline answer, or an
    /// empty object on failure.
    pub fn submit(&self, envelope: CallEnvelope) -> Value {
        match self.invoke(&envelope) {
            Ok(inline) => inline,
            Err(e) => {
                warn!(module = envelope.module(), method = envelope.method(), error = %e, "native call failed");
                if let Some(entry) = envelope.handle().and_then(|h| self.registry.pop(h)) {
                    let result = ResultEnvelope::failure(ErrorCode::NotSupported, Code::CommonUnknown, e.to_string());
                    entry.callback.deliver(result, Payload::Empty);
                }
                Value::Object(Object::new())
            }
        }
    }

    /// Submit an argument-less call.
    pub fn call(&self, module: &str, method: &str, callback: Option<Callback>) -> Value {
        self.submit(self.envelope(module, method, callback))
    }

    /// Submit a call and get an awaitable reply carrying the decoded payload.
    pub fn request(&self, module: &str, method: &str, fields: Object) -> Reply {
        let (callback, reply) = Callback::oneshot();
        let mut envelope = self.envelope(module, method, Some(callback));
        for (key, value) in fields {
            envelope.push_field(&key, value);
        }
        self.submit(envelope);
        reply
    }

    /// Set the persistent listener for handle-less `(module, method)` events.
    pub fn listen(
        &self,
        module: &str,
        method: &str,
        listener: impl Fn(ResultEnvelope, Payload) + Send + Sync + 'static,
    ) {
        self.listeners.set(module, method, Arc::new(listener));
    }

    // -- Lifecycle --

    /// Fail every call pending for longer than `max_age` with TIMEOUT.
    ///
    /// The bridge never expires calls on its own.
    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        let expired = self.registry.take_registered_before(Utc::now() - max_age);
        let count = expired.len();
        for entry in expired {
            warn!(handle = %entry.handle, module = %entry.module, method = %entry.method, "native call timed out");
            let result = ResultEnvelope::failure(
                ErrorCode::Timeout,
                Code::CommonUnknown,
                format!("no response within {}s", max_age.num_seconds()),
            );
            entry.callback.deliver(result, Payload::Empty);
        }
        count
    }

    /// Dispatch queued native responses on the calling thread, in arrival
    /// order. Returns how many were dispatched.
    pub fn pump(&self) -> usize {
        let batch = self.queue.drain();
        for response in &batch {
            self.router.route(response);
        }
        batch.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Teardown: drop queued responses, listeners and pending handlers
    /// without invoking any of them. Returns the number of handlers dropped.
    pub fn shutdown(&self) -> usize {
        let queued = self.queue.clear();
        let listeners = self.listeners.clear();
        let pending = self.registry.invalidate_all();
        info!(pending, queued, listeners, "bridge shut down");
        pending
    }

    // -- Feature modules --

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(self)
    }

    pub fn data_store(&self) -> DataStore<'_> {
        DataStore::new(self)
    }

    pub fn platform_helper(&self) -> PlatformHelper<'_> {
        PlatformHelper::new(self)
    }

    pub fn provider_apple(&self) -> ProviderApple<'_> {
        ProviderApple::new(self)
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tether_core::error::TetherError;
    use tether_core::types::Handle;

    use super::*;
    use crate::registry::HandlerEntry;
    use crate::testing::{ScriptedGateway, scripted_bridge, scripted_bridge_with};

    fn register_text(bridge: &Bridge, handle: u64, seen: &Arc<Mutex<Vec<(bool, String)>>>) {
        let out = Arc::clone(seen);
        bridge
            .registry()
            .register(HandlerEntry {
                handle: Handle(handle),
                module: "DataStore".into(),
                method: "get".into(),
                callback: Callback::text(move |r, text| out.lock().expect("lock").push((r.is_success(), text))),
                registered_at: Utc::now(),
            })
            .expect("register");
    }

    const GET_7: &str = r#"{"module":"DataStore","method":"get","handler":7,"resultAPI":{"errorCode":0,"code":0},"data":"hello"}"#;

    #[test]
    fn response_reaches_registered_callback() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let seen = Arc::new(Mutex::new(Vec::new()));
        register_text(&bridge, 7, &seen);

        assert_eq!(bridge.router().route_text(GET_7), Delivery::Delivered);
        assert_eq!(*seen.lock().expect("lock"), vec![(true, "hello".to_string())]);
    }

    #[test]
    fn duplicate_response_is_delivered_once() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let seen = Arc::new(Mutex::new(Vec::new()));
        register_text(&bridge, 7, &seen);

        assert_eq!(bridge.router().route_text(GET_7), Delivery::Delivered);
        assert_eq!(bridge.router().route_text(GET_7), Delivery::Stray);
        assert_eq!(seen.lock().expect("lock").len(), 1);
        assert_eq!(bridge.stats().stray, 1);
    }

    #[test]
    fn undeclared_error_code_is_unknown_failure() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let (callback, mut reply) = Callback::oneshot();
        let h = bridge.registry().register_new("DataStore", "set", callback);

        bridge
            .sink()
            .deliver(Value::parse(&format!(r#"{{"module":"DataStore","method":"set","handler":{h},"resultAPI":{{"errorCode":999}}}}"#)).expect("parse"));

        let (result, _) = reply.try_take().expect("delivered");
        assert_eq!(result.error_code, ErrorCode::Unknown);
        assert!(!result.is_success());
    }

    #[test]
    fn malformed_users_data_still_invokes_callback() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge.data_store().get_users_data("score", move |r, key, entries| {
            *out.lock().expect("lock") = Some((r.is_success(), key, entries.len()));
        });

        let response = r#"{"module":"DataStore","method":"getUsersData","handler":0,"resultAPI":{"errorCode":0,"code":0},"key":"score","usersData":"{\"1\":"}"#;
        assert_eq!(bridge.router().route_text(response), Delivery::Delivered);
        assert_eq!(*seen.lock().expect("lock"), Some((true, "score".to_string(), 0)));
    }

    #[test]
    fn every_feature_module_is_routed() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let mut modules: Vec<_> = bridge.router().modules().collect();
        modules.sort_unstable();
        assert_eq!(modules, ["Analytics", "DataStore", "PlatformHelper", "ProviderApple"]);
        assert!(bridge.router().dispatcher("DataStore").is_some());
    }

    #[test]
    fn oversized_first_handle_still_resolves() {
        let config = BridgeConfig {
            first_handle: (1 << 53) + 1,
            ..BridgeConfig::default()
        };
        // Echo the request's own `handler` value back, as a native layer would.
        let (bridge, _) = scripted_bridge_with(
            config,
            ScriptedGateway::answering(|request| {
                let mut response = Object::new();
                response.insert("module", "DataStore");
                response.insert("method", "get");
                response.insert("handler", request.get_field("handler")?.clone());
                response.insert("data", "echoed");
                Some(Value::Object(response))
            }),
        );

        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge.data_store().get("k", move |_, text| *out.lock().expect("lock") = Some(text));

        assert_eq!(*seen.lock().expect("lock"), Some("echoed".to_string()));
        assert!(bridge.registry().is_empty());
        assert_eq!(bridge.stats().stray, 0);
    }

    #[test]
    fn unknown_method_without_handler_is_a_no_op() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        bridge.data_store().get("k", move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        for module in ["DataStore", "ProviderApple", "PlatformHelper", "Analytics"] {
            let response = format!(r#"{{"module":"{module}","method":"bogus","handler":-1}}"#);
            assert_eq!(bridge.router().route_text(&response), Delivery::UnknownMethod);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(bridge.registry().len(), 1);
    }

    #[test]
    fn synchronous_answer_finds_its_handler() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::answering(|request| {
            Value::parse(&format!(
                r#"{{"module":"DataStore","method":"get","handler":{},"resultAPI":{{"errorCode":0,"code":0}},"data":"now"}}"#,
                request.i64_or("handler", -1)
            ))
            .ok()
        }));

        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge.data_store().get("k", move |r, text| {
            *out.lock().expect("lock") = Some((r.is_success(), text));
        });

        assert_eq!(*seen.lock().expect("lock"), Some((true, "now".to_string())));
        assert!(bridge.registry().is_empty());
        assert_eq!(bridge.stats().stray, 0);
    }

    #[test]
    fn stub_gateway_answers_unsupported_through_callback() {
        let bridge = Bridge::with_gateway(BridgeConfig::default(), |sink| {
            Box::new(stub::StubGateway::new(sink)) as Box<dyn NativeGateway>
        });
        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge.data_store().get_my_data(move |r, map| {
            *out.lock().expect("lock") = Some((r.error_code, map.is_empty()));
        });
        assert_eq!(*seen.lock().expect("lock"), Some((ErrorCode::NotSupported, true)));
        assert_eq!(bridge.platform_name(), "Desktop (stub)");
    }

    #[test]
    fn callback_may_reenter_the_bridge() {
        let (bridge, gateway) = scripted_bridge(ScriptedGateway::unsupported());
        let bridge = Arc::new(bridge);
        let inner = Arc::clone(&bridge);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&seen);

        bridge.data_store().set("k", "v", move |first| {
            out.lock().expect("lock").push(first.error_code);
            let out = Arc::clone(&out);
            inner.data_store().get("k", move |second, _| out.lock().expect("lock").push(second.error_code));
        });

        assert_eq!(*seen.lock().expect("lock"), vec![ErrorCode::NotSupported, ErrorCode::NotSupported]);
        assert_eq!(gateway.requests().len(), 2);
        assert!(bridge.registry().is_empty());
    }

    #[test]
    fn invoke_failure_leaves_handler_pending() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::unavailable());
        let envelope = bridge.envelope("DataStore", "get", Some(Callback::text(|_, _| {})));
        let err = bridge.invoke(&envelope).expect_err("unavailable");
        assert!(matches!(err, TetherError::BridgeUnavailable(_)));
        assert!(bridge.registry().contains(envelope.handle().expect("handle")));
    }

    #[test]
    fn submit_failure_is_delivered_as_not_supported() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::unavailable());
        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge.data_store().set("k", "v", move |r| *out.lock().expect("lock") = Some(r.error_code));

        assert_eq!(*seen.lock().expect("lock"), Some(ErrorCode::NotSupported));
        assert!(bridge.registry().is_empty());
    }

    #[test]
    fn expiry_delivers_timeout() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge.provider_apple().show_leaderboard(move |r| *out.lock().expect("lock") = Some(r.error_code));

        assert_eq!(bridge.expire_older_than(Duration::hours(1)), 0);
        assert_eq!(bridge.expire_older_than(Duration::milliseconds(-1)), 1);
        assert_eq!(*seen.lock().expect("lock"), Some(ErrorCode::Timeout));
        assert_eq!(bridge.stats().expired, 1);
    }

    #[test]
    fn queued_responses_wait_for_pump() {
        let config = BridgeConfig {
            queue_native_responses: true,
            ..BridgeConfig::default()
        };
        let (bridge, _) = scripted_bridge_with(config, ScriptedGateway::unsupported());
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&fired);
            bridge.provider_apple().show_achievements(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(bridge.queued(), 3);
        assert_eq!(bridge.pump(), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert_eq!(bridge.pump(), 0);
    }

    #[test]
    fn listener_receives_handleless_events() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        bridge.listen("PlatformHelper", "requestUserPermissions", move |_, payload| {
            if let Payload::Permissions { granted, .. } = payload {
                count.fetch_add(granted.len(), Ordering::SeqCst);
            }
        });

        let event = r#"{"module":"PlatformHelper","method":"requestUserPermissions","handler":-1,"granted":["a","b"]}"#;
        assert_eq!(bridge.router().route_text(event), Delivery::Listener);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn awaited_request_resolves() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let mut fields = Object::new();
        fields.insert("key", "level");
        let reply = bridge.request("DataStore", "get", fields);

        let response = r#"{"module":"DataStore","method":"get","handler":0,"resultAPI":{"errorCode":0,"code":0},"data":"9"}"#;
        bridge.router().route_text(response);

        let (result, payload) = reply.wait().await.expect("reply");
        assert!(result.is_success());
        assert_eq!(payload, Payload::Text("9".into()));
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_requests() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::silent());
        let reply = bridge.data_store().fetch("level");
        bridge.listen("DataStore", "get", |_, _| {});

        assert_eq!(bridge.shutdown(), 1);
        assert!(matches!(reply.wait().await, Err(TetherError::Cancelled)));
        assert!(bridge.listeners().get("DataStore", "get").is_none());
        assert_eq!(bridge.stats().invalidated, 1);
    }
}
