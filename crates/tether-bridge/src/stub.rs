// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub gateway for desktop/CI builds where no native layer is linked.
//
// Every call is unsupported. A call that expects an answer gets one: a
// NOT_SUPPORTED response is routed back through the sink before `invoke`
// returns, exactly as a synchronous native layer would.

use std::sync::Arc;

use tether_core::error::Result;
use tether_core::result::{Code, ErrorCode, ResultEnvelope};
use tether_core::types::Handle;
use tether_core::value::{Object, Value};

use crate::traits::{NativeGateway, ResponseSink};

/// Gateway used when no native platform is available.
pub struct StubGateway {
    sink: Arc<dyn ResponseSink>,
}

impl StubGateway {
    pub fn new(sink: Arc<dyn ResponseSink>) -> Self {
        Self { sink }
    }
}

/// The response a native layer would send for an unsupported call.
pub fn unsupported_response(request: &Value, handle: Handle) -> Value {
    let module = request.str_or("module", "");
    let method = request.str_or("method", "");
    let result = ResultEnvelope::failure(
        ErrorCode::NotSupported,
        Code::CommonLibraryMissing,
        format!("{module}.{method} is not supported on this platform"),
    );

    let mut response = Object::new();
    response.insert("module", module);
    response.insert("method", method);
    response.insert("handler", handle.to_wire());
    response.insert("resultAPI", result.to_value());
    Value::Object(response)
}

impl NativeGateway for StubGateway {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn invoke(&self, request: &Value) -> Result<Value> {
        tracing::warn!(
            module = request.str_or("module", ""),
            method = request.str_or("method", ""),
            "native call on stub gateway"
        );
        if let Some(handle) = Handle::from_wire(request.get_field("handler")) {
            self.sink.deliver(unsupported_response(request, handle));
        }
        Ok(Value::Object(Object::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Value>>);

    impl ResponseSink for Recorder {
        fn deliver(&self, response: Value) {
            self.0.lock().expect("lock").push(response);
        }
    }

    #[test]
    fn answers_calls_with_a_handler() {
        let recorder = Arc::new(Recorder::default());
        let gateway = StubGateway::new(recorder.clone());
        let request = Value::parse(r#"{"module":"DataStore","method":"get","handler":4}"#).expect("parse");

        let inline = gateway.invoke(&request).expect("invoke");
        assert_eq!(inline, Value::Object(Object::new()));

        let delivered = recorder.0.lock().expect("lock");
        assert_eq!(delivered.len(), 1);
        let response = &delivered[0];
        assert_eq!(response.i64_or("handler", -1), 4);
        assert_eq!(response.str_or("method", ""), "get");
        let result = ResultEnvelope::from_response(response);
        assert_eq!(result.error_code, ErrorCode::NotSupported);
        assert!(!result.is_success());
    }

    #[test]
    fn fire_and_forget_gets_no_response() {
        let recorder = Arc::new(Recorder::default());
        let gateway = StubGateway::new(recorder.clone());
        let request = Value::parse(r#"{"module":"Analytics","method":"sendEvent"}"#).expect("parse");
        gateway.invoke(&request).expect("invoke");
        assert!(recorder.0.lock().expect("lock").is_empty());
    }
}
