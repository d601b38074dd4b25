// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android gateway via JNI.
//
// Requires the Android NDK. The Java side is a plugin class with:
//
// - `static String callNative(String request)`: runs a JSON request and
//   returns the inline JSON answer (or null).
// - `static void setEngineContext(long ctx)`: stores the opaque engine
//   context. The plugin passes it back with every asynchronous response
//   through the native method `callEngine(long ctx, String response)`,
//   implemented here as `Java_com_tether_bridge_TetherPlugin_callEngine`.
//
// The context is an `EngineContext` id, never a pointer. A `callEngine` that
// races with teardown finds the id released and drops the response.

#![cfg(target_os = "android")]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use jni::objects::{JClass, JObject, JString, JValue};
use jni::sys::jlong;
use jni::{JNIEnv, JavaVM};
use tracing::{error, instrument, warn};

use tether_core::error::{Result, TetherError};
use tether_core::value::{Object, Value};

use crate::context::{EngineContext, deliver_to};
use crate::traits::{NativeGateway, ResponseSink};

/// JNI name of the Java plugin class.
pub const PLUGIN_CLASS: &str = "com/tether/bridge/TetherPlugin";

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Convenience: map any `jni::errors::Error` into `TetherError::BridgeUnavailable`.
fn jni_err(context: &str, e: jni::errors::Error) -> TetherError {
    TetherError::BridgeUnavailable(format!("{context}: {e}"))
}

/// Obtain the process `JavaVM` from the global Android context.
fn java_vm() -> Result<JavaVM> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code,
    // valid for the lifetime of the process.
    unsafe { JavaVM::from_raw(ctx.vm().cast()) }.map_err(|e| jni_err("failed to obtain JavaVM", e))
}

fn set_engine_context(env: &mut JNIEnv, ctx: jlong) -> Result<()> {
    env.call_static_method(PLUGIN_CLASS, "setEngineContext", "(J)V", &[JValue::Long(ctx)])
        .map_err(|e| jni_err("TetherPlugin.setEngineContext", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Gateway that calls the Java plugin through JNI.
pub struct AndroidGateway {
    vm: JavaVM,
    context: EngineContext,
}

impl AndroidGateway {
    /// Attach to the JVM and hand the engine context to the plugin.
    pub fn new(sink: Arc<dyn ResponseSink>) -> Result<Self> {
        let vm = java_vm()?;
        let context = EngineContext::register(sink);
        {
            let mut env = vm
                .attach_current_thread()
                .map_err(|e| jni_err("failed to attach JNI thread", e))?;
            set_engine_context(&mut env, context.id() as jlong)?;
        }
        Ok(Self { vm, context })
    }
}

impl Drop for AndroidGateway {
    // The `context` field is released after this runs.
    fn drop(&mut self) {
        let cleared = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_err("failed to attach JNI thread", e))
            .and_then(|mut env| set_engine_context(&mut env, 0));
        if let Err(e) = cleared {
            warn!(id = self.context.id(), error = %e, "could not clear engine context");
        }
    }
}

impl NativeGateway for AndroidGateway {
    fn platform_name(&self) -> &str {
        "Android"
    }

    #[instrument(skip_all)]
    fn invoke(&self, request: &Value) -> Result<Value> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_err("failed to attach JNI thread", e))?;

        let j_request: JString = env
            .new_string(request.to_text())
            .map_err(|e| jni_err("new_string(request)", e))?;

        let answer: JObject = env
            .call_static_method(
                PLUGIN_CLASS,
                "callNative",
                "(Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&j_request)],
            )
            .map_err(|e| jni_err("TetherPlugin.callNative", e))?
            .l()
            .map_err(|e| jni_err("callNative->l", e))?;

        if answer.is_null() {
            return Ok(Value::Object(Object::new()));
        }

        let answer = JString::from(answer);
        let inline: String = env
            .get_string(&answer)
            .map_err(|e| jni_err("get_string(answer)", e))?
            .into();

        if inline.trim().is_empty() {
            return Ok(Value::Object(Object::new()));
        }
        Ok(Value::parse(&inline).unwrap_or_else(|e| {
            warn!(error = %e, "malformed inline answer from native layer");
            Value::Object(Object::new())
        }))
    }
}

// ---------------------------------------------------------------------------
// Native entry point
// ---------------------------------------------------------------------------

/// `TetherPlugin.callEngine(long ctx, String response)`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_tether_bridge_TetherPlugin_callEngine<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    ctx: jlong,
    response: JString<'local>,
) {
    if ctx <= 0 {
        warn!("native response delivered without an engine context");
        return;
    }
    // No unwind may cross back into the JVM.
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let text: String = match env.get_string(&response) {
            Ok(text) => text.into(),
            Err(e) => {
                warn!(error = %e, "unreadable native response");
                return;
            }
        };
        deliver_to(ctx as u64, &text);
    }));
    if outcome.is_err() {
        error!("panic while delivering native response");
    }
}
