// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PlatformHelper: OS share sheet, runtime permissions and in-app updates.

use tether_core::result::ResultEnvelope;
use tether_core::value::Value;

use crate::Bridge;
use crate::callback::Callback;
use crate::payload::{Payload, string_list};
use crate::traits::ResponseDecoder;

pub const MODULE: &str = "PlatformHelper";

/// Content kind presented by the share sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShareType {
    Text = 1,
    Media = 2,
}

/// What to hand to the OS share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformShare {
    pub share_type: ShareType,
    pub subject: String,
    pub text: String,
    /// Local file paths, for `ShareType::Media`.
    pub media: Vec<String>,
}

impl PlatformShare {
    pub fn text(subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            share_type: ShareType::Text,
            subject: subject.into(),
            text: text.into(),
            media: Vec::new(),
        }
    }

    pub fn media(subject: impl Into<String>, media: Vec<String>) -> Self {
        Self {
            share_type: ShareType::Media,
            subject: subject.into(),
            text: String::new(),
            media,
        }
    }
}

pub struct PlatformHelperDecoder;

impl ResponseDecoder for PlatformHelperDecoder {
    fn module(&self) -> &'static str {
        MODULE
    }

    fn decode(&self, method: &str, response: &Value) -> Option<Payload> {
        match method {
            "share" | "shareText" | "shareMedia" => Some(Payload::Empty),
            "requestUserPermissions" => Some(Payload::Permissions {
                granted: string_list(response, "granted"),
                denied: string_list(response, "denied"),
            }),
            _ => None,
        }
    }
}

/// PlatformHelper call site.
pub struct PlatformHelper<'a> {
    bridge: &'a Bridge,
}

impl<'a> PlatformHelper<'a> {
    pub fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    pub fn share(&self, share: &PlatformShare, on_share: impl FnOnce(ResultEnvelope) + Send + 'static) {
        let media: Vec<Value> = share.media.iter().map(Value::from).collect();
        let envelope = self
            .bridge
            .envelope(MODULE, "share", Some(Callback::result(on_share)))
            .field("shareType", share.share_type as i32)
            .field("shareSubject", share.subject.as_str())
            .field("shareText", share.text.as_str())
            .field("shareMedia", media);
        self.bridge.submit(envelope);
    }

    /// Ask the OS again for permissions the user previously declined.
    pub fn request_user_permissions(
        &self,
        requests: &[&str],
        on_result: impl FnOnce(ResultEnvelope, Vec<String>, Vec<String>) + Send + 'static,
    ) {
        let requests: Vec<Value> = requests.iter().copied().map(Value::from).collect();
        let envelope = self
            .bridge
            .envelope(MODULE, "requestUserPermissions", Some(Callback::permissions(on_result)))
            .field("requests", requests);
        self.bridge.submit(envelope);
    }

    /// Finish a downloaded in-app update. `complete_state`: 1 immediate,
    /// 2 on restart, 3 later.
    pub fn complete_update(&self, complete_state: i32) {
        let envelope = self
            .bridge
            .envelope(MODULE, "completeUpdate", None)
            .field("completeState", complete_state);
        self.bridge.submit(envelope);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testing::{ScriptedGateway, scripted_bridge};

    #[test]
    fn permissions_round_trip() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::answering(|request| {
            Value::parse(&format!(
                r#"{{"module":"PlatformHelper","method":"requestUserPermissions","handler":{},"resultAPI":{{"errorCode":0,"code":0}},"granted":["camera"],"denied":["contacts","location"]}}"#,
                request.i64_or("handler", -1)
            ))
            .ok()
        }));

        let seen = Arc::new(Mutex::new(None));
        let out = Arc::clone(&seen);
        bridge
            .platform_helper()
            .request_user_permissions(&["camera", "contacts", "location"], move |r, granted, denied| {
                *out.lock().expect("lock") = Some((r.is_success(), granted, denied));
            });

        let (ok, granted, denied) = seen.lock().expect("lock").take().expect("delivered");
        assert!(ok);
        assert_eq!(granted, vec!["camera".to_string()]);
        assert_eq!(denied.len(), 2);
    }

    #[test]
    fn share_sends_media_array() {
        let (bridge, gateway) = scripted_bridge(ScriptedGateway::silent());
        let share = PlatformShare::media("screens", vec!["/tmp/a.png".into(), "/tmp/b.png".into()]);
        bridge.platform_helper().share(&share, |_| {});

        let request = gateway.last_request().expect("request sent");
        assert_eq!(request.i64_or("shareType", 0), 2);
        assert_eq!(request.get_field("shareMedia").and_then(Value::as_array).map(<[Value]>::len), Some(2));
    }

    #[test]
    fn complete_update_is_fire_and_forget() {
        let (bridge, gateway) = scripted_bridge(ScriptedGateway::silent());
        bridge.platform_helper().complete_update(2);
        let request = gateway.last_request().expect("request sent");
        assert!(request.get_field("handler").is_none());
        assert_eq!(request.i64_or("completeState", 0), 2);
        assert!(bridge.registry().is_empty());
    }

    #[test]
    fn share_variants_are_result_only() {
        let response = Value::parse("{}").expect("parse");
        for method in ["share", "shareText", "shareMedia"] {
            assert_eq!(PlatformHelperDecoder.decode(method, &response), Some(Payload::Empty));
        }
        assert_eq!(PlatformHelperDecoder.decode("completeUpdate", &response), None);
    }
}
