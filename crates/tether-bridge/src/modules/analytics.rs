// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analytics: event logging and trackers.
//
// Every Analytics call is either fire-and-forget or answered inline by the
// gateway; none expects an asynchronous response.

use tether_core::value::{Object, Value};

use crate::Bridge;
use crate::payload::Payload;
use crate::traits::ResponseDecoder;

pub const MODULE: &str = "Analytics";

/// Recognises no methods: any Analytics response is a no-op.
pub struct AnalyticsDecoder;

impl ResponseDecoder for AnalyticsDecoder {
    fn module(&self) -> &'static str {
        MODULE
    }

    fn decode(&self, _method: &str, _response: &Value) -> Option<Payload> {
        None
    }
}

/// Ad revenue measurement event.
#[derive(Debug, Clone, PartialEq)]
pub struct AdRevenue {
    pub revenue: f64,
    pub ad_platform: String,
    pub ad_unit_id: String,
    pub ad_type: String,
    pub ad_placement: String,
    pub currency: String,
}

impl AdRevenue {
    fn to_value(&self) -> Value {
        let mut object = Object::new();
        object.insert("revenue", self.revenue);
        object.insert("adPlatform", self.ad_platform.as_str());
        object.insert("adUnitId", self.ad_unit_id.as_str());
        object.insert("adType", self.ad_type.as_str());
        object.insert("adPlacement", self.ad_placement.as_str());
        object.insert("currency", self.currency.as_str());
        Value::Object(object)
    }
}

/// Analytics call site.
pub struct Analytics<'a> {
    bridge: &'a Bridge,
}

impl<'a> Analytics<'a> {
    pub fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    /// Queue a custom log. Returns whether the native layer accepted it.
    pub fn send_analytics_log(&self, log_data: Object) -> bool {
        let envelope = self
            .bridge
            .envelope(MODULE, "sendAnalyticsLog", None)
            .field("logData", log_data);
        self.bridge.submit(envelope).bool_or("sendAnalyticsLog", false)
    }

    /// Number of logs still waiting to be sent.
    pub fn get_remain_analytics_log_count(&self) -> u32 {
        let inline = self.bridge.call(MODULE, "getRemainAnalyticsLogCount", None);
        let count = inline.i64_or("getRemainAnalyticsLogCount", 0);
        u32::try_from(count.max(0)).unwrap_or(u32::MAX)
    }

    pub fn set_enable_tracker(&self, tracking_type: &str, enable: bool) {
        let envelope = self
            .bridge
            .envelope(MODULE, "setEnableTracker", None)
            .field("trackingType", tracking_type)
            .field("isEnable", enable);
        self.bridge.submit(envelope);
    }

    pub fn send_event(&self, event_name: &str) {
        let envelope = self
            .bridge
            .envelope(MODULE, "sendEvent", None)
            .field("eventName", event_name);
        self.bridge.submit(envelope);
    }

    pub fn send_tutorial_complete(&self) {
        self.bridge.call(MODULE, "sendTutorialComplete", None);
    }

    pub fn send_ad_revenue_event(&self, revenue: &AdRevenue) {
        let envelope = self
            .bridge
            .envelope(MODULE, "sendAdRevenueEvent", None)
            .field("analyticsAdRevenue", revenue.to_value());
        self.bridge.submit(envelope);
    }

    pub fn send_user_entry_funnels_logs(&self, funnel_track: &str, option_tag: &str) {
        let envelope = self
            .bridge
            .envelope(MODULE, "sendUserEntryFunnelsLogs", None)
            .field("funnelTrack", funnel_track)
            .field("optionTag", option_tag);
        self.bridge.submit(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedGateway, scripted_bridge};

    #[test]
    fn inline_results_are_read() {
        let inline = Value::parse(r#"{"sendAnalyticsLog":true,"getRemainAnalyticsLogCount":12}"#).expect("parse");
        let (bridge, gateway) = scripted_bridge(ScriptedGateway::inline(inline));
        let analytics = bridge.analytics();

        let mut log = Object::new();
        log.insert("stage", 4);
        assert!(analytics.send_analytics_log(log));
        assert_eq!(analytics.get_remain_analytics_log_count(), 12);

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.get_field("handler").is_none()));
        assert_eq!(requests[0].get_field("logData").map(|d| d.i64_or("stage", 0)), Some(4));
    }

    #[test]
    fn unavailable_gateway_yields_defaults() {
        let (bridge, _) = scripted_bridge(ScriptedGateway::unavailable());
        assert!(!bridge.analytics().send_analytics_log(Object::new()));
        assert_eq!(bridge.analytics().get_remain_analytics_log_count(), 0);
    }

    #[test]
    fn negative_count_is_zero() {
        let inline = Value::parse(r#"{"getRemainAnalyticsLogCount":-3}"#).expect("parse");
        let (bridge, _) = scripted_bridge(ScriptedGateway::inline(inline));
        assert_eq!(bridge.analytics().get_remain_analytics_log_count(), 0);
    }

    #[test]
    fn responses_are_never_decoded() {
        let response = Value::parse(r#"{"method":"sendEvent"}"#).expect("parse");
        assert_eq!(AnalyticsDecoder.decode("sendEvent", &response), None);
    }

    #[test]
    fn ad_revenue_is_nested() {
        let (bridge, gateway) = scripted_bridge(ScriptedGateway::silent());
        bridge.analytics().send_ad_revenue_event(&AdRevenue {
            revenue: 0.25,
            ad_platform: "admob".into(),
            ad_unit_id: "unit".into(),
            ad_type: "banner".into(),
            ad_placement: "home".into(),
            currency: "USD".into(),
        });
        let request = gateway.last_request().expect("request sent");
        let revenue = request.get_field("analyticsAdRevenue").expect("nested");
        assert_eq!(revenue.get_field("revenue").and_then(Value::as_f64), Some(0.25));
        assert_eq!(revenue.str_or("currency", ""), "USD");
    }
}
