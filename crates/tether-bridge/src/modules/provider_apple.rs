// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ProviderApple: Game Center leaderboards and achievements.

use tether_core::result::ResultEnvelope;
use tether_core::value::Value;

use crate::Bridge;
use crate::callback::Callback;
use crate::payload::{Achievement, Payload};
use crate::traits::ResponseDecoder;

pub const MODULE: &str = "ProviderApple";

/// Methods whose response carries nothing beyond the ResultAPI.
const RESULT_ONLY: [&str; 5] = [
    "reportScore",
    "showLeaderboard",
    "reportAchievement",
    "showAchievements",
    "resetAchievements",
];

pub struct ProviderAppleDecoder;

impl ResponseDecoder for ProviderAppleDecoder {
    fn module(&self) -> &'static str {
        MODULE
    }

    fn decode(&self, method: &str, response: &Value) -> Option<Payload> {
        if RESULT_ONLY.contains(&method) {
            return Some(Payload::Empty);
        }
        (method == "loadAchievements").then(|| Payload::Achievements(achievement_list(response)))
    }
}

/// Records in `achievementList`. Entries that are not objects are skipped.
fn achievement_list(response: &Value) -> Vec<Achievement> {
    response
        .get_field("achievementList")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Achievement::from_value).collect())
        .unwrap_or_default()
}

/// ProviderApple call site.
pub struct ProviderApple<'a> {
    bridge: &'a Bridge,
}

impl<'a> ProviderApple<'a> {
    pub fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    pub fn report_score(
        &self,
        score: &str,
        leaderboard_identifier: &str,
        on_report: impl FnOnce(ResultEnvelope) + Send + 'static,
    ) {
        let envelope = self
            .bridge
            .envelope(MODULE, "reportScore", Some(Callback::result(on_report)))
            .field("score", score)
            .field("leaderboardIdentifier", leaderboard_identifier);
        self.bridge.submit(envelope);
    }

    pub fn show_leaderboard(&self, on_show: impl FnOnce(ResultEnvelope) + Send + 'static) {
        self.bridge.call(MODULE, "showLeaderboard", Some(Callback::result(on_show)));
    }

    pub fn load_achievements(
        &self,
        on_load: impl FnOnce(ResultEnvelope, Vec<Achievement>) + Send + 'static,
    ) {
        self.bridge.call(MODULE, "loadAchievements", Some(Callback::achievements(on_load)));
    }

    pub fn report_achievement(
        &self,
        percent: &str,
        shows_completion_banner: bool,
        achievement_identifier: &str,
        on_report: impl FnOnce(ResultEnvelope) + Send + 'static,
    ) {
        let envelope = self
            .bridge
            .envelope(MODULE, "reportAchievement", Some(Callback::result(on_report)))
            .field("percent", percent)
            .field("showsCompletionBanner", shows_completion_banner)
            .field("achievementIdentifier", achievement_identifier);
        self.bridge.submit(envelope);
    }

    pub fn show_achievements(&self, on_show: impl FnOnce(ResultEnvelope) + Send + 'static) {
        self.bridge.call(MODULE, "showAchievements", Some(Callback::result(on_show)));
    }

    pub fn reset_achievements(&self, on_reset: impl FnOnce(ResultEnvelope) + Send + 'static) {
        self.bridge.call(MODULE, "resetAchievements", Some(Callback::result(on_reset)));
    }
}
