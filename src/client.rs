// src/client.rs
use crate::freshness::Marker;
use std::time::Duration;

/// Path the poller script is served from.
pub const SCRIPT_PATH: &str = "/livereload.js";

/// Path the poller queries for the current marker.
pub const STATUS_PATH: &str = "/status";

/// Tag injected into every served HTML page.
pub const SCRIPT_TAG: &str = r#"<script src="/livereload.js"></script>"#;

/// How often the browser polls [`STATUS_PATH`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Browser-side poller. Polls once on load, then every [`POLL_INTERVAL`].
pub const POLLER_SCRIPT: &str = include_str!("../static/livereload.js");

/// The reload decision the poller script makes, expressed in Rust.
///
/// Holds the last marker the client has seen. The first observation only
/// establishes a baseline, so a freshly loaded page never reloads itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollState {
    last_known: Marker,
}

impl PollState {
    pub fn new() -> Self {
        Self {
            last_known: Marker::UNSET,
        }
    }

    pub fn last_known(&self) -> Marker {
        self.last_known
    }

    /// Records a successful status response. Returns `true` if the page should reload.
    pub fn observe(&mut self, received: Marker) -> bool {
        let reload = !self.last_known.is_unset() && received > self.last_known;
        self.last_known = received;
        reload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reloads_once_when_marker_advances() {
        let mut state = PollState::new();
        let reloads: Vec<bool> = [100.0, 100.0, 150.0]
            .into_iter()
            .map(|m| state.observe(Marker(m)))
            .collect();
        assert_eq!(reloads, vec![false, false, true]);
    }

    #[test]
    fn first_observation_never_reloads() {
        let mut state = PollState::new();
        assert!(!state.observe(Marker(1_700_000_000.0)));
        assert_eq!(state.last_known(), Marker(1_700_000_000.0));
    }

    #[test]
    fn regressed_marker_is_adopted_without_reload() {
        let mut state = PollState::new();
        state.observe(Marker(200.0));
        assert!(!state.observe(Marker(150.0)));
        assert!(state.observe(Marker(160.0)));
    }

    #[test]
    fn zero_marker_resets_to_baseline() {
        let mut state = PollState::new();
        state.observe(Marker(100.0));
        // Watch set emptied: the next non-zero marker is a new baseline.
        assert!(!state.observe(Marker::UNSET));
        assert!(!state.observe(Marker(300.0)));
    }

    #[test]
    fn equal_markers_never_reload() {
        let mut state = PollState::new();
        state.observe(Marker(100.0));
        assert!(!state.observe(Marker(100.0)));
        assert!(!state.observe(Marker(100.0)));
        assert!(state.observe(Marker(101.0)));
    }

    #[test]
    fn script_matches_the_decision_rule() {
        assert!(POLLER_SCRIPT.contains("fetch('/status'"));
        assert!(POLLER_SCRIPT.contains("lastModified !== 0 && data.lastModified > lastModified"));
        assert!(POLLER_SCRIPT.contains("location.reload()"));
        assert!(POLLER_SCRIPT.contains("!response.ok"));
        assert!(POLLER_SCRIPT.contains(&format!(
            "setInterval(checkForChanges, {})",
            POLL_INTERVAL.as_millis()
        )));
        // Immediate poll after scheduling the interval.
        let interval_at = POLLER_SCRIPT.find("setInterval(").unwrap();
        assert!(POLLER_SCRIPT[interval_at..].contains("checkForChanges();"));
    }

    #[test]
    fn script_tag_points_at_script_path() {
        assert!(SCRIPT_TAG.contains(SCRIPT_PATH));
    }
}
