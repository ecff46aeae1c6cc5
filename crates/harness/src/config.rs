//! Harness configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Configuration shared by every scenario in a run.
///
/// The three timeout ceilings form one family: waits on aliased network
/// responses, bounded retries in the action driver, and assertion polling.
/// All are overridable per run; waits can additionally be overridden per
/// step.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL the scenarios run against (recorded in the report; page
    /// drivers resolve relative paths against their own origin)
    pub base_url: String,

    /// Viewport for the page driver
    pub viewport: Viewport,

    /// Default ceiling for `wait_for` steps
    pub wait_timeout: Duration,

    /// Ceiling for the action driver's element retry window
    pub action_timeout: Duration,

    /// Ceiling for assertion polling
    pub assert_timeout: Duration,

    /// Tick between polls in waits, actions, and assertions
    pub poll_interval: Duration,

    /// Ask the page driver for a capture ref when a scenario fails
    pub screenshot_on_failure: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4200".to_string(),
            viewport: Viewport::default(),
            wait_timeout: Duration::from_millis(5000),
            action_timeout: Duration::from_millis(4000),
            assert_timeout: Duration::from_millis(4000),
            poll_interval: Duration::from_millis(50),
            screenshot_on_failure: true,
        }
    }
}
