use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::screen::screen_model::ScreenId;

/// One line of the JSONL navigation trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    /// probe | matched | retry | act | reached | failed | cancelled
    pub event: String,

    pub screen: Option<ScreenId>,
    pub expected: Vec<ScreenId>,

    pub action_list: Option<String>,
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, event: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            step,
            event: event.to_string(),
            screen: None,
            expected: vec![],
            action_list: None,
            detail: None,
        }
    }

    pub fn with_screen(mut self, screen: ScreenId) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn with_expected(mut self, expected: &[ScreenId]) -> Self {
        self.expected = expected.to_vec();
        self
    }

    pub fn with_action_list(mut self, name: &str) -> Self {
        self.action_list = Some(name.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
