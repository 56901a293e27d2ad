use std::path::PathBuf;

use serde::Serialize;

use crate::apps::app_script::AppMetadata;
use crate::navigation::{
    context::{ActionRecord, RunContext},
    engine::NavigationOutcome,
    error::NavigationError,
};
use crate::screen::screen_model::ScreenId;

// ============================================================================
// Run report: summary of one navigation run
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Reached,
    Cancelled,
    Failed,
}

/// What happened in one navigation run.
///
/// Built from the run context after `Navigator::run` returns; consumed by
/// the console reporter.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub app_title: String,
    pub package_name: String,
    pub version: String,

    pub status: RunStatus,

    /// Target screen reached, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reached: Option<ScreenId>,

    /// Last verified screen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_screen: Option<ScreenId>,

    /// Error message when the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Diagnostic export written for the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<PathBuf>,

    pub probes: u64,
    pub history: Vec<ActionRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

impl RunReport {
    pub fn from_run(
        app: &AppMetadata,
        ctx: &RunContext<'_>,
        result: &Result<NavigationOutcome, NavigationError>,
    ) -> Self {
        let (status, reached, error, export) = match result {
            Ok(NavigationOutcome::Reached(id)) => (RunStatus::Reached, Some(*id), None, None),
            Ok(NavigationOutcome::Cancelled) => (RunStatus::Cancelled, None, None, None),
            Err(e) => (
                RunStatus::Failed,
                None,
                Some(e.to_string()),
                e.export_path().cloned(),
            ),
        };

        Self {
            app_title: app.title.clone(),
            package_name: app.package_name.clone(),
            version: app.version.clone(),
            status,
            reached,
            last_screen: ctx.current,
            error,
            export,
            probes: ctx.probes,
            history: ctx.history.clone(),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Reached
    }
}
