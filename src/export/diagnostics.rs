use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{info, warn};

use crate::apps::app_script::AppMetadata;
use crate::device::snapshot::{DeviceSnapshot, now_ms};
use crate::navigation::context::ActionRecord;
use crate::screen::screen_model::ScreenId;

// ============================================================================
// Failure record
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Retries exhausted without the device showing an expected screen
    UnexpectedScreen,

    /// Too many transitions executed without reaching a target
    TransitionLimit,
}

impl FailureCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            FailureCategory::UnexpectedScreen => "unexpected_screen",
            FailureCategory::TransitionLimit => "transition_limit",
        }
    }
}

/// Everything needed to diagnose a failed run without re-running it.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord<'a> {
    pub category: FailureCategory,
    pub app: &'a AppMetadata,

    /// Last screen the device was verified on, if any
    pub last_screen: Option<ScreenId>,

    pub searched_for: Vec<ScreenId>,
    pub searched_names: Vec<String>,

    pub snapshot_digest: String,
    pub snapshot: &'a DeviceSnapshot,
    pub history: &'a [ActionRecord],
    pub exported_at_ms: u128,
}

impl FailureRecord<'_> {
    /// File stem key: the last verified screen, or "unknown".
    pub fn key(&self) -> String {
        match self.last_screen {
            Some(id) => format!("screen_{}", id),
            None => "screen_unknown".to_string(),
        }
    }
}

/// Destination for diagnostic exports.
///
/// Fire-and-forget: an export that cannot be written is logged and the
/// navigation error is still raised.
pub trait DiagnosticSink {
    /// Persist the record; returns where it went, if anywhere.
    fn export_failure(&self, record: &FailureRecord<'_>) -> Option<PathBuf>;
}

/// Sink that drops every record.
pub struct NoExport;

impl DiagnosticSink for NoExport {
    fn export_failure(&self, _record: &FailureRecord<'_>) -> Option<PathBuf> {
        None
    }
}

// ============================================================================
// Filesystem exporter
// ============================================================================

/// Writes exports under `<root>/<package>/<version>/<category>/`.
///
/// Each export gets a `<key>_<counter>.json` record and, when the raw dump
/// is available, a `<key>_<counter>.xml` next to it. The counter only ever
/// increases and skips names already on disk, so repeated failures never
/// overwrite each other.
pub struct FsExporter {
    root: PathBuf,
    counter: AtomicU64,
}

impl FsExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsExporter {
            root: root.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, app: &AppMetadata, category: &str) -> PathBuf {
        self.root
            .join(&app.package_name)
            .join(app.version_dir())
            .join(category)
    }

    /// Export a live screen capture (not a failure).
    pub fn export_capture(
        &self,
        app: &AppMetadata,
        snapshot: &DeviceSnapshot,
    ) -> std::io::Result<PathBuf> {
        let dir = self.category_dir(app, "captures");
        std::fs::create_dir_all(&dir)?;
        let stem = self.next_stem(&dir, "screen");
        self.write_pair(&stem, snapshot, snapshot)
    }

    fn next_stem(&self, dir: &Path, key: &str) -> PathBuf {
        loop {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let stem = dir.join(format!("{}_{:04}", key, n));
            if !stem.with_extension("json").exists() {
                return stem;
            }
        }
    }

    fn write_pair<T: Serialize>(
        &self,
        stem: &Path,
        record: &T,
        snapshot: &DeviceSnapshot,
    ) -> std::io::Result<PathBuf> {
        let json_path = stem.with_extension("json");
        let json = serde_json::to_string_pretty(record).map_err(std::io::Error::other)?;
        std::fs::write(&json_path, json)?;

        if let Some(xml) = &snapshot.raw_xml {
            std::fs::write(stem.with_extension("xml"), xml)?;
        }
        Ok(json_path)
    }

    fn try_export(&self, record: &FailureRecord<'_>) -> std::io::Result<PathBuf> {
        let dir = self.category_dir(record.app, record.category.dir_name());
        std::fs::create_dir_all(&dir)?;
        let stem = self.next_stem(&dir, &record.key());
        self.write_pair(&stem, record, record.snapshot)
    }
}

impl DiagnosticSink for FsExporter {
    fn export_failure(&self, record: &FailureRecord<'_>) -> Option<PathBuf> {
        match self.try_export(record) {
            Ok(path) => {
                info!(path = %path.display(), "exported failure diagnostics");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, root = %self.root.display(), "could not export failure diagnostics");
                None
            }
        }
    }
}

/// Build a failure record stamped with the current time.
pub fn failure_record<'a>(
    category: FailureCategory,
    app: &'a AppMetadata,
    last_screen: Option<ScreenId>,
    searched_for: &[ScreenId],
    searched_names: Vec<String>,
    snapshot: &'a DeviceSnapshot,
    history: &'a [ActionRecord],
) -> FailureRecord<'a> {
    FailureRecord {
        category,
        app,
        last_screen,
        searched_for: searched_for.to_vec(),
        searched_names,
        snapshot_digest: snapshot.digest(),
        snapshot,
        history,
        exported_at_ms: now_ms(),
    }
}
