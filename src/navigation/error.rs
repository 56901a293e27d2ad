use std::path::PathBuf;

use thiserror::Error;

use crate::device::{error::ProbeError, snapshot::DeviceSnapshot};
use crate::graph::error::GraphError;
use crate::screen::screen_model::ScreenId;

/// Why a navigation run stopped without reaching its target.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Retries exhausted and the device shows none of the expected screens.
    #[error("{}", unexpected_screen_message(searched_for, observed, export))]
    UnexpectedScreen {
        searched_for: Vec<ScreenId>,
        observed: Box<DeviceSnapshot>,
        export: Option<PathBuf>,
    },

    /// An atomic UI operation failed part way through an action list. The
    /// device state is unknown afterwards, so this is never retried.
    #[error("action list '{action_list}' failed on screen {screen} at step {step}: {source}")]
    ActionExecution {
        screen: ScreenId,
        action_list: String,
        step: usize,
        #[source]
        source: ProbeError,
    },

    /// The device could not be probed at all. Nothing is exported.
    #[error("device unavailable while probing: {0}")]
    DeviceUnavailable(#[source] ProbeError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// No candidate action list on this screen leads towards a target.
    #[error("no transition from screen {from} leads to any of {}", format_ids(targets))]
    NoRoute {
        from: ScreenId,
        targets: Vec<ScreenId>,
    },

    #[error("gave up after {limit} transitions without reaching a target (last screen {screen})")]
    TransitionLimit {
        limit: usize,
        screen: ScreenId,
        export: Option<PathBuf>,
    },
}

impl NavigationError {
    /// Path of the diagnostic export accompanying this error, if any.
    pub fn export_path(&self) -> Option<&PathBuf> {
        match self {
            NavigationError::UnexpectedScreen { export, .. } => export.as_ref(),
            NavigationError::TransitionLimit { export, .. } => export.as_ref(),
            _ => None,
        }
    }

    /// Whether the failure is caused by losing the device.
    pub fn is_fatal_device_error(&self) -> bool {
        match self {
            NavigationError::DeviceUnavailable(_) => true,
            NavigationError::ActionExecution { source, .. } => source.is_device_loss(),
            _ => false,
        }
    }
}

pub(crate) fn format_ids(ids: &[ScreenId]) -> String {
    let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", ids.join(", "))
}

fn unexpected_screen_message(
    searched_for: &[ScreenId],
    observed: &DeviceSnapshot,
    export: &Option<PathBuf>,
) -> String {
    let mut message = format!(
        "expected screen not found; searched for {}, observed {} elements (texts: {:?})",
        format_ids(searched_for),
        observed.len(),
        observed.texts().into_iter().take(8).collect::<Vec<_>>()
    );
    if let Some(path) = export {
        message.push_str(&format!("; diagnostics in {}", path.display()));
    }
    message
}
