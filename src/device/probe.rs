use crate::device::{error::ProbeError, snapshot::DeviceSnapshot};
use crate::screen::{actions::UiAction, fingerprint::ElementFingerprint};

/// Narrow interface to one physical or emulated device.
///
/// Passed explicitly to every operation that needs it so tests can swap in
/// a simulated device.
pub trait DeviceProbe {
    /// Capture the current UI hierarchy.
    fn capture(&mut self) -> Result<DeviceSnapshot, ProbeError>;

    fn perform_tap(&mut self, target: &ElementFingerprint) -> Result<(), ProbeError>;

    fn perform_type_text(&mut self, target: &ElementFingerprint, text: &str) -> Result<(), ProbeError>;

    /// Selecting a list item or checkbox is a tap on most devices.
    fn perform_select(&mut self, target: &ElementFingerprint) -> Result<(), ProbeError> {
        self.perform_tap(target)
    }

    /// Dispatch one atomic action.
    fn perform(&mut self, action: &UiAction) -> Result<(), ProbeError> {
        match action {
            UiAction::Tap { target } => self.perform_tap(target),
            UiAction::TypeText { target, text } => self.perform_type_text(target, text),
            UiAction::Select { target } => self.perform_select(target),
        }
    }
}
