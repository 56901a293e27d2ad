use thiserror::Error;

use crate::screen::fingerprint::ElementFingerprint;

/// Failures raised by a `DeviceProbe` or the command layer beneath it.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The device cannot be reached (not attached, offline, unauthorized).
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// No element of the current hierarchy matches the fingerprint.
    #[error("element {fingerprint} not found on screen")]
    ElementNotFound { fingerprint: ElementFingerprint },

    /// The element was found but has no usable bounds to act on.
    #[error("element {fingerprint} has no tappable bounds")]
    NoBounds { fingerprint: ElementFingerprint },

    /// A device command exited with a non-zero status.
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {timeout_ms} ms")]
    CommandTimeout { command: String, timeout_ms: u128 },

    /// The program could not be spawned at all (e.g. adb not on PATH).
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The hierarchy dump could not be interpreted.
    #[error("unreadable UI hierarchy: {0}")]
    SnapshotParse(String),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    /// Whether this error means the device itself is gone, as opposed to a
    /// problem with one particular operation.
    pub fn is_device_loss(&self) -> bool {
        matches!(
            self,
            ProbeError::DeviceUnavailable(_) | ProbeError::Spawn { .. } | ProbeError::CommandTimeout { .. }
        )
    }
}
