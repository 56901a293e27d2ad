use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::device::{adb::AdbProbe, error::ProbeError};

/// Precondition failures checked before a navigation run starts.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no adb device is attached")]
    NoDevice,

    #[error("{count} devices are attached ({serials}); pass --serial to pick one")]
    AmbiguousDevice { count: usize, serials: String },

    #[error("device '{0}' is not attached")]
    UnknownSerial(String),

    #[error("device '{serial}' is attached but {state}")]
    NotReady { serial: String, state: String },

    #[error("app '{package}' is not installed on the device")]
    AppNotInstalled { package: String },

    #[error("app '{package}' has version '{found}', script expects '{expected}'")]
    VersionMismatch {
        package: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// One row of `adb devices` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDevice {
    pub serial: String,
    pub state: String,
}

impl AttachedDevice {
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

// ============================================================================
// Output parsers
// ============================================================================

/// Parse `adb devices` (with or without `-l`).
pub fn parse_devices(output: &str) -> Vec<AttachedDevice> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(AttachedDevice {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Parse `pm list packages` into bare package names.
pub fn parse_packages(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(|line| line.trim().trim_start_matches("package:").replace('\'', ""))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Extract `versionName=...` from `dumpsys package <pkg>` output.
pub fn parse_version_name(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("versionName="))
        .map(|v| v.trim().to_string())
}

/// Whether a device version string satisfies the script version.
///
/// Apps report versions like "16.6.3-RC-1-tor.0.4.7.10" while scripts name
/// "16.6.3 RC 1", so both sides are reduced to lowercase alphanumerics and
/// the device version must start with the expected one.
pub fn version_matches(found: &str, expected: &str) -> bool {
    let normalize = |v: &str| -> String {
        v.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    };
    let expected = normalize(expected);
    !expected.is_empty() && normalize(found).starts_with(&expected)
}

// ============================================================================
// Checks against a live device
// ============================================================================

/// Runs the pre-run device and app checks through adb.
pub struct DeviceConnection<'a> {
    probe: &'a AdbProbe,
}

impl<'a> DeviceConnection<'a> {
    pub fn new(probe: &'a AdbProbe) -> Self {
        DeviceConnection { probe }
    }

    pub fn devices(&self) -> Result<Vec<AttachedDevice>, ConnectionError> {
        // `adb devices` ignores -s, so call it through an unpinned probe.
        let unpinned = AdbProbe::new(self.adb_program(), None);
        let output = unpinned.adb(&["devices"])?;
        Ok(parse_devices(&output.stdout))
    }

    /// Fails unless exactly the requested (or the only) device is ready.
    pub fn assert_phone_is_connected(&self) -> Result<String, ConnectionError> {
        let devices = self.devices()?;
        debug!(count = devices.len(), "adb devices");

        let device = match self.probe.serial() {
            Some(serial) => devices
                .into_iter()
                .find(|d| d.serial == serial)
                .ok_or_else(|| ConnectionError::UnknownSerial(serial.to_string()))?,
            None => match devices.len() {
                0 => return Err(ConnectionError::NoDevice),
                1 => devices.into_iter().next().ok_or(ConnectionError::NoDevice)?,
                count => {
                    return Err(ConnectionError::AmbiguousDevice {
                        count,
                        serials: devices
                            .iter()
                            .map(|d| d.serial.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            },
        };

        if !device.is_ready() {
            return Err(ConnectionError::NotReady {
                serial: device.serial,
                state: device.state,
            });
        }
        info!(serial = %device.serial, "device connected");
        Ok(device.serial)
    }

    pub fn assert_app_is_installed(&self, package: &str) -> Result<(), ConnectionError> {
        let output = self.probe.adb(&["shell", "pm", "list", "packages"])?;
        if parse_packages(&output.stdout).contains(package) {
            Ok(())
        } else {
            Err(ConnectionError::AppNotInstalled {
                package: package.to_string(),
            })
        }
    }

    pub fn assert_app_version(&self, package: &str, expected: &str) -> Result<(), ConnectionError> {
        self.assert_app_is_installed(package)?;
        let output = self.probe.adb(&["shell", "dumpsys", "package", package])?;
        let found = parse_version_name(&output.stdout).unwrap_or_default();
        if version_matches(&found, expected) {
            info!(package, version = %found, "app version ok");
            Ok(())
        } else {
            Err(ConnectionError::VersionMismatch {
                package: package.to_string(),
                expected: expected.to_string(),
                found,
            })
        }
    }

    fn adb_program(&self) -> &str {
        self.probe.program()
    }
}
