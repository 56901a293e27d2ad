use std::time::Duration;

use tracing::{debug, info};

use crate::device::{
    error::ProbeError,
    probe::DeviceProbe,
    runner::{CommandOutput, DEFAULT_COMMAND_TIMEOUT, run_command},
    snapshot::{DeviceSnapshot, UiElement},
};
use crate::screen::fingerprint::ElementFingerprint;

/// `DeviceProbe` backed by the `adb` command line tool and uiautomator.
#[derive(Debug, Clone)]
pub struct AdbProbe {
    adb: String,
    serial: Option<String>,
    timeout: Duration,
}

impl AdbProbe {
    pub fn new(adb: &str, serial: Option<&str>) -> Self {
        AdbProbe {
            adb: adb.to_string(),
            serial: serial.map(|s| s.to_string()),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn program(&self) -> &str {
        &self.adb
    }

    /// Run `adb [-s serial] <args>` and classify failures.
    pub fn adb(&self, args: &[&str]) -> Result<CommandOutput, ProbeError> {
        let mut full: Vec<String> = Vec::with_capacity(args.len() + 2);
        if let Some(serial) = &self.serial {
            full.push("-s".into());
            full.push(serial.clone());
        }
        full.extend(args.iter().map(|a| a.to_string()));

        let output = run_command(&self.adb, &full, self.timeout)?;
        if let Some(reason) = device_loss_reason(&output.stderr) {
            return Err(ProbeError::DeviceUnavailable(reason));
        }
        if !output.success() {
            return Err(ProbeError::CommandFailed {
                command: format!("{} {}", self.adb, full.join(" ")),
                status: output
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".into()),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn locate(&mut self, target: &ElementFingerprint) -> Result<UiElement, ProbeError> {
        let snapshot = self.capture()?;
        let element = snapshot
            .elements
            .into_iter()
            .find(|el| target.matches(el))
            .ok_or_else(|| ProbeError::ElementNotFound {
                fingerprint: target.clone(),
            })?;
        Ok(element)
    }

    fn tap_element(&self, target: &ElementFingerprint, element: &UiElement) -> Result<(), ProbeError> {
        let bounds = element
            .bounds
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ProbeError::NoBounds {
                fingerprint: target.clone(),
            })?;
        let (x, y) = bounds.center();
        debug!(fingerprint = %target, x, y, "tap");
        let (x, y) = (x.to_string(), y.to_string());
        self.adb(&["shell", "input", "tap", x.as_str(), y.as_str()])?;
        Ok(())
    }
}

impl DeviceProbe for AdbProbe {
    fn capture(&mut self) -> Result<DeviceSnapshot, ProbeError> {
        let output = self.adb(&["exec-out", "uiautomator", "dump", "/dev/tty"])?;
        let snapshot = DeviceSnapshot::from_xml(&output.stdout)?;
        debug!(elements = snapshot.len(), "captured hierarchy");
        Ok(snapshot)
    }

    fn perform_tap(&mut self, target: &ElementFingerprint) -> Result<(), ProbeError> {
        let element = self.locate(target)?;
        self.tap_element(target, &element)
    }

    fn perform_type_text(&mut self, target: &ElementFingerprint, text: &str) -> Result<(), ProbeError> {
        let element = self.locate(target)?;
        self.tap_element(target, &element)?;
        info!(fingerprint = %target, chars = text.chars().count(), "typing text");
        let escaped = escape_input_text(text);
        self.adb(&["shell", "input", "text", escaped.as_str()])?;
        Ok(())
    }
}

/// Recognise adb's "the device is gone" messages.
pub fn device_loss_reason(stderr: &str) -> Option<String> {
    const MARKERS: [&str; 5] = [
        "no devices/emulators found",
        "device offline",
        "device unauthorized",
        "not found",
        "more than one device/emulator",
    ];
    let lower = stderr.to_lowercase();
    MARKERS
        .iter()
        .any(|m| lower.contains(m) && lower.contains("error"))
        .then(|| stderr.trim().to_string())
}

/// Escape text for `adb shell input text`: spaces become `%s` and shell
/// metacharacters are backslash-escaped.
pub fn escape_input_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        match ch {
            ' ' => escaped.push_str("%s"),
            '\\' | '"' | '\'' | '`' | '$' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '*' | '~'
            | '#' | '?' | '!' | '[' | ']' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
