use std::collections::VecDeque;
use std::path::Path;

use crate::device::{error::ProbeError, probe::DeviceProbe, snapshot::DeviceSnapshot};
use crate::screen::fingerprint::ElementFingerprint;

/// An operation a `ReplayProbe` was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformedOp {
    Tap(ElementFingerprint),
    TypeText(ElementFingerprint, String),
    Select(ElementFingerprint),
}

/// Simulated device that plays back a fixed sequence of snapshots.
///
/// Each `capture` returns the next snapshot. Once the sequence is used up
/// the last snapshot repeats if `repeat_last` is set, otherwise the device
/// reports itself unavailable. Actions are recorded, not executed.
#[derive(Debug, Clone, Default)]
pub struct ReplayProbe {
    frames: VecDeque<DeviceSnapshot>,
    last: Option<DeviceSnapshot>,
    repeat_last: bool,
    action_failure: Option<String>,
    unreadable_captures: usize,

    /// Number of `capture` calls so far
    pub captures: usize,

    /// Actions performed, in order
    pub performed: Vec<PerformedOp>,
}

impl ReplayProbe {
    pub fn new(frames: Vec<DeviceSnapshot>) -> Self {
        ReplayProbe {
            frames: frames.into(),
            ..Default::default()
        }
    }

    /// Load each file as a uiautomator dump, in the given order.
    pub fn from_dump_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ProbeError> {
        let frames = paths
            .iter()
            .map(|p| {
                let p = p.as_ref();
                let xml = std::fs::read_to_string(p).map_err(|source| ProbeError::Io {
                    context: format!("reading {}", p.display()),
                    source,
                })?;
                DeviceSnapshot::from_xml(&xml)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(frames))
    }

    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Make every action fail with `DeviceUnavailable(reason)`.
    pub fn failing_actions(mut self, reason: &str) -> Self {
        self.action_failure = Some(reason.to_string());
        self
    }

    /// Make the next `count` captures fail as unreadable dumps before any
    /// frame is played.
    pub fn with_unreadable_captures(mut self, count: usize) -> Self {
        self.unreadable_captures = count;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    fn act(&mut self, op: PerformedOp) -> Result<(), ProbeError> {
        if let Some(reason) = &self.action_failure {
            return Err(ProbeError::DeviceUnavailable(reason.clone()));
        }
        self.performed.push(op);
        Ok(())
    }
}

impl DeviceProbe for ReplayProbe {
    fn capture(&mut self) -> Result<DeviceSnapshot, ProbeError> {
        self.captures += 1;
        if self.unreadable_captures > 0 {
            self.unreadable_captures -= 1;
            return Err(ProbeError::SnapshotParse("truncated hierarchy dump".into()));
        }
        match self.frames.pop_front() {
            Some(frame) => {
                self.last = Some(frame.clone());
                Ok(frame)
            }
            None if self.repeat_last => self
                .last
                .clone()
                .ok_or_else(|| ProbeError::DeviceUnavailable("replay has no frames".into())),
            None => Err(ProbeError::DeviceUnavailable(
                "replay sequence exhausted".into(),
            )),
        }
    }

    fn perform_tap(&mut self, target: &ElementFingerprint) -> Result<(), ProbeError> {
        self.act(PerformedOp::Tap(target.clone()))
    }

    fn perform_type_text(&mut self, target: &ElementFingerprint, text: &str) -> Result<(), ProbeError> {
        self.act(PerformedOp::TypeText(target.clone(), text.to_string()))
    }

    fn perform_select(&mut self, target: &ElementFingerprint) -> Result<(), ProbeError> {
        self.act(PerformedOp::Select(target.clone()))
    }
}
