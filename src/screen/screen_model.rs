use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::screen::{actions::ActionTable, fingerprint::ElementFingerprint};

/// Integer id of a screen, unique within one script graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenId(pub u32);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ScreenId {
    fn from(value: u32) -> Self {
        ScreenId(value)
    }
}

/// Description of one UI state of the target app.
///
/// Built once when the script graph is assembled and never mutated
/// afterwards; the graph owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenDescriptor {
    pub id: ScreenId,
    pub name: String,

    /// All must be present for the screen to match
    pub required_elements: Vec<ElementFingerprint>,

    /// Refine interpretation; absence never invalidates a match
    pub optional_elements: Vec<ElementFingerprint>,

    /// Re-probe attempts before declaring failure at this screen
    pub max_retries: u32,

    /// Pause after this screen's actions and before each re-probe
    pub wait: Duration,

    pub action_table: ActionTable,
}

impl ScreenDescriptor {
    pub fn new(id: u32, name: &str) -> Self {
        ScreenDescriptor {
            id: ScreenId(id),
            name: name.to_string(),
            required_elements: vec![],
            optional_elements: vec![],
            max_retries: 0,
            wait: Duration::ZERO,
            action_table: ActionTable::default(),
        }
    }

    pub fn require(mut self, fingerprint: ElementFingerprint) -> Self {
        self.required_elements.push(fingerprint);
        self
    }

    pub fn optionally(mut self, fingerprint: ElementFingerprint) -> Self {
        self.optional_elements.push(fingerprint);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, wait_seconds: u64) -> Self {
        self.max_retries = max_retries;
        self.wait = Duration::from_secs(wait_seconds);
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_actions(mut self, table: ActionTable) -> Self {
        self.action_table = table;
        self
    }

    /// Candidate action list names for the observed elements, best first.
    pub fn select_actions(&self, observed: &ObservedElements) -> Vec<String> {
        self.action_table.select(observed)
    }
}

impl fmt::Display for ScreenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Which of a screen's fingerprints were seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedElements {
    pub required: Vec<ElementFingerprint>,
    pub optional: Vec<ElementFingerprint>,
}

impl ObservedElements {
    pub fn has_optional(&self, fingerprint: &ElementFingerprint) -> bool {
        self.optional.contains(fingerprint)
    }
}
