use serde::{Deserialize, Serialize};

use crate::screen::fingerprint::ElementFingerprint;
use crate::screen::screen_model::ObservedElements;

/// One atomic UI operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UiAction {
    /// Tap the element matching the fingerprint
    Tap { target: ElementFingerprint },

    /// Focus the element and type text into it
    TypeText {
        target: ElementFingerprint,
        text: String,
    },

    /// Select an item (list entry, checkbox, radio button)
    Select { target: ElementFingerprint },
}

impl UiAction {
    pub fn tap(target: ElementFingerprint) -> Self {
        UiAction::Tap { target }
    }

    pub fn type_text(target: ElementFingerprint, text: &str) -> Self {
        UiAction::TypeText {
            target,
            text: text.to_string(),
        }
    }

    pub fn select(target: ElementFingerprint) -> Self {
        UiAction::Select { target }
    }

    pub fn target(&self) -> &ElementFingerprint {
        match self {
            UiAction::Tap { target } => target,
            UiAction::TypeText { target, .. } => target,
            UiAction::Select { target } => target,
        }
    }

    /// Short human-readable form for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            UiAction::Tap { target } => format!("tap {}", target),
            UiAction::TypeText { target, text } => format!("type {:?} into {}", text, target),
            UiAction::Select { target } => format!("select {}", target),
        }
    }
}

/// Named, ordered sequence of UI operations realizing one transition.
///
/// An action list runs to completion or the run is aborted at the failing
/// operation; there is no rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionList {
    pub name: String,

    #[serde(default)]
    pub actions: Vec<UiAction>,
}

impl ActionList {
    pub fn new(name: &str, actions: Vec<UiAction>) -> Self {
        ActionList {
            name: name.to_string(),
            actions,
        }
    }

    /// An action list with no operations: the transition happens by itself
    /// (or has already happened) and only needs re-verification.
    pub fn empty(name: &str) -> Self {
        ActionList::new(name, vec![])
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// ============================================================================
// Decision table: which action lists apply for the observed optional elements
// ============================================================================

/// One row of a screen's decision table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionRule {
    /// Optional elements that must all have been observed
    #[serde(default)]
    pub when_present: Vec<ElementFingerprint>,

    /// Optional elements that must all be missing
    #[serde(default)]
    pub when_absent: Vec<ElementFingerprint>,

    /// Action list names to try, in priority order
    pub choose: Vec<String>,
}

impl ActionRule {
    pub fn applies(&self, observed: &ObservedElements) -> bool {
        self.when_present.iter().all(|fp| observed.has_optional(fp))
            && self.when_absent.iter().all(|fp| !observed.has_optional(fp))
    }
}

/// Pure mapping from observed elements to candidate action list names.
///
/// Rules are evaluated in order; the first applicable rule wins. When no
/// rule applies the `default` names are returned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionTable {
    #[serde(default)]
    pub rules: Vec<ActionRule>,

    #[serde(default)]
    pub default: Vec<String>,
}

impl ActionTable {
    pub fn new(default: &[&str]) -> Self {
        ActionTable {
            rules: vec![],
            default: default.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add a rule choosing `choose` when every fingerprint in `present` was observed.
    pub fn when_present(mut self, present: Vec<ElementFingerprint>, choose: &[&str]) -> Self {
        self.rules.push(ActionRule {
            when_present: present,
            when_absent: vec![],
            choose: choose.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_rule(mut self, rule: ActionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// True when the table has neither rules nor a default.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.default.is_empty()
    }

    pub fn select(&self, observed: &ObservedElements) -> Vec<String> {
        self.rules
            .iter()
            .find(|rule| rule.applies(observed))
            .map(|rule| rule.choose.clone())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Every action list name this table can produce.
    pub fn referenced_names(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|r| r.choose.iter())
            .chain(self.default.iter())
            .map(String::as_str)
    }
}
