use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::apps::app_script::{AppMetadata, AppScript};
use crate::graph::{error::GraphError, script_graph::ScriptGraph};
use crate::screen::{
    actions::{ActionList, ActionTable},
    fingerprint::ElementFingerprint,
    screen_model::{ScreenDescriptor, ScreenId},
};

// ============================================================================
// YAML script model
// ============================================================================

/// A complete app script authored as YAML.
///
/// ```yaml
/// app:
///   title: conf_orbot
///   package_name: org.torproject.android
///   version: 16.6.3 RC 1
/// screens:
///   - id: 0
///     name: s0
///     start: true
///     required: [{ text: Orbot }]
///     actions: { default: [start_tor] }
///   - id: 1
///     name: s1
///     end: true
///     required: [{ text: STOP }]
/// transitions:
///   - from: 0
///     to: 1
///     action_lists:
///       - name: start_tor
///         actions:
///           - op: tap
///             target: { resource_id: "org.torproject.android:id/btnStart" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFile {
    pub app: AppMetadata,
    pub screens: Vec<ScreenSpec>,

    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenSpec {
    pub id: u32,
    pub name: String,

    #[serde(default)]
    pub start: bool,

    #[serde(default)]
    pub end: bool,

    #[serde(default)]
    pub required: Vec<ElementFingerprint>,

    #[serde(default)]
    pub optional: Vec<ElementFingerprint>,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub wait_seconds: u64,

    #[serde(default)]
    pub actions: ActionTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: u32,
    pub to: u32,
    pub action_lists: Vec<ActionList>,
}

impl ScriptFile {
    /// Read and parse a YAML script file. The graph is not built yet.
    pub fn load(path: &Path) -> Result<ScriptFile, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::ScriptFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            GraphError::ScriptFile { message, .. } => GraphError::ScriptFile {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<ScriptFile, GraphError> {
        serde_yaml::from_str(content).map_err(|e| GraphError::ScriptFile {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    fn descriptor(spec: &ScreenSpec) -> ScreenDescriptor {
        ScreenDescriptor {
            id: ScreenId(spec.id),
            name: spec.name.clone(),
            required_elements: spec.required.clone(),
            optional_elements: spec.optional.clone(),
            max_retries: spec.max_retries,
            wait: std::time::Duration::from_secs(spec.wait_seconds),
            action_table: spec.actions.clone(),
        }
    }
}

impl AppScript for ScriptFile {
    fn metadata(&self) -> AppMetadata {
        self.app.clone()
    }

    fn build_graph(&self) -> Result<ScriptGraph, GraphError> {
        let mut graph = ScriptGraph::new();

        for spec in &self.screens {
            graph.add_screen(Self::descriptor(spec))?;
        }
        for spec in &self.screens {
            if spec.start {
                graph.mark_start(ScreenId(spec.id))?;
            }
            if spec.end {
                graph.mark_end(ScreenId(spec.id))?;
            }
        }
        for t in &self.transitions {
            graph.add_transition(ScreenId(t.from), ScreenId(t.to), t.action_lists.clone())?;
        }

        graph.validate()?;
        Ok(graph)
    }
}
