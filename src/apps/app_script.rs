use serde::{Deserialize, Serialize};

use crate::graph::{error::GraphError, script_graph::ScriptGraph};

/// Identifies the app (and app version) a script was written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Short script title, e.g. "conf_orbot"
    pub title: String,

    /// Android package name, e.g. "org.torproject.android"
    pub package_name: String,

    /// Name shown in the launcher
    #[serde(default)]
    pub display_name: String,

    /// App version the script targets, as shown by the app
    pub version: String,
}

impl AppMetadata {
    /// Version string usable as a directory name ("16.6.3 RC 1" -> "16_6_3_RC_1").
    pub fn version_dir(&self) -> String {
        self.version
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

/// Per (package, version) script: produces the screen graph for that app.
///
/// Implementations only describe screens, flags and transitions; they never
/// talk to a device.
pub trait AppScript {
    fn metadata(&self) -> AppMetadata;

    /// Build the graph. Implementations should return a graph that passes
    /// `ScriptGraph::validate`.
    fn build_graph(&self) -> Result<ScriptGraph, GraphError>;
}
