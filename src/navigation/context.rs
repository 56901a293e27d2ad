use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::graph::script_graph::ScriptGraph;
use crate::screen::screen_model::ScreenId;

/// One executed action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    /// Screen the action list was executed on
    pub screen: ScreenId,

    /// Name of the executed action list
    pub action_list: String,

    /// Screens expected after execution, in priority order
    pub expected_next: Vec<ScreenId>,
}

/// Mutable state of a single navigation run.
///
/// Owned by one `Navigator` invocation; the graph is only borrowed.
#[derive(Debug)]
pub struct RunContext<'g> {
    graph: &'g ScriptGraph,

    /// Last screen the device was verified to be on
    pub current: Option<ScreenId>,

    /// Re-probe attempts per screen in the current wait episode
    pub retries: HashMap<ScreenId, u32>,

    pub history: Vec<ActionRecord>,

    /// Number of snapshots taken so far
    pub probes: u64,

    started: Instant,
}

impl<'g> RunContext<'g> {
    pub fn new(graph: &'g ScriptGraph) -> Self {
        RunContext {
            graph,
            current: None,
            retries: HashMap::new(),
            history: Vec::new(),
            probes: 0,
            started: Instant::now(),
        }
    }

    pub fn graph(&self) -> &'g ScriptGraph {
        self.graph
    }

    pub fn enter(&mut self, screen: ScreenId) {
        self.current = Some(screen);
    }

    pub fn retries_of(&self, screen: ScreenId) -> u32 {
        self.retries.get(&screen).copied().unwrap_or(0)
    }

    /// Screens in `expected` that still have retry budget left, paired with
    /// their wait. Unknown ids are ignored.
    pub fn remaining_budget(&self, expected: &[ScreenId]) -> Vec<(ScreenId, std::time::Duration)> {
        expected
            .iter()
            .filter_map(|id| self.graph.screen(*id))
            .filter(|d| self.retries_of(d.id) < d.max_retries)
            .map(|d| (d.id, d.wait))
            .collect()
    }

    pub fn bump_retries(&mut self, screens: &[ScreenId]) {
        for id in screens {
            *self.retries.entry(*id).or_insert(0) += 1;
        }
    }

    pub fn clear_retries(&mut self, screens: &[ScreenId]) {
        for id in screens {
            self.retries.remove(id);
        }
    }

    pub fn record(&mut self, record: ActionRecord) {
        self.history.push(record);
    }

    /// Number of action lists executed so far.
    pub fn transitions(&self) -> usize {
        self.history.len()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}
