#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use apk_controller::apps::app_script::AppMetadata;
use apk_controller::device::snapshot::{DeviceSnapshot, UiElement};
use apk_controller::export::diagnostics::{DiagnosticSink, FailureCategory, FailureRecord};
use apk_controller::graph::script_graph::ScriptGraph;
use apk_controller::screen::{
    actions::{ActionList, ActionTable, UiAction},
    fingerprint::ElementFingerprint,
    screen_model::{ScreenDescriptor, ScreenId},
};

pub const S0: ScreenId = ScreenId(0);
pub const S1: ScreenId = ScreenId(1);
pub const S2: ScreenId = ScreenId(2);

// ============================================================================
// Snapshots
// ============================================================================

/// Snapshot made of plain text elements.
pub fn snapshot(texts: &[&str]) -> DeviceSnapshot {
    DeviceSnapshot::from_elements(texts.iter().map(|t| UiElement::with_text(t)).collect())
}

pub fn snapshot_with(elements: Vec<UiElement>) -> DeviceSnapshot {
    DeviceSnapshot::from_elements(elements)
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("fixture file")
}

// ============================================================================
// Graphs
// ============================================================================

pub fn test_app() -> AppMetadata {
    AppMetadata {
        title: "conf_test".to_string(),
        package_name: "com.example.test".to_string(),
        display_name: "Test".to_string(),
        version: "1.0".to_string(),
    }
}

pub fn start_button() -> ElementFingerprint {
    ElementFingerprint::resource_id("org.torproject.android:id/btnStart")
}

/// S0 (requires "Orbot") --start_tor: tap(btnStart)--> S1 (requires "STOP").
pub fn orbot_pair(max_retries: u32) -> ScriptGraph {
    let mut graph = ScriptGraph::new();
    graph
        .add_screen(
            ScreenDescriptor::new(0, "s0")
                .require(ElementFingerprint::text("Orbot"))
                .with_retries(max_retries, 0)
                .with_wait(Duration::from_millis(5))
                .with_actions(ActionTable::new(&["start_tor"])),
        )
        .expect("add s0");
    graph
        .add_screen(
            ScreenDescriptor::new(1, "s1")
                .require(ElementFingerprint::text("STOP"))
                .with_retries(max_retries, 0)
                .with_wait(Duration::from_millis(5)),
        )
        .expect("add s1");
    graph
        .add_transition(
            S0,
            S1,
            vec![ActionList::new("start_tor", vec![UiAction::tap(start_button())])],
        )
        .expect("add s0 -> s1");
    graph.mark_start(S0).expect("start");
    graph.mark_end(S1).expect("end");
    graph
}

/// S0 -> S1 -> S2 with one action list per edge.
pub fn chain() -> ScriptGraph {
    let mut graph = ScriptGraph::new();
    for (id, text) in [(0, "Welcome"), (1, "Settings"), (2, "Done")] {
        let next = format!("to_{}", id + 1);
        let mut screen = ScreenDescriptor::new(id, &format!("s{}", id))
            .require(ElementFingerprint::text(text))
            .with_wait(Duration::from_millis(1));
        if id < 2 {
            screen = screen.with_actions(ActionTable::new(&[next.as_str()]));
        }
        graph.add_screen(screen).expect("add screen");
    }
    graph
        .add_transition(
            S0,
            S1,
            vec![ActionList::new("to_1", vec![UiAction::tap(ElementFingerprint::text("Next"))])],
        )
        .expect("edge 0 -> 1");
    graph
        .add_transition(
            S1,
            S2,
            vec![ActionList::new(
                "to_2",
                vec![
                    UiAction::type_text(ElementFingerprint::resource_id("app:id/name"), "alice"),
                    UiAction::tap(ElementFingerprint::text("Finish")),
                ],
            )],
        )
        .expect("edge 1 -> 2");
    graph.mark_start(S0).expect("start");
    graph.mark_end(S2).expect("end");
    graph
}

// ============================================================================
// Diagnostic sink that records instead of writing files
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExportCall {
    pub category: FailureCategory,
    pub last_screen: Option<ScreenId>,
    pub searched_for: Vec<ScreenId>,
    pub history_len: usize,
}

#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<ExportCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().expect("sink lock").len()
    }

    pub fn last(&self) -> Option<ExportCall> {
        self.calls.lock().expect("sink lock").last().cloned()
    }
}

impl DiagnosticSink for RecordingSink {
    fn export_failure(&self, record: &FailureRecord<'_>) -> Option<PathBuf> {
        let mut calls = self.calls.lock().expect("sink lock");
        calls.push(ExportCall {
            category: record.category,
            last_screen: record.last_screen,
            searched_for: record.searched_for.clone(),
            history_len: record.history.len(),
        });
        Some(PathBuf::from(format!("memory/{}_{:04}.json", record.key(), calls.len())))
    }
}
