mod common;

use apk_controller::apps::{app_script::AppScript, org_torproject_android as orbot};
use apk_controller::graph::{error::GraphError, script_file::ScriptFile};
use apk_controller::screen::screen_model::ScreenId;
use common::*;

// ============================================================================
// YAML script files
// ============================================================================

#[test]
fn yaml_script_builds_same_graph_as_builtin() {
    let file = ScriptFile::load(&fixture_path("orbot.yaml")).expect("fixture loads");
    let from_yaml = file.build_graph().expect("valid graph");
    let builtin = orbot::OrbotScript.build_graph().expect("builtin graph");

    assert_eq!(file.metadata(), orbot::OrbotScript.metadata());
    assert_eq!(from_yaml.screen_count(), builtin.screen_count());
    for id in [orbot::HOME, orbot::CONNECTED] {
        assert_eq!(from_yaml.screen(id), builtin.screen(id), "screen {} differs", id);
    }
    assert_eq!(
        from_yaml.transitions_from(orbot::HOME),
        builtin.transitions_from(orbot::HOME)
    );
    assert_eq!(from_yaml.start_nodes(), vec![orbot::HOME]);
    assert_eq!(from_yaml.end_nodes(), vec![orbot::CONNECTED]);
}

#[test]
fn minimal_yaml_uses_defaults() {
    let yaml = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, start: true, required: [{ text: A }], actions: { default: [go] } }
  - { id: 1, name: b, end: true }
transitions:
  - { from: 0, to: 1, action_lists: [{ name: go }] }
"#;
    let graph = ScriptFile::from_yaml(yaml)
        .expect("parses")
        .build_graph()
        .expect("valid");

    let b = graph.screen(ScreenId(1)).expect("b");
    assert!(b.required_elements.is_empty());
    assert_eq!(b.max_retries, 0);
    assert!(b.wait.is_zero());
    let go = graph.transitions_from(ScreenId(0))[0]
        .action_list("go")
        .expect("go list");
    assert!(go.is_empty());
}

#[test]
fn unknown_fingerprint_attribute_is_rejected() {
    let yaml = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, start: true, end: true, required: [{ txt: A }] }
"#;
    let err = ScriptFile::from_yaml(yaml).expect_err("typo in attribute");
    assert!(matches!(err, GraphError::ScriptFile { .. }));
}

#[test]
fn empty_fingerprint_is_rejected() {
    let yaml = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, start: true, end: true, required: [{}] }
"#;
    let err = ScriptFile::from_yaml(yaml)
        .expect("parses")
        .build_graph()
        .expect_err("constrains nothing");
    assert!(matches!(err, GraphError::EmptyFingerprint { screen: ScreenId(0) }));
}

#[test]
fn dangling_transition_is_rejected() {
    let yaml = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, start: true, end: true, required: [{ text: A }] }
transitions:
  - { from: 0, to: 7, action_lists: [{ name: go }] }
"#;
    let err = ScriptFile::from_yaml(yaml)
        .expect("parses")
        .build_graph()
        .expect_err("7 does not exist");
    assert!(matches!(
        err,
        GraphError::DanglingTransition { from: ScreenId(0), to: ScreenId(7) }
    ));
}

#[test]
fn missing_start_and_end_are_reported() {
    let no_start = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, end: true, required: [{ text: A }] }
"#;
    let err = ScriptFile::from_yaml(no_start)
        .expect("parses")
        .build_graph()
        .expect_err("no start");
    assert!(matches!(err, GraphError::NoStartNode));

    let no_end = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, start: true, required: [{ text: A }] }
"#;
    let err = ScriptFile::from_yaml(no_end)
        .expect("parses")
        .build_graph()
        .expect_err("no end");
    assert!(matches!(err, GraphError::NoEndNode));
}

#[test]
fn decision_table_names_must_exist_on_outgoing_edges() {
    let yaml = r#"
app: { title: t, package_name: com.example, version: "1" }
screens:
  - { id: 0, name: a, start: true, required: [{ text: A }], actions: { default: [jump] } }
  - { id: 1, name: b, end: true, required: [{ text: B }] }
transitions:
  - { from: 0, to: 1, action_lists: [{ name: go }] }
"#;
    let err = ScriptFile::from_yaml(yaml)
        .expect("parses")
        .build_graph()
        .expect_err("jump is not offered");
    assert!(matches!(
        err,
        GraphError::UnknownActionList { screen: ScreenId(0), ref name } if name == "jump"
    ));
}

#[test]
fn load_reports_path_on_error() {
    let err = ScriptFile::load(&fixture_path("does_not_exist.yaml")).expect_err("missing file");
    match err {
        GraphError::ScriptFile { path, .. } => assert!(path.ends_with("does_not_exist.yaml")),
        other => panic!("Expected ScriptFile error, got {:?}", other),
    }
}

// ============================================================================
// Graph structure
// ============================================================================

#[test]
fn chain_graph_reachability() {
    let graph = chain();
    graph.validate().expect("chain is valid");

    assert!(graph.can_reach(S0, &[S2]));
    assert!(graph.can_reach(S1, &[S2]));
    assert!(!graph.can_reach(S2, &[S0]));
    assert_eq!(graph.transition_count(), 2);
    assert_eq!(graph.screen_by_name("s1").map(|d| d.id), Some(S1));
}
