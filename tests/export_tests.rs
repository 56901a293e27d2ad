mod common;

use apk_controller::device::{replay::ReplayProbe, snapshot::DeviceSnapshot};
use apk_controller::export::diagnostics::{
    DiagnosticSink, FailureCategory, FsExporter, failure_record,
};
use apk_controller::navigation::{
    context::ActionRecord,
    engine::Navigator,
    error::NavigationError,
};
use common::*;

#[test]
fn failure_export_lands_under_package_and_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exporter = FsExporter::new(dir.path());
    let app = test_app();
    let snap = DeviceSnapshot::from_xml(&fixture("orbot_home.xml")).expect("dump");
    let history = vec![ActionRecord {
        screen: S0,
        action_list: "start_tor".into(),
        expected_next: vec![S1],
    }];

    let record = failure_record(
        FailureCategory::UnexpectedScreen,
        &app,
        Some(S0),
        &[S1],
        vec!["s1".into()],
        &snap,
        &history,
    );
    let path = exporter.export_failure(&record).expect("export written");

    let expected_dir = dir
        .path()
        .join("com.example.test")
        .join("1_0")
        .join("unexpected_screen");
    assert_eq!(path, expected_dir.join("screen_0_0000.json"));
    assert!(expected_dir.join("screen_0_0000.xml").exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("json file")).expect("valid json");
    assert_eq!(json["category"], "unexpected_screen");
    assert_eq!(json["last_screen"], 0);
    assert_eq!(json["searched_for"][0], 1);
    assert_eq!(json["searched_names"][0], "s1");
    assert_eq!(json["history"][0]["action_list"], "start_tor");
    assert_eq!(json["snapshot_digest"], snap.digest());

    let xml = std::fs::read_to_string(expected_dir.join("screen_0_0000.xml")).expect("xml file");
    assert!(xml.contains("btnStart"));
}

#[test]
fn repeated_exports_never_overwrite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = test_app();
    let snap = snapshot(&["Loading"]);
    let record = failure_record(
        FailureCategory::UnexpectedScreen,
        &app,
        None,
        &[S0],
        vec![],
        &snap,
        &[],
    );

    let first = FsExporter::new(dir.path()).export_failure(&record).expect("first");
    // A fresh exporter restarts its counter but must skip existing files.
    let second = FsExporter::new(dir.path()).export_failure(&record).expect("second");

    assert_ne!(first, second);
    assert!(first.ends_with("screen_unknown_0000.json"));
    assert!(second.ends_with("screen_unknown_0001.json"));
    // No raw dump for element-built snapshots.
    assert!(!first.with_extension("xml").exists());
}

#[test]
fn unwritable_root_does_not_mask_navigation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").expect("blocker");
    let exporter = FsExporter::new(&blocker);

    let graph = orbot_pair(0);
    let app = test_app();
    let navigator = Navigator::new(&graph, &app, &exporter);
    let mut probe = ReplayProbe::new(vec![snapshot(&["Elsewhere"])]);

    let err = navigator.advance(&mut probe, &[S0], &[S1]).expect_err("no match");
    assert!(matches!(err, NavigationError::UnexpectedScreen { export: None, .. }));
    assert!(err.export_path().is_none());
}

#[test]
fn capture_export_goes_to_captures_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exporter = FsExporter::new(dir.path());
    let app = test_app();
    let snap = DeviceSnapshot::from_xml(&fixture("orbot_connected.xml")).expect("dump");

    let path = exporter.export_capture(&app, &snap).expect("capture");

    assert!(path.starts_with(dir.path().join("com.example.test").join("1_0").join("captures")));
    assert!(path.with_extension("xml").exists());
}
