mod common;

use apk_controller::apps::{app_script::AppScript, org_torproject_android as orbot};
use apk_controller::device::snapshot::{DeviceSnapshot, UiElement};
use apk_controller::graph::script_graph::ScriptGraph;
use apk_controller::screen::{
    fingerprint::ElementFingerprint,
    screen_model::{ScreenDescriptor, ScreenId},
};
use apk_controller::verification::matcher::{
    is_expected_screen, is_present, match_any, missing_required, observe,
};
use common::*;

fn home_descriptor() -> ScreenDescriptor {
    ScreenDescriptor::new(0, "home")
        .require(ElementFingerprint::text("Orbot"))
        .require(ElementFingerprint::resource_id("org.torproject.android:id/btnStart"))
}

// ============================================================================
// is_expected_screen
// ============================================================================

#[test]
fn all_required_elements_must_be_present() {
    let d = home_descriptor();
    let both = snapshot_with(vec![
        UiElement::with_text("Orbot"),
        UiElement::with_resource_id("org.torproject.android:id/btnStart"),
    ]);
    let one = snapshot(&["Orbot"]);

    assert!(is_expected_screen(&both, &d));
    assert!(!is_expected_screen(&one, &d));
    assert_eq!(
        missing_required(&one, &d),
        vec![&ElementFingerprint::resource_id("org.torproject.android:id/btnStart")]
    );
}

#[test]
fn extra_elements_never_break_a_match() {
    let d = home_descriptor();
    let mut elements = vec![
        UiElement::with_text("Orbot"),
        UiElement::with_resource_id("org.torproject.android:id/btnStart"),
    ];
    let base = snapshot_with(elements.clone());
    assert!(is_expected_screen(&base, &d));

    for extra in ["Settings", "About", "Orbot", ""] {
        elements.push(UiElement::with_text(extra).content_desc("noise"));
        let superset = snapshot_with(elements.clone());
        assert!(is_expected_screen(&superset, &d), "extra {:?} broke the match", extra);
    }
}

#[test]
fn empty_required_set_matches_anything() {
    let d = ScreenDescriptor::new(3, "anything");
    assert!(is_expected_screen(&snapshot(&[]), &d));
    assert!(is_expected_screen(&snapshot(&["whatever"]), &d));
}

#[test]
fn fingerprint_attributes_must_all_hold_on_one_element() {
    let fp = ElementFingerprint::content_desc("Orbot notification: Connected to the Tor network")
        .with_text("STOP");

    // Both attributes exist, but on different elements.
    let split = snapshot_with(vec![
        UiElement::with_text("STOP"),
        UiElement::with_text("").content_desc("Orbot notification: Connected to the Tor network"),
    ]);
    assert!(!is_present(&split, &fp));

    let joined = snapshot_with(vec![
        UiElement::with_text("STOP").content_desc("Orbot notification: Connected to the Tor network"),
    ]);
    assert!(is_present(&joined, &fp));
}

#[test]
fn text_match_is_exact() {
    let d = ScreenDescriptor::new(0, "bridges").require(ElementFingerprint::text("Use Bridges "));
    assert!(!is_expected_screen(&snapshot(&["Use Bridges"]), &d));
    assert!(!is_expected_screen(&snapshot(&["use bridges "]), &d));
    assert!(is_expected_screen(&snapshot(&["Use Bridges "]), &d));
}

#[test]
fn index_constraint_is_honoured() {
    let fp = ElementFingerprint::text("OK").with_index(2);
    assert!(is_present(&snapshot_with(vec![UiElement::with_text("OK").index(2)]), &fp));
    assert!(!is_present(&snapshot_with(vec![UiElement::with_text("OK").index(1)]), &fp));
    assert!(!is_present(&snapshot(&["OK"]), &fp));
}

#[test]
fn matching_is_idempotent() {
    let d = home_descriptor();
    let s = snapshot_with(vec![
        UiElement::with_text("Orbot"),
        UiElement::with_resource_id("org.torproject.android:id/btnStart"),
    ]);
    let first = is_expected_screen(&s, &d);
    let second = is_expected_screen(&s, &d);
    assert_eq!(first, second);
    assert_eq!(observe(&s, &d), observe(&s, &d));
}

// ============================================================================
// match_any
// ============================================================================

fn overlapping_graph() -> ScriptGraph {
    let mut graph = ScriptGraph::new();
    graph
        .add_screen(ScreenDescriptor::new(0, "a").require(ElementFingerprint::text("Orbot")))
        .expect("a");
    graph
        .add_screen(
            ScreenDescriptor::new(1, "b")
                .require(ElementFingerprint::text("Orbot"))
                .require(ElementFingerprint::text("STOP")),
        )
        .expect("b");
    graph
}

#[test]
fn match_any_prefers_earlier_listed_id() {
    let graph = overlapping_graph();
    let s = snapshot(&["Orbot", "STOP"]);

    assert_eq!(match_any(&s, &[S0, S1], &graph), Some(S0));
    assert_eq!(match_any(&s, &[S1, S0], &graph), Some(S1));
}

#[test]
fn match_any_returns_none_without_error() {
    let graph = overlapping_graph();
    assert_eq!(match_any(&snapshot(&["Home"]), &[S0, S1], &graph), None);
    assert_eq!(match_any(&snapshot(&["Orbot"]), &[], &graph), None);
}

#[test]
fn match_any_skips_unknown_ids() {
    let graph = overlapping_graph();
    let s = snapshot(&["Orbot", "STOP"]);
    assert_eq!(match_any(&s, &[ScreenId(42), S1], &graph), Some(S1));
}

// ============================================================================
// Real dumps
// ============================================================================

#[test]
fn orbot_dumps_match_their_screens() {
    let graph = orbot::OrbotScript.build_graph().expect("orbot graph");
    let home = DeviceSnapshot::from_xml(&fixture("orbot_home.xml")).expect("home dump");
    let connected = DeviceSnapshot::from_xml(&fixture("orbot_connected.xml")).expect("connected dump");

    assert_eq!(match_any(&home, &[orbot::CONNECTED, orbot::HOME], &graph), Some(orbot::HOME));
    assert_eq!(
        match_any(&connected, &[orbot::CONNECTED, orbot::HOME], &graph),
        Some(orbot::CONNECTED)
    );

    let d = graph.screen(orbot::HOME).expect("home screen");
    assert!(observe(&home, d).optional.is_empty());
    assert_eq!(observe(&connected, d).optional, vec![orbot::connected_notification()]);
    assert_eq!(
        d.select_actions(&observe(&home, d)),
        vec!["start_tor".to_string(), "app_vpn_settings".to_string()]
    );
    assert_eq!(
        d.select_actions(&observe(&connected, d)),
        vec!["already_connected".to_string()]
    );
}
