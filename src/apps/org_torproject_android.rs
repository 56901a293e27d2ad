use crate::apps::app_script::{AppMetadata, AppScript};
use crate::graph::{error::GraphError, script_graph::ScriptGraph};
use crate::screen::{
    actions::{ActionList, ActionTable, UiAction},
    fingerprint::ElementFingerprint,
    screen_model::{ScreenDescriptor, ScreenId},
};

pub const PACKAGE_NAME: &str = "org.torproject.android";
pub const VERSION: &str = "16.6.3 RC 1";

pub const HOME: ScreenId = ScreenId(0);
pub const CONNECTED: ScreenId = ScreenId(1);

/// Start Orbot and wait until it reports a Tor connection.
///
/// ```text
/// s0 (home) --start_tor---------> s1 (connected)
///           --app_vpn_settings-->
///           --already_connected->
/// ```
///
/// `app_vpn_settings` opens the per-app VPN settings that choose which
/// apps are routed through Tor. It ranks after `start_tor`.
pub struct OrbotScript;

/// The notification button shown once Orbot is connected to Tor.
pub fn connected_notification() -> ElementFingerprint {
    ElementFingerprint::content_desc("Orbot notification: Connected to the Tor network")
        .with_text("STOP")
}

pub fn start_button() -> ElementFingerprint {
    ElementFingerprint::resource_id("org.torproject.android:id/btnStart")
}

pub fn app_vpn_settings_button() -> ElementFingerprint {
    ElementFingerprint::resource_id("org.torproject.android:id/ivAppVpnSettings")
}

fn home_screen() -> ScreenDescriptor {
    ScreenDescriptor::new(HOME.0, "s0")
        .require(ElementFingerprint::text("Global (Auto)"))
        .require(ElementFingerprint::text("Trouble connecting?"))
        .require(ElementFingerprint::text("Use Bridges "))
        .require(ElementFingerprint::text("Orbot"))
        .optionally(connected_notification())
        .with_retries(1, 2)
        .with_actions(
            ActionTable::new(&["start_tor", "app_vpn_settings"])
                .when_present(vec![connected_notification()], &["already_connected"]),
        )
}

fn connected_screen() -> ScreenDescriptor {
    // Bootstrapping a Tor circuit can take a while.
    ScreenDescriptor::new(CONNECTED.0, "s1")
        .require(ElementFingerprint::text("Orbot"))
        .require(connected_notification())
        .with_retries(10, 3)
}

impl AppScript for OrbotScript {
    fn metadata(&self) -> AppMetadata {
        AppMetadata {
            title: "conf_orbot".to_string(),
            package_name: PACKAGE_NAME.to_string(),
            display_name: "Orbot".to_string(),
            version: VERSION.to_string(),
        }
    }

    fn build_graph(&self) -> Result<ScriptGraph, GraphError> {
        let mut graph = ScriptGraph::new();
        graph.add_screen(home_screen())?;
        graph.add_screen(connected_screen())?;

        graph.add_transition(
            HOME,
            CONNECTED,
            vec![
                ActionList::new("start_tor", vec![UiAction::tap(start_button())]),
                ActionList::new(
                    "app_vpn_settings",
                    vec![UiAction::tap(app_vpn_settings_button())],
                ),
                ActionList::empty("already_connected"),
            ],
        )?;

        graph.mark_start(HOME)?;
        graph.mark_end(CONNECTED)?;
        graph.validate()?;
        Ok(graph)
    }
}
