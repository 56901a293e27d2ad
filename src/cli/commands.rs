use std::path::Path;

use tracing::info;

use crate::apps::{
    app_script::AppScript,
    registry::{find_script, known_apps},
};
use crate::cli::config::{DeviceSettings, ScriptArgs};
use crate::device::{
    adb::AdbProbe, connection::DeviceConnection, probe::DeviceProbe, snapshot::DeviceSnapshot,
};
use crate::export::diagnostics::FsExporter;
use crate::graph::{script_file::ScriptFile, script_graph::ScriptGraph};
use crate::navigation::{
    cancel::CancelToken,
    context::RunContext,
    engine::{Navigator, RetryPolicy},
};
use crate::report::console::{format_graph, format_run_report};
use crate::report::report_model::RunReport;
use crate::screen::screen_model::ScreenId;
use crate::trace::logger::TraceLogger;
use crate::verification::matcher::{match_any, missing_required};

/// Settings for the `run` subcommand after CLI/config resolution.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub from: Vec<u32>,
    pub to: Vec<u32>,
    pub policy: RetryPolicy,
    pub trace: Option<String>,
    pub export_dir: String,
    pub skip_version_check: bool,
}

// ============================================================================
// run subcommand
// ============================================================================

/// Check the device, then navigate. Returns whether a target was reached.
pub fn cmd_run(
    device: &DeviceSettings,
    script_args: &ScriptArgs,
    options: &RunOptions,
    cancel: CancelToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let script = load_script(script_args)?;
    let app = script.metadata();
    let graph = script.build_graph()?;

    let mut probe = adb_probe(device);
    let connection = DeviceConnection::new(&probe);
    let serial = connection.assert_phone_is_connected()?;
    if options.skip_version_check {
        connection.assert_app_is_installed(&app.package_name)?;
    } else {
        connection.assert_app_version(&app.package_name, &app.version)?;
    }
    // Pin the probe to the verified device.
    probe = AdbProbe::new(&device.adb, Some(&serial)).with_timeout(device.command_timeout);

    let exporter = FsExporter::new(&options.export_dir);
    let tracer = match &options.trace {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    let navigator = Navigator::new(&graph, &app, &exporter)
        .with_policy(options.policy)
        .with_tracer(&tracer)
        .with_cancel_token(cancel);

    let current = ids_or(&options.from, graph.start_nodes());
    let targets = ids_or(&options.to, graph.end_nodes());

    info!(app = %app.title, serial = %serial, "starting run");
    let start = std::time::Instant::now();
    let mut ctx = RunContext::new(&graph);
    let result = if options.from.is_empty() && options.to.is_empty() {
        navigator.run(&mut ctx, &mut probe)
    } else {
        navigator.advance_with(&mut ctx, &mut probe, &current, &targets)
    };

    let report = RunReport::from_run(&app, &ctx, &result).with_duration(start.elapsed().as_millis());
    print!("{}", format_run_report(&report, &graph));

    if let Err(e) = &result {
        if e.is_fatal_device_error() {
            eprintln!("device lost: {}", e);
        }
    }
    Ok(report.succeeded())
}

// ============================================================================
// verify subcommand
// ============================================================================

/// Match an XML dump against the script's screens. Returns whether one matched.
pub fn cmd_verify(
    script_args: &ScriptArgs,
    dump: &str,
    screens: &[u32],
) -> Result<bool, Box<dyn std::error::Error>> {
    let script = load_script(script_args)?;
    let graph = script.build_graph()?;

    let xml = std::fs::read_to_string(dump)?;
    let snapshot = DeviceSnapshot::from_xml(&xml)?;
    let candidates = ids_or(screens, graph.screens().map(|n| n.descriptor.id).collect());

    let matched = verify_snapshot(&graph, &snapshot, &candidates);
    print!("{}", matched.report);
    Ok(matched.screen.is_some())
}

/// Outcome of checking one snapshot against candidate screens.
pub struct VerifyResult {
    pub screen: Option<ScreenId>,
    pub report: String,
}

/// First matching candidate plus a per-screen listing of missing fingerprints.
pub fn verify_snapshot(graph: &ScriptGraph, snapshot: &DeviceSnapshot, candidates: &[ScreenId]) -> VerifyResult {
    let screen = match_any(snapshot, candidates, graph);
    let mut report = String::new();

    report.push_str(&format!(
        "snapshot {} ({} elements)\n",
        &snapshot.digest()[..12],
        snapshot.len()
    ));
    for id in candidates {
        let Some(descriptor) = graph.screen(*id) else {
            report.push_str(&format!("  ? {} unknown screen\n", id));
            continue;
        };
        let missing = missing_required(snapshot, descriptor);
        if missing.is_empty() {
            report.push_str(&format!("  \u{2713} {}\n", descriptor));
        } else {
            report.push_str(&format!("  \u{2717} {}\n", descriptor));
            for fp in missing {
                report.push_str(&format!("      missing {}\n", fp));
            }
        }
    }

    match screen.and_then(|id| graph.screen(id)) {
        Some(d) => report.push_str(&format!("matched {}\n", d)),
        None => report.push_str("no screen matched\n"),
    }

    VerifyResult { screen, report }
}

// ============================================================================
// capture subcommand
// ============================================================================

pub fn cmd_capture(
    device: &DeviceSettings,
    script_args: &ScriptArgs,
    export_dir: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = load_script(script_args)?;
    let app = script.metadata();
    let graph = script.build_graph()?;

    let mut probe = adb_probe(device);
    DeviceConnection::new(&probe).assert_phone_is_connected()?;
    let snapshot = probe.capture()?;

    let exporter = FsExporter::new(export_dir);
    let path = exporter.export_capture(&app, &snapshot)?;
    println!("Captured {} elements to {}", snapshot.len(), path.display());

    let all: Vec<ScreenId> = graph.screens().map(|n| n.descriptor.id).collect();
    match match_any(&snapshot, &all, &graph).and_then(|id| graph.screen(id)) {
        Some(d) => println!("Current screen: {}", d),
        None => println!("Current screen matches no screen of {}", app.title),
    }
    Ok(())
}

// ============================================================================
// graph subcommand
// ============================================================================

pub fn cmd_graph(script_args: &ScriptArgs) -> Result<(), Box<dyn std::error::Error>> {
    let script = load_script(script_args)?;
    let app = script.metadata();
    let graph = script.build_graph()?;

    println!("{} ({} {})", app.title, app.package_name, app.version);
    print!("{}", format_graph(&graph));
    Ok(())
}

// ============================================================================
// devices subcommand
// ============================================================================

pub fn cmd_devices(device: &DeviceSettings) -> Result<(), Box<dyn std::error::Error>> {
    let probe = adb_probe(device);
    let devices = DeviceConnection::new(&probe).devices()?;

    if devices.is_empty() {
        println!("No devices attached");
    }
    for d in &devices {
        println!("{}\t{}", d.serial, d.state);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the script named on the command line: a YAML file, or a
/// built-in script by package (and optional version).
pub fn load_script(args: &ScriptArgs) -> Result<Box<dyn AppScript>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.script {
        let file = ScriptFile::load(Path::new(path))?;
        return Ok(Box::new(file));
    }

    let package = args.app.as_deref().ok_or("pass --app or --script")?;
    find_script(package, args.app_version.as_deref()).ok_or_else(|| {
        let known: Vec<String> = known_apps()
            .into_iter()
            .map(|(p, v)| format!("{} {}", p, v))
            .collect();
        format!(
            "no built-in script for {} (known: {})",
            package,
            known.join(", ")
        )
        .into()
    })
}

fn adb_probe(device: &DeviceSettings) -> AdbProbe {
    AdbProbe::new(&device.adb, device.serial.as_deref()).with_timeout(device.command_timeout)
}

fn ids_or(ids: &[u32], fallback: Vec<ScreenId>) -> Vec<ScreenId> {
    if ids.is_empty() {
        fallback
    } else {
        ids.iter().copied().map(ScreenId).collect()
    }
}
