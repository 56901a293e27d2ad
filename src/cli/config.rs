use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::device::runner::DEFAULT_COMMAND_TIMEOUT;
use crate::navigation::engine::DEFAULT_MAX_TRANSITIONS;

pub const DEFAULT_CONFIG_FILE: &str = "apk-controller.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "apk-controller",
    version,
    about = "Drive an Android app through a verified screen graph"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: apk-controller.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Device serial, required when several devices are attached
    #[arg(short, long, global = true)]
    pub serial: Option<String>,

    /// Path to the adb executable
    #[arg(long, global = true)]
    pub adb: Option<String>,
}

/// Which script to use: a built-in one by package, or a YAML file.
#[derive(Args, Debug, Clone, Default)]
pub struct ScriptArgs {
    /// Package name of a built-in app script
    #[arg(long, required_unless_present = "script")]
    pub app: Option<String>,

    /// App version the script must target
    #[arg(long)]
    pub app_version: Option<String>,

    /// YAML script file
    #[arg(long, conflicts_with = "app")]
    pub script: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check device and app, then navigate from start to end screens
    Run {
        #[command(flatten)]
        script: ScriptArgs,

        /// Screen ids to start from (default: the graph's start screens)
        #[arg(long, value_delimiter = ',')]
        from: Vec<u32>,

        /// Screen ids to reach (default: the graph's end screens)
        #[arg(long, value_delimiter = ',')]
        to: Vec<u32>,

        /// Fail on the first probe that matches no expected screen
        #[arg(long)]
        no_retry: bool,

        /// Maximum executed action lists before giving up
        #[arg(long)]
        max_transitions: Option<usize>,

        /// JSONL trace output path
        #[arg(long)]
        trace: Option<String>,

        /// Root directory for diagnostic exports
        #[arg(long)]
        export_dir: Option<String>,

        /// Skip the installed-version check
        #[arg(long)]
        skip_version_check: bool,
    },

    /// Report which screen a uiautomator XML dump matches (offline)
    Verify {
        #[command(flatten)]
        script: ScriptArgs,

        /// uiautomator XML dump
        #[arg(long)]
        dump: String,

        /// Screen ids to check, in priority order (default: all screens)
        #[arg(long, value_delimiter = ',')]
        screens: Vec<u32>,
    },

    /// Export the device's current screen
    Capture {
        #[command(flatten)]
        script: ScriptArgs,

        /// Root directory for exports
        #[arg(long)]
        export_dir: Option<String>,
    },

    /// Print the screens and transitions of a script
    Graph {
        #[command(flatten)]
        script: ScriptArgs,
    },

    /// List attached devices
    Devices,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `apk-controller.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb")]
    pub adb: String,

    pub serial: Option<String>,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb: default_adb(),
            serial: None,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_true")]
    pub retry: bool,

    #[serde(default = "default_max_transitions")]
    pub max_transitions: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            retry: true,
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }
}

// Serde default helpers
fn default_adb() -> String { "adb".to_string() }
fn default_command_timeout() -> u64 { DEFAULT_COMMAND_TIMEOUT.as_secs() }
fn default_export_dir() -> String { "exports".to_string() }
fn default_true() -> bool { true }
fn default_max_transitions() -> usize { DEFAULT_MAX_TRANSITIONS }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> AppConfig {
    match serde_yaml::from_str(content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed config file");
            AppConfig::default()
        }
    }
}

// ============================================================================
// Resolved settings (CLI > config > defaults)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub adb: String,
    pub serial: Option<String>,
    pub command_timeout: std::time::Duration,
}

pub fn resolve_device(cli: &Cli, config: &AppConfig) -> DeviceSettings {
    DeviceSettings {
        adb: cli.adb.clone().unwrap_or_else(|| config.device.adb.clone()),
        serial: cli.serial.clone().or_else(|| config.device.serial.clone()),
        command_timeout: std::time::Duration::from_secs(config.device.command_timeout_secs),
    }
}
