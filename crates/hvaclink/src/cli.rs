//! Clap derive structures for the `hvaclink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use hvaclink_core::{LockKind, RunMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hvaclink -- control HVAC indoor units from the command line
#[derive(Debug, Parser)]
#[command(
    name = "hvaclink",
    version,
    about = "Control HVAC indoor units from the command line",
    long_about = "List, watch and control indoor units through an HVAC control backend.\n\n\
        One-shot commands talk to the REST control API; `watch` and `weather`\n\
        also open the realtime channels and follow pushed updates.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "HVACLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Control API base URL (overrides profile)
    #[arg(long, short = 'a', env = "HVACLINK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Device realtime channel URL, ws:// or wss:// (overrides profile)
    #[arg(long, env = "HVACLINK_REALTIME_URL", global = true)]
    pub realtime_url: Option<String>,

    /// Bearer token for the control API
    #[arg(long, env = "HVACLINK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HVACLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "HVACLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HVACLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, inspect and control indoor units
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Operations on every device at once
    Fleet(FleetArgs),

    /// Browse the device state history log
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Show the realtime weather report
    Weather(WeatherArgs),

    /// Follow realtime device updates and notifications
    Watch(WatchArgs),

    /// Query the manufacturer gateway directly
    Vendor(VendorArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Only show devices whose serial or name contains this text
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Show one device
    Get {
        /// Device serial number
        serial: String,
    },

    /// Toggle a device's power
    Power {
        serial: String,
    },

    /// Set the operating mode (fan, cool, heat, dry, auto, or a numeric code)
    Mode {
        serial: String,
        mode: RunMode,
    },

    /// Set the target temperature in °C (clamped to 16..=30)
    #[command(alias = "temp")]
    Temperature {
        serial: String,
        #[arg(allow_negative_numbers = true)]
        celsius: i64,
    },

    /// Set the fan speed level (clamped to 0..=6)
    Fan {
        serial: String,
        level: i64,
    },

    /// Engage or release one of a device's locks
    Lock {
        serial: String,
        /// min-temp, max-temp, mode, on-off, fan-speed, remote, wired-control
        lock: LockKind,
        action: LockAction,
    },

    /// Register a new device with the backend
    Create {
        /// Device serial number
        serial: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Device type reported to the backend
        #[arg(long = "type", default_value = "idu")]
        device_type: String,
    },

    /// Remove a device from the backend
    #[command(alias = "rm")]
    Delete {
        serial: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LockAction {
    Lock,
    Unlock,
}

// ── Fleet ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FleetArgs {
    #[command(subcommand)]
    pub command: FleetCommand,
}

#[derive(Debug, Subcommand)]
pub enum FleetCommand {
    /// Switch every device on or off
    Power { state: PowerState },

    /// Release every lock on every device
    UnlockAll,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

// ── History ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Filter by device serial or name
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// Page to fetch
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Keep fetching until the last page
    #[arg(long)]
    pub all: bool,
}

// ── Weather ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WeatherArgs {
    /// Weather channel URL, ws:// or wss:// (overrides profile)
    #[arg(long, env = "HVACLINK_WEATHER_URL")]
    pub weather_url: Option<String>,

    /// City name to query
    #[arg(long)]
    pub city: Option<String>,

    /// Latitude, used together with --lon
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude, used together with --lat
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Seconds to wait for the first report
    #[arg(long, default_value = "10")]
    pub wait: u64,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Search filter sent with snapshot requests (overrides profile)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long = "for", value_name = "SECS")]
    pub duration: Option<u64>,

    /// Reconnect dropped channels with backoff
    #[arg(long)]
    pub reconnect: bool,

    /// Print only notifications, not the device table on each change
    #[arg(long)]
    pub events_only: bool,
}

// ── Vendor ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VendorArgs {
    /// Gateway base URL (overrides profile)
    #[arg(long, env = "HVACLINK_VENDOR_URL")]
    pub vendor_url: Option<String>,

    /// Gateway `sign` token (overrides profile)
    #[arg(long, env = "HVACLINK_SIGN_TOKEN", hide_env = true)]
    pub sign_token: Option<String>,

    #[command(subcommand)]
    pub command: VendorCommand,
}

#[derive(Debug, Subcommand)]
pub enum VendorCommand {
    /// List the indoor units the gateway knows
    #[command(alias = "ls")]
    Units,

    /// Show live properties of indoor units (all listed units if none given)
    #[command(alias = "props")]
    Properties {
        /// Device serial numbers
        serials: Vec<String>,
    },

    /// Apply fan and heat power levels to a group of units
    Group {
        /// Device serial numbers
        #[arg(required = true)]
        serials: Vec<String>,

        /// Fan power level
        #[arg(long, default_value = "0")]
        fan_power: i64,

        /// Heat power level
        #[arg(long, default_value = "0")]
        heat_power: i64,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
        /// Control API base URL
        #[arg(long)]
        api_url: String,
        /// Device realtime channel URL
        #[arg(long)]
        realtime_url: Option<String>,
        /// Weather channel URL
        #[arg(long)]
        weather_url: Option<String>,
        /// Manufacturer gateway URL
        #[arg(long)]
        vendor_url: Option<String>,
        /// Environment variable holding the bearer token
        #[arg(long)]
        token_env: Option<String>,
    },

    /// Show the current configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a profile value
    Set {
        /// Key to set
        key: String,
        /// New value
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
