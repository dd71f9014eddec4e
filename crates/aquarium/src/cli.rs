//! Clap derive structures for the `aquarium` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use aquarium_core::Actuator;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// aquarium -- remote control for a networked aquarium controller
#[derive(Debug, Parser)]
#[command(
    name = "aquarium",
    version,
    about = "Monitor and control an aquarium controller from the command line",
    long_about = "Reads tank telemetry over HTTP and the device's WebSocket push channel,\n\
        switches actuators, and submits feeding and water-change schedules.",
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
    /// Device profile to use
    #[arg(long, short = 'p', env = "AQUARIUM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device host or IP, optionally with an HTTP port (overrides profile)
    #[arg(long, short = 'a', env = "AQUARIUM_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "AQUARIUM_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Per-request timeout in seconds (overrides profile)
    #[arg(long, env = "AQUARIUM_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Fetch one reading and print the tank status
    #[command(alias = "st")]
    Status,

    /// Live view with interactive line commands on stdin
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Switch an actuator (light, fill, empty, dispenser)
    #[command(alias = "act")]
    Actuator(ActuatorArgs),

    /// Submit feeding time or water-change interval
    #[command(alias = "sched")]
    Schedule(ScheduleArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Do not read line commands from stdin
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwitchAction {
    On,
    Off,
    /// Flip the locally tracked state (starts off in a fresh process)
    Toggle,
}

#[derive(Debug, Args)]
pub struct ActuatorArgs {
    /// Actuator name (light, fill/pump, empty/drain, dispenser/feeder)
    pub actuator: Actuator,

    /// Desired action
    pub action: SwitchAction,

    /// How long to wait for the push channel to connect
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub wait: Duration,
}

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommand,

    /// How long to wait for the push channel to connect
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration, global = true)]
    pub wait: Duration,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Daily feeding time as HH:MM
    FeedingTime {
        /// Time of day, e.g. 08:30
        time: String,
    },

    /// Water-change interval in whole hours
    #[command(alias = "water-change-interval")]
    WaterChange {
        /// Interval in hours, e.g. 24
        hours: String,
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
    /// Write a profile for a device to the config file
    Init {
        /// Device host or IP, optionally with an HTTP port
        #[arg(long)]
        device: String,

        /// WebSocket port on the device
        #[arg(long)]
        push_port: Option<u16>,

        /// Disable the push channel for this profile
        #[arg(long)]
        pull_only: bool,

        /// Replace an existing profile of the same name
        #[arg(long)]
        force: bool,
    },

    /// Show the resolved configuration
    Show,

    /// Change the device address of the active profile
    SetAddress {
        /// New device host or IP, optionally with an HTTP port
        #[arg(value_name = "ADDRESS")]
        new_address: String,
    },

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
