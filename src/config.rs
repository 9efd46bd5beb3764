//! Configuration and CLI argument handling

use std::time::Duration;
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "countdown-server")]
#[command(about = "Runs one pausable countdown and exposes pause/resume/cancel over HTTP")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Total countdown duration in milliseconds
    #[arg(short, long = "duration-ms", default_value = "60000")]
    pub duration_ms: u64,

    /// Interval between ticks in milliseconds
    #[arg(short, long = "interval-ms", default_value = "1000")]
    pub interval_ms: u64,

    /// Create the countdown paused instead of starting it right away
    #[arg(long)]
    pub paused: bool,

    /// Shut the server down once the countdown finishes
    #[arg(long)]
    pub exit_on_finish: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn auto_start(&self) -> bool {
        !self.paused
    }
}
