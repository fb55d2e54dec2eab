//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::surface::SurfaceConfig;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "irrigation-console")]
#[command(about = "Live control surface for a networked irrigation controller")]
#[command(version)]
pub struct Config {
    /// Base URL of the irrigation controller
    #[arg(long, default_value = "http://192.168.4.1")]
    pub controller_url: String,

    /// Interval between status polls in milliseconds
    #[arg(long, default_value = "3000")]
    pub poll_interval_ms: u64,

    /// Timeout for a single controller request in seconds
    #[arg(long, default_value = "5")]
    pub request_timeout_secs: u64,

    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

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

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Poll cadence handed to the surface; zero falls back to one second
    pub fn surface(&self) -> SurfaceConfig {
        SurfaceConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1_000)),
        }
    }
}
