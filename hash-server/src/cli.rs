use std::time::Duration;

use clap::Parser;
use tracing::warn;

use crate::config::{DEFAULT_PORT, MAX_PORT, MIN_PORT, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Delayed SHA-512 hashing server with drain-based shutdown", long_about = None)]
pub struct Cli {
    /// Listen port (allowable range: 1024 - 9000). Invalid values fall back to 8080.
    #[arg(long, default_value = "8080")]
    pub port: String,

    /// Seconds allowed for closing the listener after in-flight requests drain.
    #[arg(long, default_value_t = 30)]
    pub shutdown_timeout: u64,
}

impl Cli {
    /// Builds the server settings, replacing an invalid port with the default.
    pub fn into_settings(self) -> Settings {
        let port = parse_port(&self.port).unwrap_or_else(|| {
            warn!(
                port = %self.port,
                default = DEFAULT_PORT,
                "port is invalid; using the default"
            );
            DEFAULT_PORT
        });

        Settings {
            port,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
            ..Settings::default()
        }
    }
}

/// Parses a port and accepts it only within `[MIN_PORT, MAX_PORT]`.
pub fn parse_port(raw: &str) -> Option<u16> {
    let port = raw.parse::<u16>().ok()?;
    (MIN_PORT..=MAX_PORT).contains(&port).then_some(port)
}
