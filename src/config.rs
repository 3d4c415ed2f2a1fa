use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use url::Url;

use crate::error::ConfigError;

/// Port value launch files use to mean "not configured".
pub const UNSET_PORT: i64 = -1;

pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// One JSON object per batch on stdout
    Stdout,
    /// POST each batch to <endpoint>/<topic>
    Http,
    /// Discard batches (decode and record only)
    None,
}

/// Republishes tracker UDP telemetry as estimation batches.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Local UDP port the tracker agent sends to
    #[arg(long, env = "AGENT_PORT", allow_negative_numbers = true)]
    pub agent_port: Option<i64>,

    /// Local interface to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_address: IpAddr,

    /// Topic the batches are published on
    #[arg(long, default_value = "targetEstimations")]
    pub topic: String,

    #[arg(long, value_enum, default_value_t = SinkKind::Stdout)]
    pub sink: SinkKind,

    /// Base URL for the http sink
    #[arg(long)]
    pub endpoint: Option<Url>,

    /// Give up on an http publish after this many milliseconds
    #[arg(long, default_value_t = DEFAULT_PUBLISH_TIMEOUT_MS)]
    pub publish_timeout_ms: u64,

    /// Append every published estimation to this CSV file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Frame id stamped into each batch header
    #[arg(long, default_value = "")]
    pub frame_id: String,
}

/// Resolved publish target.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkConfig {
    Stdout,
    Http { endpoint: Url, timeout: Duration },
    Discard,
}

/// Validated settings, produced before any socket is touched.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub topic: String,
    pub sink: SinkConfig,
    pub record: Option<PathBuf>,
    pub frame_id: String,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let port = validate_port(args.agent_port)?;

        let sink = match args.sink {
            SinkKind::Stdout => SinkConfig::Stdout,
            SinkKind::Http => SinkConfig::Http {
                endpoint: args.endpoint.ok_or(ConfigError::MissingEndpoint)?,
                timeout: Duration::from_millis(args.publish_timeout_ms),
            },
            SinkKind::None => SinkConfig::Discard,
        };

        Ok(Self {
            bind_addr: SocketAddr::new(args.bind_address, port),
            topic: args.topic,
            sink,
            record: args.record,
            frame_id: args.frame_id,
        })
    }
}

pub fn validate_port(port: Option<i64>) -> Result<u16, ConfigError> {
    match port {
        None | Some(UNSET_PORT) => Err(ConfigError::AgentPortUnset),
        Some(p) => match u16::try_from(p) {
            Ok(p) if p != 0 => Ok(p),
            _ => Err(ConfigError::InvalidPort(p)),
        },
    }
}
