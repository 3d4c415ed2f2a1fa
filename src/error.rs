//! Error types for the tracking bridge

use std::net::SocketAddr;

/// Startup configuration problems. These need an operator to fix the
/// launch configuration, so they are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Agent port not set, please provide --agent-port or AGENT_PORT")]
    AgentPortUnset,

    #[error("Invalid agent port {0}: expected 1-65535")]
    InvalidPort(i64),

    #[error("The http sink requires --endpoint")]
    MissingEndpoint,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Error during the binding operation on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Error in receiving message from: {}: {cause}", sender_label(.sender))]
    Receive {
        sender: Option<SocketAddr>,
        cause: std::io::Error,
    },

    #[error("Failed to publish batch {seq} on {topic}: {cause:#}")]
    Publish {
        topic: String,
        seq: u32,
        cause: anyhow::Error,
    },
}

fn sender_label(sender: &Option<SocketAddr>) -> String {
    sender.map_or_else(|| "unknown".to_string(), |addr| addr.to_string())
}
