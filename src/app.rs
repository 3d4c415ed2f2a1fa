//! Startup and shutdown of the bridge process.

use std::future::Future;

use anyhow::Result;

use crate::bridge::TrackingBridge;
use crate::config::{Args, Config, SinkConfig};
use crate::publisher::{HttpPublisher, JsonLinesPublisher, Sink};
use crate::receiver::UdpReceiver;
use crate::recorder::Recorder;

/// Process status for a finished run: 0 after a clean shutdown, 1 for a
/// configuration or bind failure.
pub fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn build_sink(sink: &SinkConfig) -> Result<Sink> {
    Ok(match sink {
        SinkConfig::Stdout => Sink::Stdout(JsonLinesPublisher::new(std::io::stdout())),
        SinkConfig::Http { endpoint, timeout } => {
            Sink::Http(HttpPublisher::new(endpoint.clone(), *timeout)?)
        }
        SinkConfig::Discard => Sink::Discard,
    })
}

/// Resolves when the operator interrupts the process.
pub async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Caught Ctrl+C. Exiting..."),
        Err(e) => {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Validates `args`, binds, and bridges until `shutdown` resolves.
pub async fn run<F: Future<Output = ()>>(args: Args, shutdown: F) -> Result<()> {
    let config = Config::from_args(args)?;

    let receiver = UdpReceiver::bind(config.bind_addr).await?;
    log::info!("Tracking bridge bound on: {}", receiver.local_addr()?);

    let sink = build_sink(&config.sink)?;
    log::info!("Publishing on {} via {:?}", config.topic, config.sink);

    let mut bridge =
        TrackingBridge::new(receiver, sink, config.topic.clone()).with_frame_id(config.frame_id);
    if let Some(path) = &config.record {
        bridge = bridge.with_recorder(Recorder::create(path)?);
        log::info!("Recording estimations to {}", path.display());
    }

    bridge.run_until(shutdown).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, ConfigError};
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tracking_bridge").chain(argv.iter().copied()))
            .unwrap()
    }

    fn free_port() -> u16 {
        std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn test_unset_port_fails_before_binding() {
        let result = run(args(&["--agent-port", "-1", "--sink", "none"]), async {}).await;

        assert_eq!(exit_status(&result), 1);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::AgentPortUnset)
        ));
    }

    #[tokio::test]
    async fn test_bind_failure_exits_nonzero() {
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port().to_string();

        let argv = [
            "--agent-port",
            port.as_str(),
            "--bind-address",
            "127.0.0.1",
            "--sink",
            "none",
        ];
        let result = run(args(&argv), async {}).await;

        assert_eq!(exit_status(&result), 1);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<BridgeError>(),
            Some(BridgeError::Bind { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_exits_cleanly() {
        let port = free_port().to_string();

        let argv = [
            "--agent-port",
            port.as_str(),
            "--bind-address",
            "127.0.0.1",
            "--sink",
            "none",
        ];
        let result = run(args(&argv), async {}).await;

        assert!(result.is_ok());
        assert_eq!(exit_status(&result), 0);
    }
}
