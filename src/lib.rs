//! Bridge from tracker UDP telemetry to a pub/sub topic.
//!
//! Tracker agents send `;`-separated text records over UDP. Each datagram is
//! decoded into target estimations and republished as one
//! [`EstimationBatch`](types::EstimationBatch), including when it carries no
//! targets, so subscribers get a steady heartbeat.

pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod protocol;
pub mod publisher;
pub mod receiver;
pub mod recorder;
pub mod types;
