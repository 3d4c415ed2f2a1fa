//! Receive, decode, publish loop.
//!
//! One task runs the whole cycle in order. The receive is the only await
//! point that waits on the network, and its timeout follows a two-valued
//! policy: poll every 200 ms while targets are being tracked, block
//! indefinitely while nothing is.

use std::borrow::Cow;
use std::fs::File;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;

use crate::error::BridgeError;
use crate::protocol::decode_payload;
use crate::publisher::Publish;
use crate::receiver::{Received, UdpReceiver};
use crate::recorder::Recorder;
use crate::types::{EstimationBatch, Header};

/// Receive window while targets are being tracked.
pub const ACTIVE_POLL: Duration = Duration::from_millis(200);

/// Receive window before the first batch has been published.
pub const STARTUP_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveTimeout {
    current: Option<Duration>,
}

impl AdaptiveTimeout {
    pub fn new() -> Self {
        Self {
            current: Some(STARTUP_POLL),
        }
    }

    /// `None` means wait indefinitely.
    pub fn current(&self) -> Option<Duration> {
        self.current
    }

    pub fn after_publish(&mut self, published: usize) {
        self.current = if published > 0 { Some(ACTIVE_POLL) } else { None };
    }
}

impl Default for AdaptiveTimeout {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch sequence number. Starts at 0 and only moves forward for the life
/// of the bridge.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next: u32,
}

impl SequenceCounter {
    pub fn advance(&mut self) -> u32 {
        let seq = self.next;
        self.next = self.next.wrapping_add(1);
        seq
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}

#[derive(Debug)]
pub enum StepOutcome {
    Published {
        seq: u32,
        count: usize,
        degraded: usize,
    },
    TimedOut,
    TransportError(BridgeError),
}

pub struct TrackingBridge<P: Publish> {
    receiver: UdpReceiver,
    publisher: P,
    recorder: Option<Recorder<File>>,
    topic: String,
    frame_id: String,
    sequence: SequenceCounter,
    timeout: AdaptiveTimeout,
}

impl<P: Publish> TrackingBridge<P> {
    pub fn new(receiver: UdpReceiver, publisher: P, topic: impl Into<String>) -> Self {
        Self {
            receiver,
            publisher,
            recorder: None,
            topic: topic.into(),
            frame_id: String::new(),
            sequence: SequenceCounter::default(),
            timeout: AdaptiveTimeout::new(),
        }
    }

    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    pub fn with_recorder(mut self, recorder: Recorder<File>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.receiver.local_addr()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.current()
    }

    /// Sequence number the next batch will carry.
    pub fn next_seq(&self) -> u32 {
        self.sequence.peek()
    }

    /// Runs a single receive-decode-publish cycle.
    pub async fn step(&mut self) -> StepOutcome {
        let datagram = match self.receiver.receive(self.timeout.current()).await {
            Ok(Received::Datagram(datagram)) => datagram,
            Ok(Received::TimedOut) => {
                log::trace!("No data within {:?}", self.timeout.current());
                return StepOutcome::TimedOut;
            }
            Err(e) => {
                log::error!("{}", e);
                return StepOutcome::TransportError(e);
            }
        };

        let text = String::from_utf8_lossy(&datagram.payload);
        if matches!(text, Cow::Owned(_)) {
            log::warn!("Non UTF-8 bytes in payload from {}", datagram.sender);
        }
        log::trace!("Payload from {}: {:?}", datagram.sender, text);

        let report = decode_payload(&text);
        if report.degraded > 0 {
            log::warn!(
                "{} of {} records from {} were incomplete, missing fields set to 0",
                report.degraded,
                report.estimations.len(),
                datagram.sender
            );
        }

        let header = Header {
            seq: self.sequence.advance(),
            stamp: Utc::now(),
            frame_id: self.frame_id.clone(),
        };
        let batch = EstimationBatch::assemble(header, &report.estimations);
        let seq = batch.header.seq;

        if let Err(cause) = self.publisher.publish(&self.topic, &batch).await {
            let err = BridgeError::Publish {
                topic: self.topic.clone(),
                seq,
                cause,
            };
            log::error!("{}", err);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(&batch) {
                log::error!("Failed to record batch {}: {:#}", seq, e);
            }
        }

        log::debug!(
            "Published batch {} with {} targets from {}",
            seq,
            batch.len(),
            datagram.sender
        );

        self.timeout.after_publish(batch.len());

        StepOutcome::Published {
            seq,
            count: batch.len(),
            degraded: report.degraded,
        }
    }

    /// Loops until `shutdown` resolves. An in-flight cycle is dropped, not
    /// drained.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.step() => {}
            }
        }
    }
}
