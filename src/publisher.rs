//! Publish capabilities for estimation batches.
//!
//! Every sink keeps at most one batch in flight: the bridge awaits each
//! publish before receiving again, and the in-process topic retains only the
//! latest batch for slow subscribers.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use crate::types::EstimationBatch;

#[allow(async_fn_in_trait)]
pub trait Publish {
    async fn publish(&mut self, topic: &str, batch: &EstimationBatch) -> Result<()>;
}

/// In-process topic with history depth 1. Subscribers that fall behind see
/// only the most recent batch.
pub struct LatestPublisher {
    tx: watch::Sender<Option<EstimationBatch>>,
}

impl LatestPublisher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<EstimationBatch>> {
        self.tx.subscribe()
    }
}

impl Default for LatestPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publish for LatestPublisher {
    async fn publish(&mut self, _topic: &str, batch: &EstimationBatch) -> Result<()> {
        self.tx.send_replace(Some(batch.clone()));
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    topic: &'a str,
    batch: &'a EstimationBatch,
}

/// Writes one JSON object per batch, newline terminated.
pub struct JsonLinesPublisher<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Publish for JsonLinesPublisher<W> {
    async fn publish(&mut self, topic: &str, batch: &EstimationBatch) -> Result<()> {
        serde_json::to_writer(&mut self.out, &Envelope { topic, batch })?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// POSTs each batch as JSON to `endpoint.join(topic)`. Give the endpoint a
/// trailing slash so the topic is appended rather than replacing the last
/// path segment.
///
/// Every request is bounded by `timeout`, so an endpoint that stops
/// answering costs one window per batch instead of stalling the loop.
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPublisher {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;
        Ok(Self { client, endpoint })
    }

    pub fn topic_url(&self, topic: &str) -> Result<Url> {
        self.endpoint
            .join(topic)
            .with_context(|| format!("Invalid topic {:?} for endpoint {}", topic, self.endpoint))
    }
}

impl Publish for HttpPublisher {
    async fn publish(&mut self, topic: &str, batch: &EstimationBatch) -> Result<()> {
        let url = self.topic_url(topic)?;
        self.client
            .post(url.clone())
            .json(batch)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?;
        Ok(())
    }
}

/// The publish capability selected at startup.
pub enum Sink {
    Stdout(JsonLinesPublisher<std::io::Stdout>),
    Http(HttpPublisher),
    Discard,
}

impl Publish for Sink {
    async fn publish(&mut self, topic: &str, batch: &EstimationBatch) -> Result<()> {
        match self {
            Sink::Stdout(p) => p.publish(topic, batch).await,
            Sink::Http(p) => p.publish(topic, batch).await,
            Sink::Discard => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Header, Point32, TargetEstimation};
    use chrono::Utc;
    use tokio::net::TcpListener;

    fn batch(seq: u32, ids: &[i32]) -> EstimationBatch {
        let estimations: Vec<TargetEstimation> = ids
            .iter()
            .map(|&identity| TargetEstimation {
                identity,
                position: Point32::planar(identity as f32, 0.0),
                ..Default::default()
            })
            .collect();
        EstimationBatch::assemble(
            Header {
                seq,
                stamp: Utc::now(),
                frame_id: "map".to_string(),
            },
            &estimations,
        )
    }

    #[tokio::test]
    async fn test_latest_publisher_keeps_only_newest() {
        let mut publisher = LatestPublisher::new();
        let mut rx = publisher.subscribe();
        assert!(rx.borrow().is_none());

        publisher.publish("t", &batch(0, &[1])).await.unwrap();
        publisher.publish("t", &batch(1, &[2, 3])).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.header.seq, 1);
        assert_eq!(seen.identities, vec![2, 3]);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_json_lines_envelope() {
        let mut publisher = JsonLinesPublisher::new(Vec::new());
        publisher.publish("targetEstimations", &batch(4, &[7])).await.unwrap();
        publisher.publish("targetEstimations", &batch(5, &[])).await.unwrap();

        let out = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["topic"], "targetEstimations");
        assert_eq!(first["batch"]["header"]["seq"], 4);
        assert_eq!(first["batch"]["identities"][0], 7);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        let second: EstimationBatch = serde_json::from_value(second["batch"].clone()).unwrap();
        assert_eq!(second.header.seq, 5);
        assert!(second.is_empty());
    }

    #[test]
    fn test_http_topic_url() {
        let publisher = HttpPublisher::new(
            Url::parse("http://localhost:8080/topics/").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            publisher.topic_url("targetEstimations").unwrap().as_str(),
            "http://localhost:8080/topics/targetEstimations"
        );
    }

    #[tokio::test]
    async fn test_http_publish_gives_up_on_silent_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // accept and hold the connection without ever answering
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let endpoint = Url::parse(&format!("http://{}/topics/", addr)).unwrap();
        let mut publisher = HttpPublisher::new(endpoint, Duration::from_millis(200)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            publisher.publish("targetEstimations", &batch(0, &[1])),
        )
        .await
        .expect("http publish did not return within its timeout");

        assert!(result.is_err());
        server.abort();
    }
}
