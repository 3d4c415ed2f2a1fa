use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::types::EstimationBatch;

/// One CSV row per published estimation.
#[derive(Debug, Serialize)]
struct EstimationRow {
    seq: u32,
    stamp: String,
    identity: i32,
    x: f32,
    y: f32,
    std_dev_x: f32,
    std_dev_y: f32,
    width: i32,
    height: i32,
    vel_x: f32,
    vel_y: f32,
    avg_vel_x: f32,
    avg_vel_y: f32,
}

pub struct Recorder<W: Write> {
    writer: csv::Writer<W>,
}

impl Recorder<std::fs::File> {
    /// Appends to `path`. The header row is written only for a new or empty file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open record file {}", path.display()))?;
        let fresh = file.metadata()?.len() == 0;
        Ok(Self::with_header(file, fresh))
    }
}

impl<W: Write> Recorder<W> {
    pub fn new(out: W) -> Self {
        Self::with_header(out, true)
    }

    fn with_header(out: W, header: bool) -> Self {
        let writer = csv::WriterBuilder::new().has_headers(header).from_writer(out);
        Self { writer }
    }

    pub fn record(&mut self, batch: &EstimationBatch) -> Result<()> {
        let stamp = batch.header.stamp.to_rfc3339();
        for e in batch.estimations() {
            self.writer.serialize(EstimationRow {
                seq: batch.header.seq,
                stamp: stamp.clone(),
                identity: e.identity,
                x: e.position.x,
                y: e.position.y,
                std_dev_x: e.std_dev.x,
                std_dev_y: e.std_dev.y,
                width: e.width,
                height: e.height,
                vel_x: e.velocity.x,
                vel_y: e.velocity.y,
                avg_vel_x: e.averaged_velocity.x,
                avg_vel_y: e.averaged_velocity.y,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush record: {}", e.error()))
    }
}
