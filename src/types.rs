use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point32 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point32 {
    pub fn planar(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// One tracked target as reported by the tracker for a single cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetEstimation {
    pub identity: i32,
    pub position: Point32,
    pub std_dev: Point32,
    pub width: i32,
    pub height: i32,
    pub velocity: Point32,
    pub averaged_velocity: Point32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub seq: u32,
    pub stamp: DateTime<Utc>,
    pub frame_id: String,
}

/// Outbound message. Index `i` of every sequence refers to the same target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationBatch {
    pub header: Header,
    pub identities: Vec<i32>,
    pub positions: Vec<Point32>,
    pub standard_deviations: Vec<Point32>,
    pub widths: Vec<i32>,
    pub heights: Vec<i32>,
    pub velocities: Vec<Point32>,
    pub averaged_velocities: Vec<Point32>,
}

impl EstimationBatch {
    /// Fans the estimations out into the parallel sequences, preserving order.
    pub fn assemble(header: Header, estimations: &[TargetEstimation]) -> Self {
        let n = estimations.len();
        let mut batch = Self {
            header,
            identities: Vec::with_capacity(n),
            positions: Vec::with_capacity(n),
            standard_deviations: Vec::with_capacity(n),
            widths: Vec::with_capacity(n),
            heights: Vec::with_capacity(n),
            velocities: Vec::with_capacity(n),
            averaged_velocities: Vec::with_capacity(n),
        };

        for e in estimations {
            batch.identities.push(e.identity);
            batch.positions.push(e.position);
            batch.standard_deviations.push(e.std_dev);
            batch.widths.push(e.width);
            batch.heights.push(e.height);
            batch.velocities.push(e.velocity);
            batch.averaged_velocities.push(e.averaged_velocity);
        }

        batch
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Reassembles the estimation at `index`.
    pub fn estimation(&self, index: usize) -> Option<TargetEstimation> {
        Some(TargetEstimation {
            identity: *self.identities.get(index)?,
            position: *self.positions.get(index)?,
            std_dev: *self.standard_deviations.get(index)?,
            width: *self.widths.get(index)?,
            height: *self.heights.get(index)?,
            velocity: *self.velocities.get(index)?,
            averaged_velocity: *self.averaged_velocities.get(index)?,
        })
    }

    pub fn estimations(&self) -> impl Iterator<Item = TargetEstimation> + '_ {
        (0..self.len()).filter_map(|i| self.estimation(i))
    }
}
