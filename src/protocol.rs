//! Text protocol spoken by the tracker agents.
//!
//! A datagram carries zero or more records separated by `;`. Each record is
//! eleven whitespace-separated numbers in fixed order:
//!
//! ```text
//! identity x y stdDevX stdDevY width height velX velY avgVelX avgVelY
//! ```
//!
//! Decoding is lenient. Tokens are consumed left to right and the first token
//! that is missing or unparseable stops extraction for that record; it and all
//! later fields keep their zero default. Such records are still emitted and are
//! counted as degraded.

use std::fmt;
use std::str::{FromStr, SplitWhitespace};

use crate::types::{Point32, TargetEstimation};

pub const RECORD_SEPARATOR: char = ';';
pub const FIELDS_PER_RECORD: usize = 11;

#[derive(Debug, Default, PartialEq)]
pub struct DecodeReport {
    pub estimations: Vec<TargetEstimation>,
    pub degraded: usize,
}

/// Splits a payload into records and decodes each one, preserving order.
/// Empty or whitespace-only records are skipped.
pub fn decode_payload(payload: &str) -> DecodeReport {
    let mut report = DecodeReport::default();

    for record in payload.split(RECORD_SEPARATOR) {
        if record.trim().is_empty() {
            continue;
        }
        let (estimation, complete) = decode_record(record);
        if !complete {
            report.degraded += 1;
        }
        report.estimations.push(estimation);
    }

    report
}

/// Decodes one record. The flag is `false` when fewer than eleven fields
/// could be read.
pub fn decode_record(record: &str) -> (TargetEstimation, bool) {
    let mut fields = Fields {
        tokens: record.split_whitespace(),
        ok: true,
    };
    // struct literal fields are evaluated in the order written
    let estimation = TargetEstimation {
        identity: fields.next(),
        position: Point32::planar(fields.next(), fields.next()),
        std_dev: Point32::planar(fields.next(), fields.next()),
        width: fields.next(),
        height: fields.next(),
        velocity: Point32::planar(fields.next(), fields.next()),
        averaged_velocity: Point32::planar(fields.next(), fields.next()),
    };

    (estimation, fields.ok)
}

/// Token stream that latches into a failed state, like an input stream whose
/// fail bit is set: once a read fails every later read yields the default.
struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    ok: bool,
}

impl Fields<'_> {
    fn next<T: FromStr + Default>(&mut self) -> T {
        if !self.ok {
            return T::default();
        }
        match self.tokens.next().map(str::parse::<T>) {
            Some(Ok(value)) => value,
            _ => {
                self.ok = false;
                T::default()
            }
        }
    }
}

impl fmt::Display for TargetEstimation {
    /// Writes the record in wire form, without the separator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {}",
            self.identity,
            self.position.x,
            self.position.y,
            self.std_dev.x,
            self.std_dev.y,
            self.width,
            self.height,
            self.velocity.x,
            self.velocity.y,
            self.averaged_velocity.x,
            self.averaged_velocity.y,
        )
    }
}
