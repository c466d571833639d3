//! source — pull-based pose frame streams
//!
//! A pose source is any iterator of [`Capture`]s: the control loop pulls one
//! per cycle and stops when the iterator ends.  A [`Capture::Timeout`] means
//! the source had nothing new this time round.
//!
//! [`ReplaySource`] reads a recorded stream as JSON lines, one frame per line:
//!
//! ```text
//! {"t": 0.033, "bodies": [{"left_shoulder": [612.0, 340.5], "left_wrist": [630.2, 210.0]}]}
//! ```
//!
//! `t` (seconds from stream start) is optional.  A blank line or `null` is a
//! capture timeout.  Joint names the body model does not know are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pose::{Body, Joint, PoseFrame};

/// One pull from a pose source.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Frame(PoseFrame),
    /// No new data; try again.
    Timeout,
}

#[derive(Debug, Deserialize)]
struct FrameRecord {
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    bodies: Vec<HashMap<String, [f64; 2]>>,
}

impl FrameRecord {
    fn into_frame(self) -> PoseFrame {
        let bodies = self
            .bodies
            .into_iter()
            .map(|joints| {
                let mut body = Body::new();
                for (name, [x, y]) in joints {
                    match Joint::from_name(&name) {
                        Some(joint) => body.insert(joint, x, y),
                        None => debug!(joint = %name, "ignoring unknown joint"),
                    }
                }
                body
            })
            .collect();

        PoseFrame {
            // Negative or non-finite stamps are dropped rather than trusted.
            timestamp: self.t.and_then(|t| Duration::try_from_secs_f64(t).ok()),
            bodies,
        }
    }
}

/// Recorded JSON-lines pose stream.
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_no: u64,
    skipped: u64,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("could not open pose stream {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines that could not be parsed and were skipped.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn parse(&mut self, line: &str) -> Option<Capture> {
        let line = line.trim();
        if line.is_empty() {
            return Some(Capture::Timeout);
        }
        match serde_json::from_str::<Option<FrameRecord>>(line) {
            Ok(Some(record)) => Some(Capture::Frame(record.into_frame())),
            Ok(None) => Some(Capture::Timeout),
            Err(e) => {
                self.skipped += 1;
                warn!(line = self.line_no, "skipping malformed pose frame: {e}");
                None
            }
        }
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = Result<Capture>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("failed to read line {}", self.line_no + 1)),
                    )
                }
            };
            self.line_no += 1;
            if let Some(capture) = self.parse(&line) {
                return Some(Ok(capture));
            }
        }
    }
}
