//! display — turn a cycle report into the three overlay lines
//!
//! The engine never draws; it hands short strings to a [`DisplaySink`] along
//! with the line they belong on and leaves placement to the sink.

use std::fmt;

use crate::tracking::CycleReport;

/// Overlay slot, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    Status,
    Warning,
    Counter,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Line::Status => "status",
            Line::Warning => "warning",
            Line::Counter => "counter",
        })
    }
}

pub trait DisplaySink {
    fn show(&mut self, line: Line, text: &str);
}

/// Text for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Overlay {
    pub status: String,
    pub warning: String,
    pub counter: String,
}

impl Overlay {
    pub fn from_report(report: &CycleReport) -> Self {
        Self {
            status: format!("Current exercise: {}", report.exercise_name),
            warning: report.prompt.to_string(),
            counter: format!("Total # exercises: {}", report.total_completed),
        }
    }

    pub fn lines(&self) -> [(Line, &str); 3] {
        [
            (Line::Status, self.status.as_str()),
            (Line::Warning, self.warning.as_str()),
            (Line::Counter, self.counter.as_str()),
        ]
    }

    pub fn render(&self, sink: &mut dyn DisplaySink) {
        for (line, text) in self.lines() {
            sink.show(line, text);
        }
    }
}
