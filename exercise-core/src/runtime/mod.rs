//! runtime — the frame-by-frame control loop
//!
//! Pulls captures from a pose source until it ends, runs one tracker cycle
//! per frame, and pushes the results to the display sink and actuator.  A
//! timeout is skipped without touching state.  Sink and actuator failures are
//! logged and never stop the loop; only a failing source does.

use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use crate::aim::Actuator;
use crate::display::{DisplaySink, Overlay};
use crate::pipeline::{ExerciseTracker, FrameOutcome};
use crate::pose::PoseFrame;
use crate::source::Capture;

/// Maps frame timestamps onto the monotonic clock.  Frames without a
/// timestamp, or with one too far out to represent, are stamped with the
/// time they are processed.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(origin: Instant) -> Self {
        Self { origin }
    }

    pub fn now(&self, frame: &PoseFrame) -> Instant {
        match frame.timestamp {
            Some(offset) => self.origin.checked_add(offset).unwrap_or_else(|| {
                warn!(?offset, "frame timestamp out of range, using wall clock");
                Instant::now()
            }),
            None => Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub timeouts: u64,
    pub total_completed: u64,
    /// Exercise active when the stream ended.
    pub exercise_index: usize,
}

pub fn run<I, F>(
    tracker: &mut ExerciseTracker,
    source: I,
    clock: FrameClock,
    sink: &mut dyn DisplaySink,
    mut actuator: Option<&mut dyn Actuator>,
    mut on_frame: F,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<Capture>>,
    F: FnMut(&FrameOutcome),
{
    let mut summary = RunSummary::default();

    for capture in source {
        let frame = match capture? {
            Capture::Frame(frame) => frame,
            Capture::Timeout => {
                summary.timeouts += 1;
                continue;
            }
        };

        let outcome = tracker.process(&frame, clock.now(&frame));
        summary.frames += 1;

        Overlay::from_report(&outcome.report).render(sink);

        if let (Some(angles), Some(actuator)) = (outcome.aim, actuator.as_deref_mut()) {
            if let Err(e) = actuator.apply(angles) {
                warn!("actuator error: {e:#}");
            }
        }

        on_frame(&outcome);
    }

    summary.total_completed = tracker.state().total_completed();
    summary.exercise_index = tracker.state().current_index();
    info!(
        frames = summary.frames,
        timeouts = summary.timeouts,
        total_completed = summary.total_completed,
        "pose stream ended"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use crate::aim::{AimConfig, AimController, AimState};
    use crate::config::Config;
    use crate::display::Line;
    use crate::pose::{Body, Joint};
    use crate::source::ReplaySource;

    #[derive(Default)]
    struct Screen {
        warnings: Vec<String>,
    }

    impl DisplaySink for Screen {
        fn show(&mut self, line: Line, text: &str) {
            if line == Line::Warning {
                self.warnings.push(text.to_string());
            }
        }
    }

    #[derive(Default)]
    struct Mount {
        applied: Vec<AimState>,
        fail: bool,
    }

    impl Actuator for Mount {
        fn apply(&mut self, state: AimState) -> anyhow::Result<()> {
            self.applied.push(state);
            if self.fail {
                anyhow::bail!("servo bus unavailable");
            }
            Ok(())
        }
    }

    fn frame(t: f64, bodies: Vec<Body>) -> Result<Capture> {
        Ok(Capture::Frame(
            PoseFrame::new(bodies).at(Duration::from_secs_f64(t)),
        ))
    }

    fn tracker() -> ExerciseTracker {
        let config = Config::default();
        let aim = AimController::new(AimConfig::default()).unwrap();
        ExerciseTracker::new(config.routine().unwrap(), Some(aim))
    }

    fn left_arm(wrist_y: f64) -> Body {
        Body::new()
            .with_joint(Joint::LeftShoulder, 640.0, 360.0)
            .with_joint(Joint::LeftElbow, 640.0, 330.0)
            .with_joint(Joint::LeftWrist, 640.0, wrist_y)
    }

    #[test]
    fn test_timeouts_do_not_reach_tracker() {
        let mut tracker = tracker();
        let mut screen = Screen::default();
        let source = vec![
            Ok(Capture::Timeout),
            frame(0.0, vec![]),
            Ok(Capture::Timeout),
        ];

        let summary = run(
            &mut tracker,
            source,
            FrameClock::start(),
            &mut screen,
            None,
            |_| {},
        )
        .unwrap();

        assert_eq!(summary.frames, 1);
        assert_eq!(summary.timeouts, 2);
        assert_eq!(screen.warnings, ["Body is not detected."]);
    }

    #[test]
    fn test_replayed_hold_uses_frame_timestamps() {
        let mut tracker = tracker();
        let mut screen = Screen::default();
        let mut mount = Mount::default();
        // First default exercise: left arm, 5 s hold.
        let source = vec![
            frame(0.0, vec![left_arm(200.0)]),
            frame(2.0, vec![left_arm(200.0)]),
            frame(5.0, vec![left_arm(200.0)]),
            frame(6.0, vec![left_arm(500.0)]),
        ];

        let mut reps = 0;
        let summary = run(
            &mut tracker,
            source,
            FrameClock::start(),
            &mut screen,
            Some(&mut mount),
            |outcome| reps += u32::from(outcome.report.rep_completed),
        )
        .unwrap();

        assert_eq!(reps, 1);
        assert_eq!(summary.total_completed, 1);
        assert_eq!(summary.exercise_index, 0);
        assert_eq!(
            screen.warnings,
            [
                "Hold this position for 5 seconds.",
                "Hold this position for 3 seconds.",
                "Lower Left Arm",
                "Raise Left Arm",
            ]
        );
        // shoulder sits inside both dead-bands
        assert_eq!(mount.applied.len(), 4);
        assert!(mount
            .applied
            .iter()
            .all(|a| a.pan_angle == 90.0 && a.tilt_angle == 90.0));
    }

    #[test]
    fn test_actuator_failure_is_not_fatal() {
        let mut tracker = tracker();
        let mut screen = Screen::default();
        let mut mount = Mount {
            fail: true,
            ..Mount::default()
        };
        let source = vec![
            frame(0.0, vec![left_arm(200.0)]),
            frame(0.1, vec![left_arm(200.0)]),
        ];

        let summary = run(
            &mut tracker,
            source,
            FrameClock::start(),
            &mut screen,
            Some(&mut mount),
            |_| {},
        )
        .unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(mount.applied.len(), 2);
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_wall_clock() {
        let mut tracker = tracker();
        let mut screen = Screen::default();
        let text = "{\"t\": 1e19, \"bodies\": []}\n{\"t\": 1.0, \"bodies\": []}\n";

        let summary = run(
            &mut tracker,
            ReplaySource::new(Cursor::new(text)),
            FrameClock::start(),
            &mut screen,
            None,
            |_| {},
        )
        .unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(
            screen.warnings,
            ["Body is not detected.", "Body is not detected."]
        );
    }

    #[test]
    fn test_source_error_stops_run() {
        let mut tracker = tracker();
        let mut screen = Screen::default();
        let source = vec![frame(0.0, vec![]), Err(anyhow::anyhow!("disk gone"))];

        let result = run(
            &mut tracker,
            source,
            FrameClock::start(),
            &mut screen,
            None,
            |_| {},
        );
        assert!(result.is_err());
    }
}
