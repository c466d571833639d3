use std::time::{Duration, Instant};

use crate::aim::{AimController, AimState};
use crate::catalog::Routine;
use crate::evaluation::evaluate_exercise;
use crate::pose::{Detection, PoseFrame};
use crate::tracking::{CycleReport, ExerciseRunState, Observation};

/// Everything one frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub report: CycleReport,
    /// New mount angles, when the aim controller moved or recentred.
    pub aim: Option<AimState>,
}

/// Owns the routine and all mutable state, and runs one cycle per frame.
pub struct ExerciseTracker {
    routine: Routine,
    state: ExerciseRunState,
    aim: Option<AimController>,
    prof_frames: u64,
    prof_evaluate: Duration,
}

impl ExerciseTracker {
    pub fn new(routine: Routine, aim: Option<AimController>) -> Self {
        Self {
            routine,
            state: ExerciseRunState::new(),
            aim,
            prof_frames: 0,
            prof_evaluate: Duration::ZERO,
        }
    }

    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn state(&self) -> &ExerciseRunState {
        &self.state
    }

    pub fn aim_state(&self) -> Option<AimState> {
        self.aim.as_ref().map(AimController::state)
    }

    pub fn process(&mut self, frame: &PoseFrame, now: Instant) -> FrameOutcome {
        let index = self.state.current_index();
        let evaluate_start = Instant::now();

        let detection = frame.classify();
        let mut aim = None;

        let report = match &detection {
            Detection::NoBody => self.state.step(&self.routine, Observation::NoBody, now),
            Detection::Ambiguous(count) => {
                tracing::debug!(bodies = count, "ambiguous frame");
                self.state.step(&self.routine, Observation::Ambiguous, now)
            }
            Detection::Single(snapshot) => {
                // Aim follows the exercise that was active when the frame
                // arrived, whether or not its body parts are visible.
                if let (Some(controller), Some(joint)) =
                    (self.aim.as_mut(), self.routine.track_joint(index))
                {
                    aim = controller.track(snapshot, joint);
                }
                let verdict = evaluate_exercise(snapshot, self.routine.parts_of(index));
                self.state.step(&self.routine, Observation::Body(verdict), now)
            }
        };

        if report.advanced {
            if let Some(controller) = self.aim.as_mut() {
                aim = Some(controller.recenter_tilt());
            }
            tracing::info!(
                exercise = %self.routine.exercise(self.state.current_index()).name,
                total_completed = report.total_completed,
                "next exercise"
            );
        }
        if report.rep_completed {
            tracing::info!(
                exercise = %report.exercise_name,
                total_completed = report.total_completed,
                "repetition completed"
            );
        }

        self.prof_evaluate += evaluate_start.elapsed();
        self.prof_frames += 1;
        if self.prof_frames % 300 == 0 {
            tracing::info!(
                frames = self.prof_frames,
                evaluate_us_per_frame = format!(
                    "{:.1}",
                    self.prof_evaluate.as_secs_f64() * 1_000_000.0 / self.prof_frames as f64
                ),
                total_completed = self.state.total_completed(),
                "pipeline timings"
            );
        }

        FrameOutcome { report, aim }
    }
}
