//! tracking — hold timer, repetition counter, and playlist position
//!
//! One [`ExerciseRunState`] lives for the whole run.  Each cycle it is handed
//! the routine, what the evaluator saw, and the current time, and moves
//! between two states:
//!
//! ```text
//!   Idle ──(visible + at target)──▶ Holding ──(released / hidden)──▶ Idle
//!                                      │
//!                           elapsed ≥ hold: rep counted once
//! ```
//!
//! A counted repetition is only consumed on release, and the playlist only
//! advances on that release edge, never while the position is still held.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::catalog::Routine;
use crate::evaluation::ExerciseVerdict;

// ── Inputs and outputs ───────────────────────────────────────────────────────

/// What the engine learned from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation<'a> {
    NoBody,
    /// More than one body in frame.
    Ambiguous,
    Body(ExerciseVerdict<'a>),
}

/// The instruction shown on the warning line this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    NoBody,
    TooManyPeople,
    NotVisible { part: String },
    /// Out of position: the exercise's prompt text.
    Move(String),
    /// Holding, with whole seconds left to go.
    Hold { remaining_secs: u64 },
    /// Hold satisfied: the exercise's return text.
    Return(String),
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::NoBody => f.write_str("Body is not detected."),
            Prompt::TooManyPeople => f.write_str("Too many people"),
            Prompt::NotVisible { part } => write!(f, "{part} is not visible."),
            Prompt::Move(text) | Prompt::Return(text) => f.write_str(text),
            Prompt::Hold { remaining_secs } => {
                write!(f, "Hold this position for {remaining_secs} seconds.")
            }
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Exercise that was active when the cycle started.
    pub exercise_index: usize,
    pub exercise_name: String,
    pub prompt: Prompt,
    pub total_completed: u64,
    /// A hold crossed the duration threshold this cycle.
    pub rep_completed: bool,
    /// The playlist moved to a new exercise this cycle.
    pub advanced: bool,
}

// ── State machine ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseRunState {
    current_index: usize,
    /// `None` until the first cycle enters the first exercise.
    remaining_repeats: Option<u32>,
    holding: bool,
    hold_started_at: Option<Instant>,
    rep_satisfied_this_hold: bool,
    total_completed: u64,
}

impl ExerciseRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn remaining_repeats(&self) -> Option<u32> {
        self.remaining_repeats
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn hold_started_at(&self) -> Option<Instant> {
        self.hold_started_at
    }

    pub fn rep_satisfied(&self) -> bool {
        self.rep_satisfied_this_hold
    }

    pub fn total_completed(&self) -> u64 {
        self.total_completed
    }

    /// Time spent in the current hold, or zero when idle.  Clock skew never
    /// yields a negative value.
    pub fn hold_elapsed(&self, now: Instant) -> Duration {
        self.hold_started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    /// Advance the machine by one cycle.
    pub fn step(
        &mut self,
        routine: &Routine,
        observation: Observation<'_>,
        now: Instant,
    ) -> CycleReport {
        let index = self.current_index;
        let exercise = routine.exercise(index);
        self.remaining_repeats.get_or_insert(exercise.repeat_count);

        let mut report = CycleReport {
            exercise_index: index,
            exercise_name: exercise.name.clone(),
            prompt: Prompt::NoBody,
            total_completed: self.total_completed,
            rep_completed: false,
            advanced: false,
        };

        let prompt = match observation {
            Observation::NoBody => Prompt::NoBody,
            Observation::Ambiguous => Prompt::TooManyPeople,
            Observation::Body(ExerciseVerdict::AtTarget) => self.hold(routine, now, &mut report),
            Observation::Body(ExerciseVerdict::NotVisible { part }) => {
                // A hidden part cannot be confirmed at target, so it releases
                // the hold just like moving out of position.
                self.release(routine, &mut report);
                Prompt::NotVisible {
                    part: part.to_string(),
                }
            }
            Observation::Body(ExerciseVerdict::Released { .. }) => {
                self.release(routine, &mut report);
                Prompt::Move(exercise.prompt_text.clone())
            }
        };

        report.prompt = prompt;
        report.total_completed = self.total_completed;
        report
    }

    fn hold(&mut self, routine: &Routine, now: Instant, report: &mut CycleReport) -> Prompt {
        let exercise = routine.exercise(self.current_index);

        if !self.holding {
            self.holding = true;
            self.rep_satisfied_this_hold = false;
            self.hold_started_at = Some(now);
            debug!(exercise = %exercise.name, "hold started");
        }
        let started = *self.hold_started_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        let required = routine.hold_duration(self.current_index);

        if self.rep_satisfied_this_hold {
            return Prompt::Return(exercise.return_text.clone());
        }

        if elapsed >= required {
            self.rep_satisfied_this_hold = true;
            self.total_completed += 1;
            report.rep_completed = true;
            debug!(
                exercise = %exercise.name,
                elapsed_secs = elapsed.as_secs_f64(),
                total_completed = self.total_completed,
                "repetition completed"
            );
            Prompt::Return(exercise.return_text.clone())
        } else {
            let left = (required - elapsed).as_secs_f64().ceil() as u64;
            Prompt::Hold {
                remaining_secs: left,
            }
        }
    }

    fn release(&mut self, routine: &Routine, report: &mut CycleReport) {
        if self.holding {
            debug!(
                exercise = %routine.exercise(self.current_index).name,
                satisfied = self.rep_satisfied_this_hold,
                "hold released"
            );
        }
        self.holding = false;
        self.hold_started_at = None;

        if !self.rep_satisfied_this_hold {
            return;
        }
        self.rep_satisfied_this_hold = false;

        let remaining = self.remaining_repeats.unwrap_or(1).saturating_sub(1);
        if remaining > 0 {
            self.remaining_repeats = Some(remaining);
            return;
        }

        let from = self.current_index;
        self.current_index = routine.next_index(from);
        let next = routine.exercise(self.current_index);
        self.remaining_repeats = Some(next.repeat_count);
        report.advanced = true;
        debug!(
            from = %routine.exercise(from).name,
            to = %next.name,
            index = self.current_index,
            "playlist advanced"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BodyPart, Exercise, Location};
    use crate::pose::Joint;

    const AT_TARGET: Observation<'static> = Observation::Body(ExerciseVerdict::AtTarget);
    const RELEASED: Observation<'static> =
        Observation::Body(ExerciseVerdict::Released { part: "Left Arm" });

    fn routine(specs: &[(f64, u32)]) -> Routine {
        let part = BodyPart::new(
            "Left Arm",
            &[Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist],
            Location::Upper,
            None,
        )
        .unwrap();
        let exercises = specs
            .iter()
            .enumerate()
            .map(|(i, &(hold, repeat))| Exercise {
                name: format!("Exercise {i}"),
                body_parts: vec!["Left Arm".to_string()],
                hold_duration: hold,
                repeat_count: repeat,
                prompt_text: format!("Raise {i}"),
                return_text: format!("Lower {i}"),
            })
            .collect();
        Routine::new(vec![part], exercises).unwrap()
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Hold from `t` for `hold` seconds, then release shortly after.
    fn full_rep(state: &mut ExerciseRunState, routine: &Routine, t0: Instant, t: f64, hold: f64) {
        state.step(routine, AT_TARGET, t0 + secs(t));
        state.step(routine, AT_TARGET, t0 + secs(t + hold));
        state.step(routine, RELEASED, t0 + secs(t + hold + 0.1));
    }

    #[test]
    fn test_first_cycle_initializes_repeats() {
        let routine = routine(&[(2.0, 3)]);
        let mut state = ExerciseRunState::new();
        assert_eq!(state.remaining_repeats(), None);

        state.step(&routine, Observation::NoBody, Instant::now());
        assert_eq!(state.remaining_repeats(), Some(3));
        assert!(!state.is_holding());
    }

    #[test]
    fn test_countdown_while_holding() {
        let routine = routine(&[(5.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        let report = state.step(&routine, AT_TARGET, t0);
        assert_eq!(report.prompt, Prompt::Hold { remaining_secs: 5 });
        assert!(state.is_holding());
        assert_eq!(state.hold_started_at(), Some(t0));

        let report = state.step(&routine, AT_TARGET, t0 + secs(1.5));
        assert_eq!(report.prompt, Prompt::Hold { remaining_secs: 4 });
        assert_eq!(report.prompt.to_string(), "Hold this position for 4 seconds.");
        // start time is kept for the whole hold
        assert_eq!(state.hold_started_at(), Some(t0));
    }

    #[test]
    fn test_long_hold_counts_once() {
        let routine = routine(&[(2.0, 2)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        let mut reps = 0;
        for tenth in 0..=40 {
            let report = state.step(&routine, AT_TARGET, t0 + secs(tenth as f64 / 10.0));
            if report.rep_completed {
                reps += 1;
            }
        }
        assert_eq!(reps, 1);
        assert_eq!(state.total_completed(), 1);
        assert!(state.rep_satisfied());
        assert_eq!(state.remaining_repeats(), Some(2));
    }

    #[test]
    fn test_zero_elapsed_cycles() {
        let routine = routine(&[(1.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        state.step(&routine, AT_TARGET, t0);
        state.step(&routine, AT_TARGET, t0);
        assert_eq!(state.total_completed(), 0);
        assert!(state.is_holding());
    }

    #[test]
    fn test_zero_hold_duration_counts_immediately() {
        let routine = routine(&[(0.0, 1), (1.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        let report = state.step(&routine, AT_TARGET, t0);
        assert!(report.rep_completed);
        assert_eq!(report.prompt, Prompt::Return("Lower 0".to_string()));
    }

    #[test]
    fn test_repeat_count_gates_advance() {
        let routine = routine(&[(2.0, 2), (2.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        full_rep(&mut state, &routine, t0, 0.0, 2.0);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.remaining_repeats(), Some(1));

        full_rep(&mut state, &routine, t0, 10.0, 2.0);
        assert_eq!(state.current_index(), 1);
        assert_eq!(state.remaining_repeats(), Some(1));
        assert_eq!(state.total_completed(), 2);
    }

    #[test]
    fn test_early_release_does_not_consume_repeat() {
        let routine = routine(&[(2.0, 2), (2.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        state.step(&routine, AT_TARGET, t0);
        state.step(&routine, AT_TARGET, t0 + secs(1.0));
        let report = state.step(&routine, RELEASED, t0 + secs(1.5));

        assert_eq!(report.prompt, Prompt::Move("Raise 0".to_string()));
        assert!(!state.is_holding());
        assert_eq!(state.hold_started_at(), None);
        assert_eq!(state.remaining_repeats(), Some(2));
        assert_eq!(state.total_completed(), 0);
    }

    #[test]
    fn test_no_advance_while_still_holding() {
        let routine = routine(&[(1.0, 1), (1.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        state.step(&routine, AT_TARGET, t0);
        let report = state.step(&routine, AT_TARGET, t0 + secs(3.0));
        assert!(report.rep_completed);
        assert!(!report.advanced);
        assert_eq!(state.current_index(), 0);

        let report = state.step(&routine, RELEASED, t0 + secs(3.5));
        assert!(report.advanced);
        assert_eq!(report.exercise_index, 0);
        assert_eq!(report.prompt, Prompt::Move("Raise 0".to_string()));
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn test_playlist_wraps() {
        let routine = routine(&[(1.0, 1), (1.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        full_rep(&mut state, &routine, t0, 0.0, 1.0);
        full_rep(&mut state, &routine, t0, 5.0, 1.0);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.remaining_repeats(), Some(1));
        assert_eq!(state.total_completed(), 2);
    }

    #[test]
    fn test_ambiguous_frames_freeze_state() {
        let routine = routine(&[(2.0, 2)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        state.step(&routine, AT_TARGET, t0);
        let before = state.clone();

        let report = state.step(&routine, Observation::Ambiguous, t0 + secs(5.0));
        assert_eq!(report.prompt, Prompt::TooManyPeople);
        assert_eq!(state, before);

        let report = state.step(&routine, Observation::NoBody, t0 + secs(6.0));
        assert_eq!(report.prompt.to_string(), "Body is not detected.");
        assert_eq!(state, before);
    }

    #[test]
    fn test_hidden_part_releases_hold() {
        let routine = routine(&[(1.0, 1), (1.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now();

        state.step(&routine, AT_TARGET, t0);
        state.step(&routine, AT_TARGET, t0 + secs(1.0));
        let report = state.step(
            &routine,
            Observation::Body(ExerciseVerdict::NotVisible { part: "Left Arm" }),
            t0 + secs(1.2),
        );

        assert_eq!(report.prompt.to_string(), "Left Arm is not visible.");
        assert!(!state.is_holding());
        assert!(report.advanced);
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn test_clock_skew_is_clamped() {
        let routine = routine(&[(2.0, 1)]);
        let mut state = ExerciseRunState::new();
        let t0 = Instant::now() + secs(10.0);

        state.step(&routine, AT_TARGET, t0);
        let report = state.step(&routine, AT_TARGET, t0 - secs(5.0));
        assert_eq!(report.prompt, Prompt::Hold { remaining_secs: 2 });
        assert_eq!(state.hold_elapsed(t0 - secs(5.0)), Duration::ZERO);
        assert_eq!(state.total_completed(), 0);
    }
}
