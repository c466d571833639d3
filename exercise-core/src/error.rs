//! Startup configuration errors.  Nothing in the per-frame path fails.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("body-part catalog is empty")]
    EmptyCatalog,

    #[error("exercise playlist is empty")]
    EmptyPlaylist,

    #[error("body part `{0}` is defined more than once")]
    DuplicateBodyPart(String),

    #[error("exercise `{exercise}` references unknown body part `{part}`")]
    UnknownBodyPart { exercise: String, part: String },

    #[error("body part `{part}` needs {expected} joints, got {actual}")]
    JointCount {
        part: String,
        expected: usize,
        actual: usize,
    },

    #[error("exercise `{0}` lists no body parts")]
    EmptyExercise(String),

    #[error("exercise `{exercise}` has invalid hold duration {seconds}s")]
    InvalidHoldDuration { exercise: String, seconds: f64 },

    #[error("exercise `{0}` has a repeat count of zero")]
    ZeroRepeatCount(String),

    #[error("invalid {axis} dead-band [{low}, {high}]")]
    InvalidDeadBand {
        axis: &'static str,
        low: f64,
        high: f64,
    },

    #[error("aim step must be a positive number of degrees, got {0}")]
    InvalidStep(f64),

    #[error("aim home angle {0} is outside [0, 180]")]
    InvalidHomeAngle(f64),
}
