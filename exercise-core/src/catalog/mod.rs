//! catalog — body parts, exercises, and the validated routine
//!
//! Body parts and exercises are plain data loaded once at startup.  A
//! [`Routine`] is the checked combination of both: every exercise resolves to
//! catalog entries and has a usable hold duration and repeat count, so the
//! per-frame code never has to look anything up by name.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pose::Joint;

/// Number of joints every body part is defined by.
pub const JOINTS_PER_PART: usize = 3;

// ── Body parts ───────────────────────────────────────────────────────────────

/// Selects the geometric test that decides "at target".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Arm: joints are `[shoulder, elbow, wrist]`.
    Upper,
    /// Leg: joints are `[hip, ankle, knee]`.
    Lower,
    /// Rotation: joints are `[knee_a, knee_b, shoulder]`.
    Torso,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BodyPartRecord", into = "BodyPartRecord")]
pub struct BodyPart {
    pub name: String,
    pub joints: [Joint; JOINTS_PER_PART],
    pub location: Location,
    /// Joint the aim controller keeps centred while this part is exercised.
    pub track_joint: Option<Joint>,
}

impl BodyPart {
    pub fn new(
        name: impl Into<String>,
        joints: &[Joint],
        location: Location,
        track_joint: Option<Joint>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let joints: [Joint; JOINTS_PER_PART] =
            joints.try_into().map_err(|_| ConfigError::JointCount {
                part: name.clone(),
                expected: JOINTS_PER_PART,
                actual: joints.len(),
            })?;
        Ok(Self {
            name,
            joints,
            location,
            track_joint,
        })
    }
}

/// On-disk shape of a body part; the joint list is length-checked on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BodyPartRecord {
    name: String,
    joints: Vec<Joint>,
    location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    track_joint: Option<Joint>,
}

impl TryFrom<BodyPartRecord> for BodyPart {
    type Error = ConfigError;

    fn try_from(record: BodyPartRecord) -> Result<Self, Self::Error> {
        BodyPart::new(record.name, &record.joints, record.location, record.track_joint)
    }
}

impl From<BodyPart> for BodyPartRecord {
    fn from(part: BodyPart) -> Self {
        Self {
            name: part.name,
            joints: part.joints.to_vec(),
            location: part.location,
            track_joint: part.track_joint,
        }
    }
}

// ── Exercises ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    /// All of these must be at target at once.
    pub body_parts: Vec<String>,
    /// Seconds the target position must be held for one repetition.
    pub hold_duration: f64,
    pub repeat_count: u32,
    /// Shown while the body is out of the target position.
    pub prompt_text: String,
    /// Shown once a hold has been long enough.
    pub return_text: String,
}

// ── Routine ──────────────────────────────────────────────────────────────────

/// A validated catalog + playlist pair.
#[derive(Debug, Clone)]
pub struct Routine {
    parts: Vec<BodyPart>,
    exercises: Vec<Exercise>,
    /// Per exercise: indices into `parts`, in listed order.
    resolved: Vec<Vec<usize>>,
    holds: Vec<Duration>,
}

impl Routine {
    pub fn new(parts: Vec<BodyPart>, exercises: Vec<Exercise>) -> Result<Self, ConfigError> {
        if parts.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if exercises.is_empty() {
            return Err(ConfigError::EmptyPlaylist);
        }

        let mut by_name = HashMap::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if by_name.insert(part.name.as_str(), i).is_some() {
                return Err(ConfigError::DuplicateBodyPart(part.name.clone()));
            }
        }

        let mut resolved = Vec::with_capacity(exercises.len());
        let mut holds = Vec::with_capacity(exercises.len());
        for exercise in &exercises {
            if exercise.body_parts.is_empty() {
                return Err(ConfigError::EmptyExercise(exercise.name.clone()));
            }
            if exercise.repeat_count == 0 {
                return Err(ConfigError::ZeroRepeatCount(exercise.name.clone()));
            }
            let hold = Duration::try_from_secs_f64(exercise.hold_duration).map_err(|_| {
                ConfigError::InvalidHoldDuration {
                    exercise: exercise.name.clone(),
                    seconds: exercise.hold_duration,
                }
            })?;

            let indices = exercise
                .body_parts
                .iter()
                .map(|name| {
                    by_name
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| ConfigError::UnknownBodyPart {
                            exercise: exercise.name.clone(),
                            part: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            resolved.push(indices);
            holds.push(hold);
        }

        Ok(Self {
            parts,
            exercises,
            resolved,
            holds,
        })
    }

    /// Number of exercises in the playlist.
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    /// Always false; construction rejects an empty playlist.
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn exercise(&self, index: usize) -> &Exercise {
        &self.exercises[index % self.exercises.len()]
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn body_parts(&self) -> &[BodyPart] {
        &self.parts
    }

    /// The body parts an exercise requires, in listed order.
    pub fn parts_of(&self, index: usize) -> impl Iterator<Item = &BodyPart> + '_ {
        self.resolved[index % self.resolved.len()]
            .iter()
            .map(move |&i| &self.parts[i])
    }

    pub fn hold_duration(&self, index: usize) -> Duration {
        self.holds[index % self.holds.len()]
    }

    /// Joint to aim at while an exercise is active: the first of its body
    /// parts that names one.
    pub fn track_joint(&self, index: usize) -> Option<Joint> {
        self.parts_of(index).find_map(|p| p.track_joint)
    }

    /// Index of the exercise after `index`, wrapping at the end.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.exercises.len()
    }
}
