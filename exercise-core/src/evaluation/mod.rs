//! evaluation — is a body part visible, and is it in the target position?
//!
//! Pure functions over one [`PoseSnapshot`].  Geometry is only ever computed
//! from joints that were actually detected: a part with any missing joint is
//! reported as not visible and its target test is skipped.

use crate::catalog::{BodyPart, Location, JOINTS_PER_PART};
use crate::pose::{Position, PoseSnapshot};

/// Knee-to-hip span must stay under this fraction of the knee-to-ankle span
/// for a leg to count as lifted.
const LEG_LIFT_RATIO: f64 = 0.8;

/// Outcome for a single body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartVerdict {
    NotVisible,
    /// Visible but not in the target position.
    Released,
    AtTarget,
}

/// Outcome for every body part an exercise needs, combined with AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseVerdict<'a> {
    /// First part (in listed order) with a missing joint.
    NotVisible { part: &'a str },
    /// All parts visible; first part not at target.
    Released { part: &'a str },
    AtTarget,
}

impl ExerciseVerdict<'_> {
    pub fn is_visible(&self) -> bool {
        !matches!(self, ExerciseVerdict::NotVisible { .. })
    }

    pub fn is_at_target(&self) -> bool {
        matches!(self, ExerciseVerdict::AtTarget)
    }
}

pub fn visible(snapshot: &PoseSnapshot, part: &BodyPart) -> bool {
    locate(snapshot, part).is_some()
}

pub fn at_target(snapshot: &PoseSnapshot, part: &BodyPart) -> bool {
    evaluate(snapshot, part) == PartVerdict::AtTarget
}

pub fn evaluate(snapshot: &PoseSnapshot, part: &BodyPart) -> PartVerdict {
    evaluate_with(snapshot, part, target_reached)
}

/// Like [`evaluate`] with a caller-supplied target test.  `test` is only
/// called when all of the part's joints were detected.
pub fn evaluate_with<F>(snapshot: &PoseSnapshot, part: &BodyPart, mut test: F) -> PartVerdict
where
    F: FnMut(Location, &[Position; JOINTS_PER_PART]) -> bool,
{
    match locate(snapshot, part) {
        None => PartVerdict::NotVisible,
        Some(points) if test(part.location, &points) => PartVerdict::AtTarget,
        Some(_) => PartVerdict::Released,
    }
}

/// Evaluate every part and combine.  Visibility failures take precedence over
/// target failures so the user is first told what the camera cannot see.
pub fn evaluate_exercise<'a, I>(snapshot: &PoseSnapshot, parts: I) -> ExerciseVerdict<'a>
where
    I: IntoIterator<Item = &'a BodyPart>,
{
    let mut first_hidden = None;
    let mut first_released = None;

    for part in parts {
        match evaluate(snapshot, part) {
            PartVerdict::NotVisible => {
                first_hidden.get_or_insert(part.name.as_str());
            }
            PartVerdict::Released => {
                first_released.get_or_insert(part.name.as_str());
            }
            PartVerdict::AtTarget => {}
        }
    }

    match (first_hidden, first_released) {
        (Some(part), _) => ExerciseVerdict::NotVisible { part },
        (None, Some(part)) => ExerciseVerdict::Released { part },
        (None, None) => ExerciseVerdict::AtTarget,
    }
}

/// The target-position policy for each location.  `joints` follows the
/// ordering documented on [`Location`].
pub fn target_reached(location: Location, joints: &[Position; JOINTS_PER_PART]) -> bool {
    match location {
        Location::Upper => {
            let [shoulder, _elbow, wrist] = joints;
            shoulder.y - wrist.y > 0.0
        }
        Location::Lower => {
            let [hip, ankle, knee] = joints;
            (hip.y - knee.y).abs() < LEG_LIFT_RATIO * (knee.y - ankle.y).abs()
        }
        Location::Torso => {
            // x only: the shoulder must sit strictly between the knees.
            let [knee_a, knee_b, shoulder] = joints;
            (knee_a.x > shoulder.x && shoulder.x > knee_b.x)
                || (knee_a.x < shoulder.x && shoulder.x < knee_b.x)
        }
    }
}

fn locate(snapshot: &PoseSnapshot, part: &BodyPart) -> Option<[Position; JOINTS_PER_PART]> {
    let [a, b, c] = part.joints;
    Some([
        snapshot.locate(a)?,
        snapshot.locate(b)?,
        snapshot.locate(c)?,
    ])
}
