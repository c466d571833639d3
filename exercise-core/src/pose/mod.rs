//! pose — per-frame body detections and the single-body snapshot
//!
//! The pose estimator is a black box: each frame it reports zero, one, or
//! many bodies, each a bag of named joints with pixel positions.  The engine
//! only ever reasons about a frame with exactly one body, normalised into a
//! [`PoseSnapshot`] that answers "where is joint X, if it was found at all".

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Joints ───────────────────────────────────────────────────────────────────

/// The 18 keypoints of the body model (COCO 17 + neck).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Joint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
    Neck = 17,
}

impl Joint {
    pub const COUNT: usize = 18;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::Neck,
    ];

    /// Name used by the pose estimator and in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "left_eye",
            Joint::RightEye => "right_eye",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
            Joint::Neck => "neck",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|j| j.name() == name)
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Raw detections ───────────────────────────────────────────────────────────

/// Pixel position, y increasing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One body as reported by the pose estimator.  Joints it did not find are
/// simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    joints: HashMap<Joint, Position>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_joint(mut self, joint: Joint, x: f64, y: f64) -> Self {
        self.insert(joint, x, y);
        self
    }

    pub fn insert(&mut self, joint: Joint, x: f64, y: f64) {
        self.joints.insert(joint, Position::new(x, y));
    }

    pub fn find(&self, joint: Joint) -> Option<Position> {
        self.joints.get(&joint).copied()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// Everything the pose source produced for one captured frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseFrame {
    /// Capture time relative to the start of the stream, when the source
    /// knows it.  Without one the control loop falls back to the wall clock.
    pub timestamp: Option<Duration>,
    pub bodies: Vec<Body>,
}

impl PoseFrame {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self {
            timestamp: None,
            bodies,
        }
    }

    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Decide whether this frame can be judged at all.
    pub fn classify(&self) -> Detection {
        match self.bodies.as_slice() {
            [] => Detection::NoBody,
            [body] => Detection::Single(PoseSnapshot::from_body(body)),
            bodies => Detection::Ambiguous(bodies.len()),
        }
    }
}

/// How many bodies a frame holds, from the engine's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    NoBody,
    /// More than one body; carries the count.
    Ambiguous(usize),
    Single(PoseSnapshot),
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// A single joint in a snapshot.  When `detected` is false the coordinates
/// are meaningless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub joint: Joint,
    pub x: f64,
    pub y: f64,
    pub detected: bool,
}

impl Keypoint {
    pub fn missing(joint: Joint) -> Self {
        Self {
            joint,
            x: 0.0,
            y: 0.0,
            detected: false,
        }
    }

    pub fn position(&self) -> Option<Position> {
        self.detected.then(|| Position::new(self.x, self.y))
    }
}

/// Every joint of one body for one frame.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSnapshot {
    keypoints: [Keypoint; Joint::COUNT],
}

impl PoseSnapshot {
    pub fn from_body(body: &Body) -> Self {
        let keypoints = Joint::ALL.map(|joint| match body.find(joint) {
            Some(p) => Keypoint {
                joint,
                x: p.x,
                y: p.y,
                detected: true,
            },
            None => Keypoint::missing(joint),
        });
        Self { keypoints }
    }

    pub fn get(&self, joint: Joint) -> &Keypoint {
        &self.keypoints[joint as usize]
    }

    /// Position of `joint`, or `None` if the estimator did not find it.
    pub fn locate(&self, joint: Joint) -> Option<Position> {
        self.get(joint).position()
    }

    pub fn detected_count(&self) -> usize {
        self.keypoints.iter().filter(|k| k.detected).count()
    }
}
