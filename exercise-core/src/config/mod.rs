//! config — TOML configuration for the body-part catalog, playlist, and aim
//!
//! ```toml
//! [aim]
//! enabled = true
//! pan_dead_band = [600.0, 680.0]
//! tilt_dead_band = [330.0, 390.0]
//!
//! [[body_parts]]
//! name = "Left Arm"
//! joints = ["left_shoulder", "left_elbow", "left_wrist"]
//! location = "upper"
//! track_joint = "left_shoulder"
//!
//! [[exercises]]
//! name = "Lift Left Arm"
//! body_parts = ["Left Arm"]
//! hold_duration = 5.0
//! repeat_count = 2
//! prompt_text = "Raise Left Arm"
//! return_text = "Lower Left Arm"
//! ```
//!
//! Any section left out falls back to the built-in routine.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aim::{AimConfig, AimController};
use crate::catalog::{BodyPart, Exercise, Location, Routine};
use crate::error::ConfigError;
use crate::pose::Joint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aim: AimConfig,
    #[serde(default = "default_body_parts")]
    pub body_parts: Vec<BodyPart>,
    #[serde(default = "default_exercises")]
    pub exercises: Vec<Exercise>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aim: AimConfig::default(),
            body_parts: default_body_parts(),
            exercises: default_exercises(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Load `path`, or fall back to the built-in routine if it is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config not found; using built-in routine");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("could not write config {}", path.display()))
    }

    /// Validated catalog + playlist.
    pub fn routine(&self) -> Result<Routine, ConfigError> {
        Routine::new(self.body_parts.clone(), self.exercises.clone())
    }

    /// The aim controller, or `None` when aiming is disabled.  The aim
    /// section is validated either way.
    pub fn aim_controller(&self) -> Result<Option<AimController>, ConfigError> {
        let controller = AimController::new(self.aim.clone())?;
        Ok(self.aim.enabled.then_some(controller))
    }
}

// ── Built-in routine ─────────────────────────────────────────────────────────

fn part(name: &str, joints: [Joint; 3], location: Location, track_joint: Joint) -> BodyPart {
    BodyPart {
        name: name.to_string(),
        joints,
        location,
        track_joint: Some(track_joint),
    }
}

fn exercise(
    name: &str,
    body_parts: &[&str],
    hold_duration: f64,
    repeat_count: u32,
    prompt_text: &str,
    return_text: &str,
) -> Exercise {
    Exercise {
        name: name.to_string(),
        body_parts: body_parts.iter().map(|p| p.to_string()).collect(),
        hold_duration,
        repeat_count,
        prompt_text: prompt_text.to_string(),
        return_text: return_text.to_string(),
    }
}

pub fn default_body_parts() -> Vec<BodyPart> {
    use Joint::*;
    vec![
        part(
            "Left Arm",
            [LeftShoulder, LeftElbow, LeftWrist],
            Location::Upper,
            LeftShoulder,
        ),
        part(
            "Right Arm",
            [RightShoulder, RightElbow, RightWrist],
            Location::Upper,
            RightShoulder,
        ),
        part(
            "Left Leg",
            [LeftHip, LeftAnkle, LeftKnee],
            Location::Lower,
            LeftHip,
        ),
        part(
            "Right Leg",
            [RightHip, RightAnkle, RightKnee],
            Location::Lower,
            RightHip,
        ),
        part(
            "Right Torso",
            [RightKnee, LeftKnee, RightShoulder],
            Location::Torso,
            LeftHip,
        ),
        part(
            "Left Torso",
            [RightKnee, LeftKnee, LeftShoulder],
            Location::Torso,
            RightHip,
        ),
    ]
}

pub fn default_exercises() -> Vec<Exercise> {
    vec![
        exercise(
            "Lift Left Arm",
            &["Left Arm"],
            5.0,
            2,
            "Raise Left Arm",
            "Lower Left Arm",
        ),
        exercise(
            "Lift Right Arm",
            &["Right Arm"],
            5.0,
            2,
            "Raise Right Arm",
            "Lower Right Arm",
        ),
        exercise(
            "Lift Both Arms",
            &["Left Arm", "Right Arm"],
            3.0,
            3,
            "Raise Both Arms",
            "Lower Both Arms",
        ),
        exercise(
            "Lift Left Leg",
            &["Left Leg"],
            3.0,
            2,
            "Lift Left Leg",
            "Lower Left Leg",
        ),
        exercise(
            "Lift Right Leg",
            &["Right Leg"],
            3.0,
            2,
            "Lift Right Leg",
            "Lower Right Leg",
        ),
        exercise(
            "Rotate Right Torso",
            &["Right Torso"],
            3.0,
            2,
            "Rotate Right Torso",
            "Return Torso to the front",
        ),
        exercise(
            "Rotate Left Torso",
            &["Left Torso"],
            3.0,
            2,
            "Rotate Left Torso",
            "Rotate Torso to the front",
        ),
    ]
}
