//! aim — keep one joint centred with a two-axis pan/tilt mount
//!
//! A fixed-step, sign-only controller: every frame the tracked joint is
//! compared against a horizontal and a vertical dead-band and each axis moves
//! by at most one step.  The only state is the pair of current angles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::pose::{Joint, PoseSnapshot, Position};

// ── Tuning constants ─────────────────────────────────────────────────────────

/// Servo travel limits in degrees.
pub const ANGLE_MIN: f64 = 0.0;
pub const ANGLE_MAX: f64 = 180.0;

/// Dead-bands for a 1280×720 frame.
const DEFAULT_PAN_DEAD_BAND: DeadBand = DeadBand {
    low: 600.0,
    high: 680.0,
};
const DEFAULT_TILT_DEAD_BAND: DeadBand = DeadBand {
    low: 330.0,
    high: 390.0,
};
const DEFAULT_STEP_DEGREES: f64 = 3.0;
const DEFAULT_HOME_ANGLE: f64 = 90.0;

// ── Configuration ────────────────────────────────────────────────────────────

/// Pixel interval inside which an axis is left alone.  Written `[low, high]`
/// in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct DeadBand {
    pub low: f64,
    pub high: f64,
}

impl DeadBand {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// -1 below the band, +1 above it, 0 inside.
    fn side(&self, value: f64) -> i8 {
        if value > self.high {
            1
        } else if value < self.low {
            -1
        } else {
            0
        }
    }

    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        if self.low.is_finite() && self.high.is_finite() && self.low <= self.high {
            Ok(())
        } else {
            Err(ConfigError::InvalidDeadBand {
                axis,
                low: self.low,
                high: self.high,
            })
        }
    }
}

impl From<[f64; 2]> for DeadBand {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<DeadBand> for [f64; 2] {
    fn from(band: DeadBand) -> Self {
        [band.low, band.high]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimConfig {
    /// Drive the mount at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Horizontal band on joint x.
    #[serde(default = "default_pan_dead_band")]
    pub pan_dead_band: DeadBand,
    /// Vertical band on joint y.
    #[serde(default = "default_tilt_dead_band")]
    pub tilt_dead_band: DeadBand,
    /// Degrees moved per frame on each axis.
    #[serde(default = "default_step_degrees")]
    pub step_degrees: f64,
    /// Starting angle of both axes, and where tilt returns between exercises.
    #[serde(default = "default_home_angle")]
    pub home_angle: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_pan_dead_band() -> DeadBand {
    DEFAULT_PAN_DEAD_BAND
}

fn default_tilt_dead_band() -> DeadBand {
    DEFAULT_TILT_DEAD_BAND
}

fn default_step_degrees() -> f64 {
    DEFAULT_STEP_DEGREES
}

fn default_home_angle() -> f64 {
    DEFAULT_HOME_ANGLE
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            pan_dead_band: default_pan_dead_band(),
            tilt_dead_band: default_tilt_dead_band(),
            step_degrees: default_step_degrees(),
            home_angle: default_home_angle(),
        }
    }
}

impl AimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pan_dead_band.validate("pan")?;
        self.tilt_dead_band.validate("tilt")?;
        if !(self.step_degrees.is_finite() && self.step_degrees > 0.0) {
            return Err(ConfigError::InvalidStep(self.step_degrees));
        }
        if !(ANGLE_MIN..=ANGLE_MAX).contains(&self.home_angle) {
            return Err(ConfigError::InvalidHomeAngle(self.home_angle));
        }
        Ok(())
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

/// Current mount angles in degrees, each within `[0, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimState {
    pub pan_angle: f64,
    pub tilt_angle: f64,
}

/// Receives the mount angles; at most one call per cycle.
pub trait Actuator {
    fn apply(&mut self, state: AimState) -> anyhow::Result<()>;
}

pub struct AimController {
    config: AimConfig,
    state: AimState,
}

impl AimController {
    pub fn new(config: AimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = AimState {
            pan_angle: config.home_angle,
            tilt_angle: config.home_angle,
        };
        Ok(Self { config, state })
    }

    pub fn state(&self) -> AimState {
        self.state
    }

    /// Aim at `joint` if it is detected in `snapshot`.
    pub fn track(&mut self, snapshot: &PoseSnapshot, joint: Joint) -> Option<AimState> {
        let position = snapshot.locate(joint)?;
        Some(self.update(position))
    }

    /// One control step toward `target`.
    pub fn update(&mut self, target: Position) -> AimState {
        let step = self.config.step_degrees;

        // Joint right of the band → pan toward it by decreasing the angle.
        let pan = -f64::from(self.config.pan_dead_band.side(target.x)) * step;
        // Joint below the band → tilt down by increasing the angle.
        let tilt = f64::from(self.config.tilt_dead_band.side(target.y)) * step;

        self.state.pan_angle = clamp_angle(self.state.pan_angle + pan);
        self.state.tilt_angle = clamp_angle(self.state.tilt_angle + tilt);

        if pan != 0.0 || tilt != 0.0 {
            debug!(
                x = target.x,
                y = target.y,
                pan = self.state.pan_angle,
                tilt = self.state.tilt_angle,
                "aim adjusted"
            );
        }
        self.state
    }

    /// Return the tilt axis to its home angle.
    pub fn recenter_tilt(&mut self) -> AimState {
        self.state.tilt_angle = self.config.home_angle;
        self.state
    }
}

fn clamp_angle(angle: f64) -> f64 {
    angle.clamp(ANGLE_MIN, ANGLE_MAX)
}
