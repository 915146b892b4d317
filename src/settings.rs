//! Game settings and tuning
//!
//! Loaded from a JSON file; any missing field falls back to its default.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::InputMode;

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Player actuation model, selected once per player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    /// Adjust linear velocity directly, saturating at max speed
    #[default]
    Velocity,
    /// Apply a linear force scaled by body mass
    Force,
    /// Apply a torque so the ball rolls
    Torque,
}

impl ControllerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerKind::Velocity => "velocity",
            ControllerKind::Force => "force",
            ControllerKind::Torque => "torque",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "velocity" | "vel" => Some(ControllerKind::Velocity),
            "force" => Some(ControllerKind::Force),
            "torque" | "roll" => Some(ControllerKind::Torque),
            _ => None,
        }
    }
}

/// Time value contributed by each segment kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeValues {
    pub start: u64,
    pub straight: u64,
    pub turn: u64,
    pub goal: u64,
}

impl Default for TimeValues {
    fn default() -> Self {
        Self {
            start: 60,
            straight: 90,
            turn: 120,
            goal: 60,
        }
    }
}

/// Track segment geometry and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Segment footprint along world X
    pub width: f32,
    /// Vertical distance between levels
    pub height: f32,
    /// Segment footprint along world Z
    pub depth: f32,
    /// Floor slab thickness
    pub floor_thickness: f32,
    pub wall_height: f32,
    pub wall_thickness: f32,
    /// Added to every segment's world height
    pub vertical_offset: f32,
    /// Level used by the built-in layouts
    pub level: i32,
    pub time_values: TimeValues,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 10.0,
            depth: 10.0,
            floor_thickness: 1.0,
            wall_height: 2.0,
            wall_thickness: 0.5,
            vertical_offset: 0.0,
            level: 1,
            time_values: TimeValues::default(),
        }
    }
}

impl TrackSettings {
    /// Lattice pitch as (width, height, depth)
    pub fn pitch(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }
}

/// Player marble tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub radius: f32,
    pub mass: f32,
    pub controller: ControllerKind,
    /// Velocity controller saturation (units/s)
    pub max_speed: f32,
    /// Vertical velocity set by a jump
    pub jump_power: f32,
    /// Upper bound for any command intensity
    pub max_intensity: f32,
    /// Intensity used when a command carries none
    pub velocity_step: f32,
    pub force_step: f32,
    pub torque_step: f32,
    /// Spawn height above the first segment
    pub spawn_height: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            radius: 1.0,
            mass: 1.0,
            controller: ControllerKind::Velocity,
            max_speed: 20.0,
            jump_power: 15.0,
            max_intensity: 50.0,
            velocity_step: 1.0,
            force_step: 1.0,
            torque_step: 10.0,
            spawn_height: 2.0,
        }
    }
}

impl PlayerSettings {
    /// Default intensity for the configured controller
    pub fn default_intensity(&self) -> f32 {
        match self.controller {
            ControllerKind::Velocity => self.velocity_step,
            ControllerKind::Force => self.force_step,
            ControllerKind::Torque => self.torque_step,
        }
    }
}

/// Goal sphere tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalSettings {
    pub radius: f32,
    pub mass: f32,
    /// Spawn height above the last segment
    pub spawn_height: f32,
}

impl Default for GoalSettings {
    fn default() -> Self {
        Self {
            radius: 3.5,
            mass: 1.0,
            spawn_height: 3.0,
        }
    }
}

/// World-level physics and bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub gravity: f32,
    pub ground_width: f32,
    pub ground_depth: f32,
    /// Height of the fail plane
    pub ground_height: f32,
    /// Player spawn when the course has no segments
    pub fallback_spawn: Vec3,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: -9.82,
            ground_width: 100.0,
            ground_depth: 100.0,
            ground_height: 0.0,
            fallback_spawn: Vec3::new(0.0, 10.0, 0.0),
        }
    }
}

/// Follow camera tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub height_offset: f32,
    pub back_offset: f32,
    /// Exponential approach rate (1/s)
    pub follow_rate: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            height_offset: 29.0,
            back_offset: 3.0,
            // 1 - e^(-rate/60) == 0.2, a 20% lerp per 60 Hz frame
            follow_rate: 13.39,
        }
    }
}

/// Input device tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub mode: InputMode,
    /// Tilt (degrees) ignored around rest
    pub gyro_deadzone: f32,
    /// Intensity per degree of tilt beyond the dead-zone
    pub gyro_sensitivity: f32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            mode: InputMode::Keyboard,
            gyro_deadzone: 5.0,
            gyro_sensitivity: 0.05,
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub track: TrackSettings,
    pub player: PlayerSettings,
    pub goal: GoalSettings,
    pub world: WorldSettings,
    pub camera: CameraSettings,
    pub input: InputSettings,
}

impl Settings {
    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults when the file is unusable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default settings ({})", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("track.width", self.track.width),
            ("track.height", self.track.height),
            ("track.depth", self.track.depth),
            ("track.floor_thickness", self.track.floor_thickness),
            ("player.radius", self.player.radius),
            ("player.mass", self.player.mass),
            ("player.max_speed", self.player.max_speed),
            ("player.max_intensity", self.player.max_intensity),
            ("goal.radius", self.goal.radius),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(SettingsError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let non_negative = [
            ("goal.mass", self.goal.mass),
            ("camera.follow_rate", self.camera.follow_rate),
            ("track.wall_height", self.track.wall_height),
            ("track.wall_thickness", self.track.wall_thickness),
            ("input.gyro_deadzone", self.input.gyro_deadzone),
            ("input.gyro_sensitivity", self.input.gyro_sensitivity),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(SettingsError::Invalid(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}
