//! Platform input mapping
//!
//! Turns raw device input into the discrete command stream the engine
//! consumes. Device capture itself (key events, orientation sensors,
//! permission prompts) lives outside the crate; callers pick an
//! [`InputMode`] before the run starts and feed readings in.

use serde::{Deserialize, Serialize};

/// Which device drives the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Keyboard,
    Gyroscope,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Keyboard => "keyboard",
            InputMode::Gyroscope => "gyroscope",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keyboard" | "keys" => Some(InputMode::Keyboard),
            "gyroscope" | "gyro" => Some(InputMode::Gyroscope),
            _ => None,
        }
    }
}

/// Command vocabulary understood by every movement controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Stop,
}

/// One discrete input command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputCommand {
    pub action: Action,
    /// Controller default is used when absent
    pub intensity: Option<f32>,
}

impl InputCommand {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            intensity: None,
        }
    }

    pub fn with_intensity(action: Action, intensity: f32) -> Self {
        Self {
            action,
            intensity: Some(intensity),
        }
    }
}

/// Map a key name to a command (`w`/`s`/`a`/`d`, arrows, space, `c`)
pub fn keyboard_command(key: &str) -> Option<InputCommand> {
    let action = match key {
        "w" | "W" | "ArrowUp" => Action::Forward,
        "s" | "S" | "ArrowDown" => Action::Backward,
        "a" | "A" | "ArrowLeft" => Action::Left,
        "d" | "D" | "ArrowRight" => Action::Right,
        " " | "Space" => Action::Jump,
        "c" | "C" => Action::Stop,
        _ => return None,
    };
    Some(InputCommand::new(action))
}

/// Converts device tilt into directional commands
#[derive(Debug, Clone, Copy)]
pub struct GyroMapper {
    /// Degrees of tilt ignored around rest
    pub deadzone: f32,
    /// Intensity per degree beyond the dead-zone
    pub sensitivity: f32,
}

impl GyroMapper {
    pub fn new(deadzone: f32, sensitivity: f32) -> Self {
        Self {
            deadzone: deadzone.max(0.0),
            sensitivity: sensitivity.max(0.0),
        }
    }

    /// `beta` is front/back tilt (positive = top edge away from the user),
    /// `gamma` is left/right tilt (positive = right edge down), both in degrees.
    pub fn commands(&self, beta: f32, gamma: f32) -> Vec<InputCommand> {
        let mut out = Vec::with_capacity(2);
        if let Some(intensity) = self.intensity(beta) {
            let action = if beta > 0.0 { Action::Forward } else { Action::Backward };
            out.push(InputCommand::with_intensity(action, intensity));
        }
        if let Some(intensity) = self.intensity(gamma) {
            let action = if gamma > 0.0 { Action::Right } else { Action::Left };
            out.push(InputCommand::with_intensity(action, intensity));
        }
        out
    }

    fn intensity(&self, tilt: f32) -> Option<f32> {
        if !tilt.is_finite() {
            return None;
        }
        let excess = tilt.abs() - self.deadzone;
        (excess > 0.0).then(|| excess * self.sensitivity)
    }
}
