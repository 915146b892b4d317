//! Chase camera above and behind the player

use glam::Vec3;

use crate::settings::CameraSettings;

/// Smoothed follow camera; looks at the player, trails toward an offset point
#[derive(Debug, Clone)]
pub struct FollowCamera {
    pub position: Vec3,
    pub look_at: Vec3,
    height_offset: f32,
    back_offset: f32,
    /// Exponential approach rate per second
    follow_rate: f32,
}

impl FollowCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            position: Vec3::new(0.0, settings.height_offset, settings.back_offset),
            look_at: Vec3::ZERO,
            height_offset: settings.height_offset,
            back_offset: settings.back_offset,
            follow_rate: settings.follow_rate,
        }
    }

    /// Point the camera wants to sit at for a player at `target`
    pub fn desired_position(&self, target: Vec3) -> Vec3 {
        target + Vec3::new(0.0, self.height_offset, self.back_offset)
    }

    /// Move part of the way toward the desired point; framerate independent
    pub fn update(&mut self, target: Vec3, dt: f32) {
        let alpha = (1.0 - (-self.follow_rate * dt).exp()).clamp(0.0, 1.0);
        let desired = self.desired_position(target);
        self.position = self.position.lerp(desired, alpha);
        self.look_at = target;
    }

    /// Jump straight to the desired point
    pub fn snap_to(&mut self, target: Vec3) {
        self.position = self.desired_position(target);
        self.look_at = target;
    }
}
