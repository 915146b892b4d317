//! Demo driver that steers the player along the course
//!
//! Walks the segment centres in traversal order and emits directional
//! commands from the gap between the wanted and the actual velocity.

use glam::{Vec2, Vec3};

use super::track::Course;
use crate::platform::{Action, InputCommand};
use crate::settings::TrackSettings;

#[derive(Debug, Clone)]
pub struct Autopilot {
    waypoints: Vec<Vec2>,
    next: usize,
    /// Horizontal distance at which a waypoint counts as reached
    pub reach: f32,
    /// Target rolling speed
    pub cruise_speed: f32,
    /// Largest intensity emitted per command
    pub max_step: f32,
}

impl Autopilot {
    pub fn new(course: &Course, track: &TrackSettings) -> Self {
        let waypoints = course
            .segments()
            .iter()
            .map(|segment| {
                let p = segment.world_position(track);
                Vec2::new(p.x, p.z)
            })
            .collect();
        Self {
            waypoints,
            next: 0,
            reach: 2.0,
            cruise_speed: 10.0,
            max_step: 1.0,
        }
    }

    /// Index of the waypoint being chased
    pub fn next_waypoint(&self) -> usize {
        self.next
    }

    /// Chasing the goal segment
    pub fn on_final_leg(&self) -> bool {
        self.next + 1 >= self.waypoints.len()
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Commands for one tick given the player's position and velocity
    pub fn steer(&mut self, position: Vec3, velocity: Vec3) -> Vec<InputCommand> {
        let here = Vec2::new(position.x, position.z);
        while let Some(target) = self.waypoints.get(self.next) {
            if here.distance(*target) > self.reach || self.next + 1 == self.waypoints.len() {
                break;
            }
            self.next += 1;
        }
        let Some(target) = self.waypoints.get(self.next) else {
            return vec![InputCommand::new(Action::Stop)];
        };

        let to_target = *target - here;
        let distance = to_target.length();
        // Ease off when closing in on the final waypoint
        let speed = if self.on_final_leg() {
            self.cruise_speed.min(distance * 2.0)
        } else {
            self.cruise_speed
        };
        let wanted = to_target.normalize_or_zero() * speed;
        let error = wanted - Vec2::new(velocity.x, velocity.z);

        let mut commands = Vec::with_capacity(2);
        if error.x.abs() > 0.05 {
            let action = if error.x > 0.0 { Action::Right } else { Action::Left };
            commands.push(InputCommand::with_intensity(action, error.x.abs().min(self.max_step)));
        }
        // North is -Z
        if error.y.abs() > 0.05 {
            let action = if error.y < 0.0 { Action::Forward } else { Action::Backward };
            commands.push(InputCommand::with_intensity(action, error.y.abs().min(self.max_step)));
        }
        commands
    }
}
