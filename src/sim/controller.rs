//! Player movement controllers
//!
//! One controller is bound to the player body at construction and never
//! swapped. All of them share the command vocabulary; they differ only in how
//! a directional command actuates the body. Forward is -Z, right is +X.

use glam::Vec3;

use crate::physics::{BodyId, PhysicsWorld};
use crate::platform::{Action, InputCommand};
use crate::settings::{ControllerKind, PlayerSettings};

/// Clamp a command intensity into `[0, max]`; non-finite values become 0
#[inline]
pub fn clamp_intensity(value: f32, max: f32) -> f32 {
    if value.is_finite() { value.clamp(0.0, max.max(0.0)) } else { 0.0 }
}

/// Translates movement commands into physics actuation.
///
/// None of these fail: unknown bodies are ignored and intensities are clamped.
pub trait MovementController {
    fn kind(&self) -> ControllerKind;

    /// The body this controller drives
    fn body(&self) -> &BodyId;

    /// Upper bound for any intensity
    fn max_intensity(&self) -> f32;

    fn move_forward(&self, world: &mut dyn PhysicsWorld, intensity: f32);
    fn move_backward(&self, world: &mut dyn PhysicsWorld, intensity: f32);
    fn move_left(&self, world: &mut dyn PhysicsWorld, intensity: f32);
    fn move_right(&self, world: &mut dyn PhysicsWorld, intensity: f32);

    /// Overwrite vertical velocity with `power`
    fn jump(&self, world: &mut dyn PhysicsWorld, power: f32) {
        let power = clamp_intensity(power, self.max_intensity());
        if let Some(mut vel) = world.velocity(self.body()) {
            vel.y = power;
            world.set_velocity(self.body(), vel);
        }
    }

    /// Zero linear and angular velocity
    fn stop(&self, world: &mut dyn PhysicsWorld) {
        world.set_velocity(self.body(), Vec3::ZERO);
        world.set_angular_velocity(self.body(), Vec3::ZERO);
    }
}

/// Adjusts velocity directly, saturating at `max_speed` per axis
#[derive(Debug, Clone)]
pub struct VelocityController {
    body: BodyId,
    max_speed: f32,
    max_intensity: f32,
}

impl VelocityController {
    pub fn new(body: BodyId, max_speed: f32, max_intensity: f32) -> Self {
        Self {
            body,
            max_speed: max_speed.abs(),
            max_intensity,
        }
    }

    /// Push one velocity component toward `sign * max_speed` without crossing it
    fn nudge(&self, world: &mut dyn PhysicsWorld, axis: usize, sign: f32, intensity: f32) {
        let step = clamp_intensity(intensity, self.max_intensity);
        let Some(mut vel) = world.velocity(&self.body) else {
            return;
        };
        let limit = sign * self.max_speed;
        let current = vel[axis];
        if current * sign >= self.max_speed {
            return;
        }
        let next = current + sign * step;
        vel[axis] = if sign > 0.0 { next.min(limit) } else { next.max(limit) };
        world.set_velocity(&self.body, vel);
    }
}

impl MovementController for VelocityController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Velocity
    }

    fn body(&self) -> &BodyId {
        &self.body
    }

    fn max_intensity(&self) -> f32 {
        self.max_intensity
    }

    fn move_forward(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.nudge(world, 2, -1.0, intensity);
    }

    fn move_backward(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.nudge(world, 2, 1.0, intensity);
    }

    fn move_left(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.nudge(world, 0, -1.0, intensity);
    }

    fn move_right(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.nudge(world, 0, 1.0, intensity);
    }
}

/// Applies a linear force of `intensity * mass` along the command axis
#[derive(Debug, Clone)]
pub struct ForceController {
    body: BodyId,
    max_intensity: f32,
}

impl ForceController {
    pub fn new(body: BodyId, max_intensity: f32) -> Self {
        Self {
            body,
            max_intensity,
        }
    }

    fn push(&self, world: &mut dyn PhysicsWorld, dir: Vec3, intensity: f32) {
        let Some(mass) = world.mass(&self.body) else {
            return;
        };
        let intensity = clamp_intensity(intensity, self.max_intensity);
        world.apply_force(&self.body, dir * intensity * mass);
    }
}

impl MovementController for ForceController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Force
    }

    fn body(&self) -> &BodyId {
        &self.body
    }

    fn max_intensity(&self) -> f32 {
        self.max_intensity
    }

    fn move_forward(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.push(world, Vec3::NEG_Z, intensity);
    }

    fn move_backward(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.push(world, Vec3::Z, intensity);
    }

    fn move_left(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.push(world, Vec3::NEG_X, intensity);
    }

    fn move_right(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.push(world, Vec3::X, intensity);
    }
}

/// Applies a torque of `intensity * mass` so the ball rolls in the command direction
#[derive(Debug, Clone)]
pub struct TorqueController {
    body: BodyId,
    max_intensity: f32,
}

impl TorqueController {
    pub fn new(body: BodyId, max_intensity: f32) -> Self {
        Self {
            body,
            max_intensity,
        }
    }

    fn twist(&self, world: &mut dyn PhysicsWorld, axis: Vec3, intensity: f32) {
        let Some(mass) = world.mass(&self.body) else {
            return;
        };
        let intensity = clamp_intensity(intensity, self.max_intensity);
        world.apply_torque(&self.body, axis * intensity * mass);
    }
}

impl MovementController for TorqueController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Torque
    }

    fn body(&self) -> &BodyId {
        &self.body
    }

    fn max_intensity(&self) -> f32 {
        self.max_intensity
    }

    // Rolling toward -Z spins about -X; rolling toward -X spins about +Z
    fn move_forward(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.twist(world, Vec3::NEG_X, intensity);
    }

    fn move_backward(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.twist(world, Vec3::X, intensity);
    }

    fn move_left(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.twist(world, Vec3::Z, intensity);
    }

    fn move_right(&self, world: &mut dyn PhysicsWorld, intensity: f32) {
        self.twist(world, Vec3::NEG_Z, intensity);
    }
}

/// Build the controller selected in settings
pub fn controller_for(body: BodyId, settings: &PlayerSettings) -> Box<dyn MovementController> {
    match settings.controller {
        ControllerKind::Velocity => Box::new(VelocityController::new(
            body,
            settings.max_speed,
            settings.max_intensity,
        )),
        ControllerKind::Force => Box::new(ForceController::new(body, settings.max_intensity)),
        ControllerKind::Torque => Box::new(TorqueController::new(body, settings.max_intensity)),
    }
}

/// Apply one input command through a controller.
///
/// `default_intensity` fills in for directional commands without one and
/// `jump_power` for jumps without one.
pub fn dispatch(
    controller: &dyn MovementController,
    world: &mut dyn PhysicsWorld,
    command: &InputCommand,
    default_intensity: f32,
    jump_power: f32,
) {
    let intensity = command.intensity.unwrap_or(default_intensity);
    match command.action {
        Action::Forward => controller.move_forward(world, intensity),
        Action::Backward => controller.move_backward(world, intensity),
        Action::Left => controller.move_left(world, intensity),
        Action::Right => controller.move_right(world, intensity),
        Action::Jump => controller.jump(world, command.intensity.unwrap_or(jump_power)),
        Action::Stop => controller.stop(world),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyDesc, RapierWorld};
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn world_with_ball(mass: f32) -> (RapierWorld, BodyId) {
        let mut world = RapierWorld::new(Vec3::ZERO);
        let id = BodyId::new("player");
        world.add_body(id.clone(), BodyDesc::sphere(1.0, mass));
        (world, id)
    }

    fn all_kinds(body: &BodyId) -> Vec<Box<dyn MovementController>> {
        [ControllerKind::Velocity, ControllerKind::Force, ControllerKind::Torque]
            .into_iter()
            .map(|kind| {
                let settings = PlayerSettings {
                    controller: kind,
                    ..Default::default()
                };
                controller_for(body.clone(), &settings)
            })
            .collect()
    }

    #[test]
    fn jump_overwrites_vertical_velocity() {
        let (mut world, id) = world_with_ball(1.0);
        for controller in all_kinds(&id) {
            world.set_velocity(&id, Vec3::new(1.0, -3.0, 2.0));
            controller.jump(&mut world, 10.0);
            controller.jump(&mut world, 4.0);
            assert_eq!(world.velocity(&id), Some(Vec3::new(1.0, 4.0, 2.0)), "{:?}", controller.kind());
        }
    }

    #[test]
    fn stop_zeroes_everything() {
        let (mut world, id) = world_with_ball(1.0);
        world.set_velocity(&id, Vec3::new(3.0, 1.0, -2.0));
        world.set_angular_velocity(&id, Vec3::new(0.5, 0.0, 0.5));
        for controller in all_kinds(&id) {
            controller.stop(&mut world);
            assert_eq!(world.velocity(&id), Some(Vec3::ZERO));
            assert_eq!(world.angular_velocity(&id), Some(Vec3::ZERO));
        }
    }

    #[test]
    fn velocity_controller_saturates() {
        let (mut world, id) = world_with_ball(1.0);
        let controller = VelocityController::new(id.clone(), 5.0, 50.0);
        controller.move_forward(&mut world, 3.0);
        assert_eq!(world.velocity(&id).unwrap().z, -3.0);
        controller.move_forward(&mut world, 3.0);
        assert_eq!(world.velocity(&id).unwrap().z, -5.0);
        controller.move_forward(&mut world, 3.0);
        assert_eq!(world.velocity(&id).unwrap().z, -5.0);
        controller.move_right(&mut world, 2.0);
        assert_eq!(world.velocity(&id).unwrap().x, 2.0);
    }

    #[test]
    fn velocity_controller_leaves_overspeed_alone() {
        let (mut world, id) = world_with_ball(1.0);
        world.set_velocity(&id, Vec3::new(0.0, 0.0, -30.0));
        let controller = VelocityController::new(id.clone(), 20.0, 50.0);
        controller.move_forward(&mut world, 1.0);
        assert_eq!(world.velocity(&id).unwrap().z, -30.0);
        controller.move_backward(&mut world, 1.0);
        assert_eq!(world.velocity(&id).unwrap().z, -29.0);
    }

    #[test]
    fn force_controller_scales_with_mass() {
        let (mut world, id) = world_with_ball(2.0);
        let controller = ForceController::new(id.clone(), 50.0);
        controller.move_right(&mut world, 3.0);
        world.step(DT, &mut Vec::new());
        // F = 3 * 2, a = F / m = 3
        let vx = world.velocity(&id).unwrap().x;
        assert!((vx - 3.0 * DT).abs() < 1e-3, "vx = {vx}");
    }

    #[test]
    fn torque_controller_spins_instead_of_pushing() {
        let (mut world, id) = world_with_ball(1.0);
        let controller = TorqueController::new(id.clone(), 50.0);
        controller.move_forward(&mut world, 10.0);
        world.step(DT, &mut Vec::new());
        assert!(world.angular_velocity(&id).unwrap().x < 0.0);
        assert!(world.velocity(&id).unwrap().length() < 1e-4);
    }

    #[test]
    fn bad_intensities_are_clamped() {
        assert_eq!(clamp_intensity(f32::NAN, 10.0), 0.0);
        assert_eq!(clamp_intensity(-4.0, 10.0), 0.0);
        assert_eq!(clamp_intensity(400.0, 10.0), 10.0);

        let (mut world, id) = world_with_ball(1.0);
        let controller = VelocityController::new(id.clone(), 100.0, 10.0);
        controller.move_left(&mut world, 1_000.0);
        assert_eq!(world.velocity(&id).unwrap().x, -10.0);
        controller.move_left(&mut world, -5.0);
        assert_eq!(world.velocity(&id).unwrap().x, -10.0);
    }

    #[test]
    fn dispatch_uses_defaults() {
        let (mut world, id) = world_with_ball(1.0);
        let controller = VelocityController::new(id.clone(), 20.0, 50.0);
        dispatch(&controller, &mut world, &InputCommand::new(Action::Backward), 2.0, 15.0);
        dispatch(&controller, &mut world, &InputCommand::new(Action::Jump), 2.0, 15.0);
        assert_eq!(world.velocity(&id), Some(Vec3::new(0.0, 15.0, 2.0)));
        dispatch(&controller, &mut world, &InputCommand::new(Action::Stop), 2.0, 15.0);
        assert_eq!(world.velocity(&id), Some(Vec3::ZERO));
    }

    #[test]
    fn missing_body_is_ignored() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        for controller in all_kinds(&BodyId::new("nobody")) {
            controller.move_forward(&mut world, 1.0);
            controller.jump(&mut world, 5.0);
            controller.stop(&mut world);
        }
        assert_eq!(world.body_count(), 0);
    }

    proptest! {
        #[test]
        fn forward_never_exceeds_max_speed(
            steps in proptest::collection::vec(0.0f32..40.0, 1..60),
            max_speed in 1.0f32..30.0,
        ) {
            let (mut world, id) = world_with_ball(1.0);
            let controller = VelocityController::new(id.clone(), max_speed, 50.0);
            for step in steps {
                controller.move_forward(&mut world, step);
                let vz = world.velocity(&id).unwrap().z;
                prop_assert!(vz >= -max_speed && vz <= 0.0);
            }
        }
    }
}
