//! Physics boundary
//!
//! The engine never owns rigid-body dynamics. It talks to a [`PhysicsWorld`]
//! through stable string ids, steps it once per tick, and receives contact
//! pairs synchronously from that step. [`RapierWorld`] is the rapier3d
//! backend used by the binary and the tests.

pub mod world;

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use world::RapierWorld;

/// Stable identifier of a physics body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(String);

impl BodyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BodyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Collision shape, in body-local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    /// Axis-aligned box given by half extents
    Cuboid { half_extents: Vec3 },
    /// Infinite horizontal plane with +Y normal through the body origin
    Plane,
}

/// A shape placed at an offset from the body origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    pub offset: Vec3,
}

impl Collider {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
        }
    }

    pub fn at(shape: Shape, offset: Vec3) -> Self {
        Self { shape, offset }
    }
}

/// Description of a body before it is added to the world
#[derive(Debug, Clone)]
pub struct BodyDesc {
    /// Zero mass marks a static body
    pub mass: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub colliders: Vec<Collider>,
    /// Continuous collision detection, for bodies fast enough to skip walls
    pub ccd: bool,
}

impl BodyDesc {
    /// A static (mass = 0) body
    pub fn fixed(colliders: Vec<Collider>) -> Self {
        Self {
            mass: 0.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            colliders,
            ccd: false,
        }
    }

    /// A dynamic sphere
    pub fn sphere(radius: f32, mass: f32) -> Self {
        Self {
            mass: mass.max(0.0),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            colliders: vec![Collider::new(Shape::Sphere { radius })],
            ccd: false,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_ccd(mut self, ccd: bool) -> Self {
        self.ccd = ccd;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}

/// Two bodies touching during a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub a: BodyId,
    pub b: BodyId,
}

impl Contact {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        Self { a, b }
    }

    /// The side that is not `id`, if `id` is involved at all
    pub fn other(&self, id: &BodyId) -> Option<&BodyId> {
        if &self.a == id {
            Some(&self.b)
        } else if &self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Everything the engine needs from a rigid-body simulation.
///
/// Calls naming an unknown body are ignored; getters return `None`.
pub trait PhysicsWorld {
    fn add_body(&mut self, id: BodyId, desc: BodyDesc);

    /// Advance by `dt` seconds, appending every contact that began during the step
    fn step(&mut self, dt: f32, contacts: &mut Vec<Contact>);

    fn position(&self, id: &BodyId) -> Option<Vec3>;
    fn rotation(&self, id: &BodyId) -> Option<Quat>;
    fn velocity(&self, id: &BodyId) -> Option<Vec3>;
    fn angular_velocity(&self, id: &BodyId) -> Option<Vec3>;
    fn mass(&self, id: &BodyId) -> Option<f32>;

    fn set_position(&mut self, id: &BodyId, position: Vec3);
    fn set_velocity(&mut self, id: &BodyId, velocity: Vec3);
    fn set_angular_velocity(&mut self, id: &BodyId, angular_velocity: Vec3);

    /// Continuous force, applied during the next step only
    fn apply_force(&mut self, id: &BodyId, force: Vec3);
    /// Continuous torque, applied during the next step only
    fn apply_torque(&mut self, id: &BodyId, torque: Vec3);

    fn body_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_other_side() {
        let c = Contact::new("player".into(), "goal".into());
        assert_eq!(c.other(&"player".into()), Some(&BodyId::new("goal")));
        assert_eq!(c.other(&"goal".into()), Some(&BodyId::new("player")));
        assert_eq!(c.other(&"ground".into()), None);
    }

    #[test]
    fn fixed_bodies_are_static() {
        assert!(BodyDesc::fixed(vec![Collider::new(Shape::Plane)]).is_static());
        assert!(!BodyDesc::sphere(1.0, 1.0).is_static());
        assert!(BodyDesc::sphere(1.0, -3.0).is_static());
    }
}
