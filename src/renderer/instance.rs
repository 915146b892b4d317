//! Per-entity render records

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::BodyId;
use crate::sim::track::SegmentKind;

/// What a renderable represents; the renderer picks meshes and materials from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RenderKind {
    Ground { width: f32, depth: f32 },
    Segment { kind: SegmentKind },
    Player { radius: f32 },
    Goal { radius: f32 },
}

impl RenderKind {
    /// Compact tag stored in [`RenderInstance::kind`]
    pub fn code(&self) -> u32 {
        match self {
            RenderKind::Ground { .. } => 0,
            RenderKind::Segment { kind } => 1 + *kind as u32,
            RenderKind::Player { .. } => 16,
            RenderKind::Goal { .. } => 17,
        }
    }
}

/// Registered once per entity when the world is built
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub id: BodyId,
    pub kind: RenderKind,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Transform of one entity for one frame, ready for an instance buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderInstance {
    pub position: [f32; 3],
    pub kind: u32,
    pub rotation: [f32; 4],
}

impl RenderInstance {
    pub fn new(kind: &RenderKind, position: Vec3, rotation: Quat) -> Self {
        Self {
            position: position.to_array(),
            kind: kind.code(),
            rotation: rotation.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_array(self.rotation)
    }
}
