//! Render boundary
//!
//! The engine hands the renderer entity transforms and a camera; meshes,
//! materials, textures and projection are the renderer's business.

pub mod instance;

use glam::Vec3;

pub use instance::{RenderInstance, RenderKind, Renderable};

/// Consumer of per-frame world state
pub trait RenderSink {
    /// Register an entity once, at world build time
    fn add_renderable(&mut self, renderable: &Renderable);

    fn set_camera_transform(&mut self, position: Vec3, look_at: Vec3);

    /// Draw one frame; `instances` follows registration order
    fn render_frame(&mut self, instances: &[RenderInstance]);
}

/// Renderer that keeps what it was given, for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    pub renderables: Vec<Renderable>,
    pub camera_position: Vec3,
    pub camera_look_at: Vec3,
    pub last_frame: Vec<RenderInstance>,
    pub frames: u64,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSink for FrameRecorder {
    fn add_renderable(&mut self, renderable: &Renderable) {
        self.renderables.push(renderable.clone());
    }

    fn set_camera_transform(&mut self, position: Vec3, look_at: Vec3) {
        self.camera_position = position;
        self.camera_look_at = look_at;
    }

    fn render_frame(&mut self, instances: &[RenderInstance]) {
        self.last_frame.clear();
        self.last_frame.extend_from_slice(instances);
        self.frames += 1;
    }
}
