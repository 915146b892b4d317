//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only (procedural courses)
//! - Stable iteration order (traversal order for segments, registration
//!   order for rendered entities)
//! - Physics and rendering only through their boundary traits

pub mod autopilot;
pub mod camera;
pub mod collision;
pub mod controller;
pub mod engine;
pub mod state;
pub mod track;

pub use autopilot::Autopilot;
pub use camera::FollowCamera;
pub use collision::{CollisionSubscription, CollisionTargets, RunError, RunStateMachine};
pub use controller::{
    ForceController, MovementController, TorqueController, VelocityController, controller_for,
    dispatch,
};
pub use engine::{EngineError, GameEngine};
pub use state::{GameFinished, RunState, RunStatus, ScoreTimer, format_seconds, score_for};
pub use track::{
    Course, CourseBuilder, GridPosition, LayoutError, Orientation, SegmentKind, TrackLayout,
    TrackMap, TrackSegment,
};
