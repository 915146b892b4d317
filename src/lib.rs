//! Marble Course - A rolling-ball obstacle course game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track layout, run state, scoring, engine loop)
//! - `physics`: Physics boundary plus the rapier3d backend
//! - `renderer`: Render boundary (renderables, camera, per-frame instances)
//! - `platform`: Keyboard/gyroscope input mapping
//! - `settings`: Data-driven configuration
//! - `results`: In-session leaderboard of finished runs

pub mod physics;
pub mod platform;
pub mod renderer;
pub mod results;
pub mod settings;
pub mod sim;

pub use results::RunHistory;
pub use settings::{ControllerKind, Settings};

use glam::{IVec3, Quat, Vec3};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation rate (logical ticks per second)
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;

    /// Stable body ids for the singleton entities
    pub const PLAYER_ID: &str = "player";
    pub const GOAL_ID: &str = "goal";
    pub const GROUND_ID: &str = "ground";
}

/// Convert a tick count to seconds at the fixed simulation rate
#[inline]
pub fn ticks_to_seconds(ticks: u64) -> f32 {
    ticks as f32 / consts::TICKS_PER_SECOND as f32
}

/// Map a grid cell to world space on a fixed-pitch lattice.
///
/// Planar `x`/`y` become world `x`/`z`; `z` (the level) becomes height.
#[inline]
pub fn grid_to_world(cell: IVec3, pitch: Vec3, vertical_offset: f32) -> Vec3 {
    Vec3::new(
        cell.x as f32 * pitch.x,
        cell.z as f32 * pitch.y + vertical_offset,
        cell.y as f32 * pitch.z,
    )
}

/// Rotation about the vertical axis by a number of clockwise quarter turns
/// (viewed from above, with north along -Z and east along +X)
#[inline]
pub fn quarter_turns(turns: u8) -> Quat {
    Quat::from_rotation_y(-((turns % 4) as f32) * std::f32::consts::FRAC_PI_2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_cells_map_to_lattice() {
        let pos = grid_to_world(IVec3::new(3, -5, 1), Vec3::new(10.0, 10.0, 10.0), 0.5);
        assert_eq!(pos, Vec3::new(30.0, 10.5, -50.0));
    }

    #[test]
    fn quarter_turn_points_north_to_east() {
        let east = quarter_turns(1) * Vec3::NEG_Z;
        assert!((east - Vec3::X).length() < 1e-5);
        let south = quarter_turns(2) * Vec3::NEG_Z;
        assert!((south - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn seconds_from_ticks() {
        assert_eq!(ticks_to_seconds(120), 2.0);
    }
}
