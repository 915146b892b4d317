//! Track layout: grid cells, segments, and course construction
//!
//! A course is an ordered list of segments on an integer grid. `x`/`y` are
//! planar (north is -y), `z` is the level. Each segment kind has a fixed set of
//! walled edges when facing north; its orientation rotates that set clockwise.

use std::collections::HashMap;
use std::fmt;

use glam::{IVec3, Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::physics::{BodyDesc, BodyId, Collider, Shape};
use crate::settings::TrackSettings;
use crate::{grid_to_world, quarter_turns};

/// Track construction errors (authoring mistakes, not runtime conditions)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("grid position {0} is already occupied")]
    Occupied(GridPosition),

    #[error("grid position {0} is outside the addressable grid")]
    OutOfRange(GridPosition),

    #[error("a course needs at least one segment")]
    Empty,
}

/// Integer grid cell of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
    /// Vertical level
    pub z: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Canonical map key: three 16-bit lanes packed into one integer
    pub fn key(&self) -> Result<u64, LayoutError> {
        let lane = |v: i32| i16::try_from(v).map(|v| v as u16 as u64);
        match (lane(self.x), lane(self.y), lane(self.z)) {
            (Ok(x), Ok(y), Ok(z)) => Ok((x << 32) | (y << 16) | z),
            _ => Err(LayoutError::OutOfRange(*self)),
        }
    }

    /// Neighbouring cell on the same level
    pub fn step(&self, heading: Orientation) -> Self {
        let (dx, dy) = heading.offset();
        Self::new(self.x + dx, self.y + dy, self.z)
    }

    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Compass direction: a segment's facing, a travel heading, or one of its edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    /// Clockwise quarter turns from north
    pub fn quarter_turns(self) -> u8 {
        match self {
            Orientation::North => 0,
            Orientation::East => 1,
            Orientation::South => 2,
            Orientation::West => 3,
        }
    }

    fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns % 4) as usize]
    }

    pub fn clockwise(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 1)
    }

    pub fn counter_clockwise(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 3)
    }

    pub fn opposite(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 2)
    }

    /// Rotate a north-relative direction into a frame facing `facing`
    pub fn rotated_by(self, facing: Orientation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + facing.quarter_turns())
    }

    /// Planar grid offset of one step in this direction
    pub fn offset(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, -1),
            Orientation::East => (1, 0),
            Orientation::South => (0, 1),
            Orientation::West => (-1, 0),
        }
    }

    /// Direction from one cell to an adjacent cell on the same level
    pub fn between(from: GridPosition, to: GridPosition) -> Option<Self> {
        if from.z != to.z {
            return None;
        }
        let delta = (to.x - from.x, to.y - from.y);
        Self::ALL.into_iter().find(|o| o.offset() == delta)
    }
}

/// Segment variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    Start,
    Straight,
    TurnLeft,
    TurnRight,
    Goal,
}

impl SegmentKind {
    /// Walled edges when the segment faces north
    pub fn walls(self) -> &'static [Orientation] {
        use Orientation::*;
        match self {
            SegmentKind::Straight => &[East, West],
            SegmentKind::Start => &[East, West, South],
            SegmentKind::Goal => &[East, West, North],
            SegmentKind::TurnLeft => &[North, East],
            SegmentKind::TurnRight => &[North, West],
        }
    }

    pub fn time_value(self, settings: &TrackSettings) -> u64 {
        let values = &settings.time_values;
        match self {
            SegmentKind::Start => values.start,
            SegmentKind::Straight => values.straight,
            SegmentKind::TurnLeft | SegmentKind::TurnRight => values.turn,
            SegmentKind::Goal => values.goal,
        }
    }
}

/// One placed unit of track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub position: GridPosition,
    pub kind: SegmentKind,
    pub orientation: Orientation,
    /// Contribution to the course time budget, in ticks
    pub time_value: u64,
}

impl TrackSegment {
    pub fn new(
        position: GridPosition,
        kind: SegmentKind,
        orientation: Orientation,
        time_value: u64,
    ) -> Self {
        Self {
            position,
            kind,
            orientation,
            time_value,
        }
    }

    pub fn body_id(&self) -> BodyId {
        let p = self.position;
        BodyId::new(format!("track-block-{}-{}-{}", p.x, p.y, p.z))
    }

    /// Walled edges in world directions
    pub fn closed_edges(&self) -> Vec<Orientation> {
        self.kind
            .walls()
            .iter()
            .map(|edge| edge.rotated_by(self.orientation))
            .collect()
    }

    /// Edges the player can roll through, in world directions
    pub fn open_edges(&self) -> Vec<Orientation> {
        let closed = self.closed_edges();
        Orientation::ALL
            .into_iter()
            .filter(|edge| !closed.contains(edge))
            .collect()
    }

    pub fn world_position(&self, settings: &TrackSettings) -> Vec3 {
        grid_to_world(
            self.position.as_ivec3(),
            settings.pitch(),
            settings.vertical_offset,
        )
    }

    pub fn rotation(&self) -> Quat {
        quarter_turns(self.orientation.quarter_turns())
    }

    /// Floor slab plus one wall per closed edge, in the segment's local frame
    pub fn colliders(&self, settings: &TrackSettings) -> Vec<Collider> {
        // Local footprint, so that after rotation it spans width x depth in the world
        let (w, d) = if self.orientation.quarter_turns() % 2 == 1 {
            (settings.depth, settings.width)
        } else {
            (settings.width, settings.depth)
        };
        let floor = settings.floor_thickness;
        let (wall_h, wall_t) = (settings.wall_height, settings.wall_thickness);
        let wall_y = floor / 2.0 + wall_h / 2.0;

        let mut colliders = vec![Collider::new(Shape::Cuboid {
            half_extents: Vec3::new(w / 2.0, floor / 2.0, d / 2.0),
        })];
        if wall_h <= 0.0 || wall_t <= 0.0 {
            return colliders;
        }
        for edge in self.kind.walls() {
            let (offset, half_extents) = match edge {
                Orientation::North | Orientation::South => {
                    let z = d / 2.0 - wall_t / 2.0;
                    let z = if *edge == Orientation::North { -z } else { z };
                    (Vec3::new(0.0, wall_y, z), Vec3::new(w / 2.0, wall_h / 2.0, wall_t / 2.0))
                }
                Orientation::East | Orientation::West => {
                    let x = w / 2.0 - wall_t / 2.0;
                    let x = if *edge == Orientation::West { -x } else { x };
                    (Vec3::new(x, wall_y, 0.0), Vec3::new(wall_t / 2.0, wall_h / 2.0, d / 2.0))
                }
            };
            colliders.push(Collider::at(Shape::Cuboid { half_extents }, offset));
        }
        colliders
    }

    /// Static physics body for this segment
    pub fn body_desc(&self, settings: &TrackSettings) -> BodyDesc {
        BodyDesc::fixed(self.colliders(settings))
            .with_position(self.world_position(settings))
            .with_rotation(self.rotation())
    }
}

/// Mutable course under construction; insertion order is traversal order
#[derive(Debug, Clone, Default)]
pub struct TrackMap {
    segments: Vec<TrackSegment>,
    index: HashMap<u64, usize>,
}

impl TrackMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a segment; an occupied cell is refused and the map is unchanged
    pub fn insert(&mut self, segment: TrackSegment) -> Result<(), LayoutError> {
        let key = segment.position.key()?;
        if self.index.contains_key(&key) {
            return Err(LayoutError::Occupied(segment.position));
        }
        self.index.insert(key, self.segments.len());
        self.segments.push(segment);
        Ok(())
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        position
            .key()
            .map(|k| self.index.contains_key(&k))
            .unwrap_or(false)
    }

    pub fn get(&self, position: GridPosition) -> Option<&TrackSegment> {
        let key = position.key().ok()?;
        self.index.get(&key).map(|&i| &self.segments[i])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Freeze the map into a course and fix its time budget
    pub fn finalize(self) -> Result<Course, LayoutError> {
        if self.segments.is_empty() {
            return Err(LayoutError::Empty);
        }
        let max_time_budget = self
            .segments
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.time_value));
        Ok(Course {
            segments: self.segments,
            index: self.index,
            max_time_budget,
        })
    }
}

/// A finished, immutable course
#[derive(Debug, Clone, Default)]
pub struct Course {
    segments: Vec<TrackSegment>,
    index: HashMap<u64, usize>,
    max_time_budget: u64,
}

impl Course {
    /// Segments in traversal order
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// First segment (the start, unless tagged otherwise)
    pub fn first(&self) -> Option<&TrackSegment> {
        self.segments.first()
    }

    /// Last segment (the goal, unless tagged otherwise)
    pub fn last(&self) -> Option<&TrackSegment> {
        self.segments.last()
    }

    pub fn get(&self, position: GridPosition) -> Option<&TrackSegment> {
        let key = position.key().ok()?;
        self.index.get(&key).map(|&i| &self.segments[i])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of segment time values, fixed at finalisation
    pub fn max_time_budget(&self) -> u64 {
        self.max_time_budget
    }
}

/// Lays a course out by walking the grid: each piece is placed at the
/// cursor, facing the current heading, and the cursor moves on.
#[derive(Debug)]
pub struct CourseBuilder<'a> {
    settings: &'a TrackSettings,
    map: TrackMap,
    cursor: GridPosition,
    heading: Orientation,
}

impl<'a> CourseBuilder<'a> {
    pub fn new(settings: &'a TrackSettings, origin: GridPosition, heading: Orientation) -> Self {
        Self {
            settings,
            map: TrackMap::new(),
            cursor: origin,
            heading,
        }
    }

    pub fn cursor(&self) -> GridPosition {
        self.cursor
    }

    pub fn heading(&self) -> Orientation {
        self.heading
    }

    /// Whether the cell is still free
    pub fn is_free(&self, position: GridPosition) -> bool {
        !self.map.contains(position)
    }

    fn place(&mut self, kind: SegmentKind) -> Result<(), LayoutError> {
        let segment = TrackSegment::new(
            self.cursor,
            kind,
            self.heading,
            kind.time_value(self.settings),
        );
        self.map.insert(segment)
    }

    pub fn start(&mut self) -> Result<&mut Self, LayoutError> {
        self.place(SegmentKind::Start)?;
        self.cursor = self.cursor.step(self.heading);
        Ok(self)
    }

    pub fn straight(&mut self, count: usize) -> Result<&mut Self, LayoutError> {
        for _ in 0..count {
            self.place(SegmentKind::Straight)?;
            self.cursor = self.cursor.step(self.heading);
        }
        Ok(self)
    }

    pub fn turn_left(&mut self) -> Result<&mut Self, LayoutError> {
        self.place(SegmentKind::TurnLeft)?;
        self.heading = self.heading.counter_clockwise();
        self.cursor = self.cursor.step(self.heading);
        Ok(self)
    }

    pub fn turn_right(&mut self) -> Result<&mut Self, LayoutError> {
        self.place(SegmentKind::TurnRight)?;
        self.heading = self.heading.clockwise();
        self.cursor = self.cursor.step(self.heading);
        Ok(self)
    }

    pub fn goal(&mut self) -> Result<&mut Self, LayoutError> {
        self.place(SegmentKind::Goal)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Course, LayoutError> {
        self.map.finalize()
    }
}

/// Built-in courses
pub struct TrackLayout;

impl TrackLayout {
    /// The authored course: a loop of straights and turns from start to goal
    pub fn standard(settings: &TrackSettings) -> Result<Course, LayoutError> {
        let origin = GridPosition::new(-1, 1, settings.level);
        let mut builder = CourseBuilder::new(settings, origin, Orientation::North);
        builder
            .start()?
            .turn_right()?
            .straight(3)?
            .turn_left()?
            .straight(4)?
            .turn_right()?
            .straight(2)?
            .turn_right()?
            .straight(5)?
            .goal()?;
        let course = builder.build()?;
        log::debug!(
            "Standard course: {} segments, budget {} ticks",
            course.len(),
            course.max_time_budget()
        );
        Ok(course)
    }

    /// A straight run from a start to a goal
    pub fn straight(settings: &TrackSettings, length: usize) -> Result<Course, LayoutError> {
        let origin = GridPosition::new(0, 0, settings.level);
        let mut builder = CourseBuilder::new(settings, origin, Orientation::North);
        builder.start()?.straight(length)?.goal()?;
        builder.build()
    }

    /// Seeded random walk of straight runs and turns that never revisits a cell.
    ///
    /// A run or the whole walk ends early when the way ahead is blocked; the
    /// course always ends with a goal.
    pub fn procedural(
        settings: &TrackSettings,
        seed: u64,
        runs: usize,
    ) -> Result<Course, LayoutError> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let origin = GridPosition::new(0, 0, settings.level);
        let mut builder = CourseBuilder::new(settings, origin, Orientation::North);
        builder.start()?;

        // The cursor cell is always free; each piece is placed only if the
        // cell it leads into is free as well.
        'walk: for _ in 0..runs {
            let length = rng.random_range(1..=4);
            for _ in 0..length {
                let ahead = builder.cursor().step(builder.heading());
                if !builder.is_free(ahead) {
                    break;
                }
                builder.straight(1)?;
            }

            let left_first: bool = rng.random();
            let heading = builder.heading();
            let options = if left_first {
                [heading.counter_clockwise(), heading.clockwise()]
            } else {
                [heading.clockwise(), heading.counter_clockwise()]
            };
            let cursor = builder.cursor();
            let Some(exit) = options
                .into_iter()
                .find(|&dir| builder.is_free(cursor.step(dir)))
            else {
                break 'walk;
            };
            if exit == heading.clockwise() {
                builder.turn_right()?;
            } else {
                builder.turn_left()?;
            }
        }

        builder.goal()?;
        let course = builder.build()?;
        log::debug!(
            "Procedural course (seed {}): {} segments, budget {} ticks",
            seed,
            course.len(),
            course.max_time_budget()
        );
        Ok(course)
    }
}
