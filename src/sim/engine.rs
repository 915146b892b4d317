//! Per-tick game driver
//!
//! Owns the physics and render backends, the course, the player/goal/ground
//! entities and the run state machine. Every tick runs the same sequence:
//! physics step (contacts handled before the step returns), visual sync,
//! camera follow, then the run timer.

use glam::{Quat, Vec3};
use thiserror::Error;

use super::camera::FollowCamera;
use super::collision::{CollisionTargets, RunError, RunStateMachine};
use super::controller::{MovementController, controller_for, dispatch};
use super::state::{GameFinished, RunState};
use super::track::Course;
use crate::consts::{GOAL_ID, GROUND_ID, PLAYER_ID, SIM_DT};
use crate::physics::{BodyDesc, BodyId, Collider, Contact, PhysicsWorld, Shape};
use crate::platform::{GyroMapper, InputCommand, InputMode};
use crate::renderer::{RenderInstance, RenderKind, RenderSink, Renderable};
use crate::settings::Settings;

/// Refused engine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no player entity in the world")]
    NoPlayer,
    #[error("world is already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Run(#[from] RunError),
}

/// A body mirrored to the renderer every frame
#[derive(Debug, Clone)]
struct Tracked {
    id: BodyId,
    kind: RenderKind,
}

/// Dynamic entity with a recorded initial placement
#[derive(Debug, Clone)]
struct Spawned {
    id: BodyId,
    spawn: Vec3,
}

pub struct GameEngine<P: PhysicsWorld, R: RenderSink> {
    settings: Settings,
    physics: P,
    renderer: R,
    course: Option<Course>,
    tracked: Vec<Tracked>,
    player: Option<Spawned>,
    controller: Option<Box<dyn MovementController>>,
    goal: Option<Spawned>,
    targets: CollisionTargets,
    run: RunStateMachine,
    camera: FollowCamera,
    bindings: Option<InputMode>,
    events: Vec<GameFinished>,
    contacts: Vec<Contact>,
    instances: Vec<RenderInstance>,
    ticks: u64,
}

impl<P: PhysicsWorld, R: RenderSink> GameEngine<P, R> {
    pub fn new(settings: Settings, physics: P, renderer: R) -> Self {
        let camera = FollowCamera::new(&settings.camera);
        Self {
            settings,
            physics,
            renderer,
            course: None,
            tracked: Vec::new(),
            player: None,
            controller: None,
            goal: None,
            targets: CollisionTargets {
                goal: BodyId::new(GOAL_ID),
                ground: BodyId::new(GROUND_ID),
            },
            run: RunStateMachine::new(0),
            camera,
            bindings: None,
            events: Vec::new(),
            contacts: Vec::new(),
            instances: Vec::new(),
            ticks: 0,
        }
    }

    /// Build ground, track, player and goal, and register them for rendering.
    ///
    /// The player spawns above the first segment and the goal sits above the
    /// last; an empty course falls back to the configured spawn point and
    /// gets no goal.
    pub fn initialize_world(&mut self, course: Course) -> Result<(), EngineError> {
        if self.course.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        let track = self.settings.track.clone();
        let world = self.settings.world.clone();

        let ground_pos = Vec3::new(0.0, world.ground_height, 0.0);
        self.add_entity(
            BodyId::new(GROUND_ID),
            BodyDesc::fixed(vec![Collider::new(Shape::Plane)]).with_position(ground_pos),
            RenderKind::Ground {
                width: world.ground_width,
                depth: world.ground_depth,
            },
        );

        for segment in course.segments() {
            self.add_entity(
                segment.body_id(),
                segment.body_desc(&track),
                RenderKind::Segment { kind: segment.kind },
            );
        }

        let player_spawn = match course.first() {
            Some(first) => first.world_position(&track) + Vec3::Y * self.settings.player.spawn_height,
            None => {
                log::warn!("Course has no segments, spawning player at {}", world.fallback_spawn);
                world.fallback_spawn
            }
        };
        let player_id = BodyId::new(PLAYER_ID);
        let radius = self.settings.player.radius;
        self.add_entity(
            player_id.clone(),
            BodyDesc::sphere(radius, self.settings.player.mass)
                .with_position(player_spawn)
                .with_ccd(true),
            RenderKind::Player { radius },
        );
        self.controller = Some(controller_for(player_id.clone(), &self.settings.player));
        self.player = Some(Spawned {
            id: player_id,
            spawn: player_spawn,
        });

        if let Some(last) = course.last() {
            let goal_spawn = last.world_position(&track) + Vec3::Y * self.settings.goal.spawn_height;
            let goal_id = BodyId::new(GOAL_ID);
            let radius = self.settings.goal.radius;
            self.add_entity(
                goal_id.clone(),
                BodyDesc::sphere(radius, self.settings.goal.mass).with_position(goal_spawn),
                RenderKind::Goal { radius },
            );
            self.goal = Some(Spawned {
                id: goal_id,
                spawn: goal_spawn,
            });
        }

        self.run = RunStateMachine::new(course.max_time_budget());
        self.camera.snap_to(player_spawn);
        log::info!(
            "World built: {} segments, budget {} ticks, {} bodies",
            course.len(),
            course.max_time_budget(),
            self.physics.body_count()
        );
        self.course = Some(course);
        Ok(())
    }

    fn add_entity(&mut self, id: BodyId, desc: BodyDesc, kind: RenderKind) {
        self.renderer.add_renderable(&Renderable {
            id: id.clone(),
            kind,
            position: desc.position,
            rotation: desc.rotation,
        });
        self.physics.add_body(id.clone(), desc);
        self.tracked.push(Tracked { id, kind });
    }

    /// Establish input bindings and start the run
    pub fn begin_run(&mut self) -> Result<(), EngineError> {
        let player = self.player.as_ref().ok_or(EngineError::NoPlayer)?.id.clone();
        self.run.start(player)?;
        self.bindings = Some(self.settings.input.mode);
        log::info!(
            "Run started ({} input, {} controller)",
            self.settings.input.mode.as_str(),
            self.settings.player.controller.as_str()
        );
        Ok(())
    }

    /// Apply one command to the player's controller; false when no
    /// bindings exist yet
    pub fn apply_input(&mut self, command: &InputCommand) -> bool {
        if self.bindings.is_none() {
            return false;
        }
        let Some(controller) = self.controller.as_deref() else {
            return false;
        };
        dispatch(
            controller,
            &mut self.physics,
            command,
            self.settings.player.default_intensity(),
            self.settings.player.jump_power,
        );
        true
    }

    /// Feed a device tilt reading; only honoured under gyroscope bindings
    pub fn apply_tilt(&mut self, beta: f32, gamma: f32) -> bool {
        if self.bindings != Some(InputMode::Gyroscope) {
            return false;
        }
        let input = &self.settings.input;
        let mapper = GyroMapper::new(input.gyro_deadzone, input.gyro_sensitivity);
        for command in mapper.commands(beta, gamma) {
            self.apply_input(&command);
        }
        true
    }

    /// Deliver one contact pair from outside the physics step
    pub fn handle_collision(&mut self, a: &BodyId, b: &BodyId) {
        if let Some(event) = self.run.on_collision(a, b, &self.targets) {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: GameFinished) {
        log::info!(
            "{}: {:?} after {} ticks, score {}",
            GameFinished::NAME,
            event.status,
            event.final_time,
            event.score
        );
        self.events.push(event);
    }

    /// Advance the world by one fixed step
    pub fn tick(&mut self) {
        self.contacts.clear();
        self.physics.step(SIM_DT, &mut self.contacts);
        if let Some(event) = self.run.on_contacts(&self.contacts, &self.targets) {
            self.emit(event);
        }

        self.instances.clear();
        for entity in &self.tracked {
            let position = self.physics.position(&entity.id).unwrap_or(Vec3::ZERO);
            let rotation = self.physics.rotation(&entity.id).unwrap_or(Quat::IDENTITY);
            self.instances
                .push(RenderInstance::new(&entity.kind, position, rotation));
        }

        if let Some(target) = self.player_position() {
            self.camera.update(target, SIM_DT);
        }
        self.renderer
            .set_camera_transform(self.camera.position, self.camera.look_at);
        self.renderer.render_frame(&self.instances);

        self.run.advance();
        self.ticks += 1;
    }

    /// Return player and goal to their spawns and the run to `NotStarted`
    pub fn restart(&mut self) {
        for entity in [&self.player, &self.goal].into_iter().flatten() {
            self.physics.set_position(&entity.id, entity.spawn);
            self.physics.set_velocity(&entity.id, Vec3::ZERO);
            self.physics.set_angular_velocity(&entity.id, Vec3::ZERO);
        }
        if let Some(player) = &self.player {
            self.camera.snap_to(player.spawn);
        }
        self.run.restart();
        log::debug!("Run reset");
    }

    /// Take the notifications emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameFinished> {
        std::mem::take(&mut self.events)
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    pub fn run_state(&self) -> RunState {
        self.run.state()
    }

    /// Elapsed ticks of the current run
    pub fn current_time(&self) -> u64 {
        self.run.timer().elapsed_ticks()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.run.timer().elapsed_seconds()
    }

    /// Frozen tick count once the run has finished
    pub fn final_time(&self) -> Option<u64> {
        self.run.timer().final_ticks()
    }

    pub fn final_score(&self) -> u64 {
        self.run.final_score()
    }

    pub fn max_time_budget(&self) -> u64 {
        self.run.timer().max_time_budget()
    }

    /// Ticks executed since construction, across runs
    pub fn total_ticks(&self) -> u64 {
        self.ticks
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.physics.position(&self.player.as_ref()?.id)
    }

    pub fn player_velocity(&self) -> Option<Vec3> {
        self.physics.velocity(&self.player.as_ref()?.id)
    }

    pub fn goal_position(&self) -> Option<Vec3> {
        self.physics.position(&self.goal.as_ref()?.id)
    }

    pub fn player_spawn(&self) -> Option<Vec3> {
        self.player.as_ref().map(|p| p.spawn)
    }

    pub fn input_mode(&self) -> Option<InputMode> {
        self.bindings
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use crate::settings::ControllerKind;
    use crate::platform::Action;
    use crate::renderer::FrameRecorder;
    use crate::sim::state::RunStatus;
    use crate::sim::track::{GridPosition, Orientation, SegmentKind, TrackLayout, TrackMap, TrackSegment};
    use proptest::prelude::*;

    type Engine = GameEngine<RapierWorld, FrameRecorder>;

    fn engine_with(course: Course) -> Engine {
        let settings = Settings::default();
        let physics = RapierWorld::new(Vec3::new(0.0, settings.world.gravity, 0.0));
        let mut engine = GameEngine::new(settings, physics, FrameRecorder::new());
        engine.initialize_world(course).unwrap();
        engine
    }

    /// Three straights and a goal, 100 ticks each
    fn scenario_course() -> Course {
        let mut map = TrackMap::new();
        for y in 0..4 {
            let kind = if y == 3 { SegmentKind::Goal } else { SegmentKind::Straight };
            map.insert(TrackSegment::new(GridPosition::new(0, -y, 1), kind, Orientation::North, 100))
                .unwrap();
        }
        map.finalize().unwrap()
    }

    fn player() -> BodyId {
        BodyId::new(PLAYER_ID)
    }

    #[test]
    fn world_layout_and_spawns() {
        let engine = engine_with(scenario_course());
        // ground + 4 segments + player + goal
        assert_eq!(engine.physics().body_count(), 7);
        assert_eq!(engine.renderer().renderables.len(), 7);
        assert_eq!(engine.player_spawn(), Some(Vec3::new(0.0, 12.0, 0.0)));
        assert_eq!(engine.goal_position(), Some(Vec3::new(0.0, 13.0, -30.0)));
        assert_eq!(engine.max_time_budget(), 400);
        assert_eq!(engine.run_state(), RunState::NotStarted);
    }

    #[test]
    fn scenario_goal_after_120_ticks() {
        let mut engine = engine_with(scenario_course());
        engine.begin_run().unwrap();
        for _ in 0..120 {
            engine.tick();
        }
        engine.handle_collision(&player(), &BodyId::new(GOAL_ID));

        let events = engine.drain_events();
        assert_eq!(
            events,
            vec![GameFinished {
                status: RunStatus::Success,
                final_time: 120,
                score: 280
            }]
        );
        assert_eq!(engine.final_time(), Some(120));
        assert_eq!(engine.final_score(), 280);
        assert_eq!(engine.run_state(), RunState::FinishedSuccess);
    }

    #[test]
    fn scenario_ground_then_nothing_more() {
        let mut engine = engine_with(scenario_course());
        engine.begin_run().unwrap();
        for _ in 0..50 {
            engine.tick();
        }
        engine.handle_collision(&BodyId::new(GROUND_ID), &player());
        for _ in 0..10 {
            engine.tick();
        }
        engine.handle_collision(&player(), &BodyId::new(GROUND_ID));

        let events = engine.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, RunStatus::Failure);
        assert_eq!(events[0].final_time, 50);
        assert_eq!(events[0].score, 0);
        assert_eq!(engine.run_state(), RunState::FinishedFailure);
        assert_eq!(engine.current_time(), 50);
    }

    #[test]
    fn double_jump_overwrites() {
        let mut engine = engine_with(scenario_course());
        engine.begin_run().unwrap();
        engine.apply_input(&InputCommand::with_intensity(Action::Jump, 10.0));
        engine.apply_input(&InputCommand::with_intensity(Action::Jump, 4.0));
        assert_eq!(engine.player_velocity().unwrap().y, 4.0);
    }

    #[test]
    fn input_needs_bindings() {
        let mut engine = engine_with(scenario_course());
        assert!(!engine.apply_input(&InputCommand::new(Action::Jump)));
        assert_eq!(engine.player_velocity(), Some(Vec3::ZERO));
        engine.begin_run().unwrap();
        assert!(engine.apply_input(&InputCommand::new(Action::Jump)));
        assert_eq!(engine.input_mode(), Some(InputMode::Keyboard));
        assert!(!engine.apply_tilt(30.0, 0.0));
    }

    #[test]
    fn tilt_drives_the_player_under_gyro_bindings() {
        let mut settings = Settings::default();
        settings.input.mode = InputMode::Gyroscope;
        let mut engine = GameEngine::new(settings, RapierWorld::new(Vec3::ZERO), FrameRecorder::new());
        engine.initialize_world(scenario_course()).unwrap();
        assert!(!engine.apply_tilt(30.0, 0.0));
        engine.begin_run().unwrap();
        assert!(engine.apply_tilt(30.0, 2.0));
        let vel = engine.player_velocity().unwrap();
        assert!((vel.z + 1.25).abs() < 1e-5, "vz = {}", vel.z);
        assert_eq!(vel.x, 0.0);
    }

    #[test]
    fn begin_run_without_player_is_refused() {
        let settings = Settings::default();
        let mut engine = GameEngine::new(settings, RapierWorld::new(Vec3::ZERO), FrameRecorder::new());
        assert_eq!(engine.begin_run(), Err(EngineError::NoPlayer));
        assert_eq!(engine.run_state(), RunState::NotStarted);
        assert!(engine.input_mode().is_none());
    }

    #[test]
    fn begin_run_twice_is_refused() {
        let mut engine = engine_with(scenario_course());
        engine.begin_run().unwrap();
        assert_eq!(
            engine.begin_run(),
            Err(EngineError::Run(RunError::InvalidTransition { from: RunState::Running }))
        );
    }

    #[test]
    fn world_builds_once() {
        let mut engine = engine_with(scenario_course());
        assert_eq!(
            engine.initialize_world(scenario_course()),
            Err(EngineError::AlreadyInitialized)
        );
    }

    #[test]
    fn empty_course_uses_fallback_spawn() {
        let settings = Settings::default();
        let fallback = settings.world.fallback_spawn;
        let mut engine = GameEngine::new(settings, RapierWorld::new(Vec3::ZERO), FrameRecorder::new());
        engine.initialize_world(Course::default()).unwrap();
        assert_eq!(engine.player_spawn(), Some(fallback));
        assert!(engine.goal_position().is_none());
    }

    #[test]
    fn timer_only_counts_while_running() {
        let mut engine = engine_with(scenario_course());
        for _ in 0..5 {
            engine.tick();
        }
        assert_eq!(engine.current_time(), 0);
        engine.begin_run().unwrap();
        for _ in 0..5 {
            engine.tick();
        }
        assert_eq!(engine.current_time(), 5);
        assert_eq!(engine.total_ticks(), 10);
        assert!((engine.elapsed_seconds() - 5.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn frames_mirror_physics_and_camera_follows() {
        let mut engine = engine_with(scenario_course());
        engine.begin_run().unwrap();
        engine.tick();
        let recorder = engine.renderer();
        assert_eq!(recorder.frames, 1);
        assert_eq!(recorder.last_frame.len(), recorder.renderables.len());
        let player_index = recorder
            .renderables
            .iter()
            .position(|r| r.id.as_str() == PLAYER_ID)
            .unwrap();
        let player_pos = engine.player_position().unwrap();
        assert_eq!(recorder.last_frame[player_index].position(), player_pos);
        assert_eq!(recorder.camera_look_at, player_pos);
        assert!(recorder.camera_position.y > player_pos.y + 20.0);
    }

    #[test]
    fn falling_off_the_track_fails_the_run() {
        let mut engine = engine_with(TrackLayout::straight(&Settings::default().track, 2).unwrap());
        engine.begin_run().unwrap();
        // Shove the ball sideways over the edge, well clear of any wall
        engine
            .physics_mut()
            .set_position(&player(), Vec3::new(30.0, 12.0, 0.0));
        for _ in 0..300 {
            engine.tick();
            if !engine.is_running() {
                break;
            }
        }
        let events = engine.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, RunStatus::Failure);
        assert!(events[0].final_time > 0);
    }

    #[test]
    fn side_walls_keep_the_ball_on_the_track() {
        let mut settings = Settings::default();
        settings.player.controller = ControllerKind::Force;
        let half_width = settings.track.width / 2.0;
        let course = TrackLayout::straight(&settings.track, 2).unwrap();
        let physics = RapierWorld::new(Vec3::new(0.0, settings.world.gravity, 0.0));
        let mut engine = GameEngine::new(settings, physics, FrameRecorder::new());
        engine.initialize_world(course).unwrap();
        engine.begin_run().unwrap();

        for _ in 0..120 {
            engine.apply_input(&InputCommand::with_intensity(Action::Right, 50.0));
            engine.tick();
        }
        let pos = engine.player_position().unwrap();
        assert!(pos.x < half_width, "ball left the track at x = {}", pos.x);
        assert!(engine.is_running());
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn rolling_into_the_goal_succeeds() {
        let mut engine = engine_with(scenario_course());
        engine.begin_run().unwrap();
        engine
            .physics_mut()
            .set_position(&player(), Vec3::new(0.0, 12.0, -24.0));
        for _ in 0..300 {
            engine.apply_input(&InputCommand::new(Action::Forward));
            engine.tick();
            if !engine.is_running() {
                break;
            }
        }
        let events = engine.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, RunStatus::Success);
        assert_eq!(events[0].score, 400 - events[0].final_time);
    }

    #[test]
    fn restart_restores_spawns() {
        let mut engine = engine_with(scenario_course());
        let goal_spawn = engine.goal_position().unwrap();
        engine.begin_run().unwrap();
        for _ in 0..30 {
            engine.apply_input(&InputCommand::new(Action::Right));
            engine.tick();
        }
        engine.handle_collision(&player(), &BodyId::new(GOAL_ID));
        engine.restart();

        assert_eq!(engine.run_state(), RunState::NotStarted);
        assert_eq!(engine.current_time(), 0);
        assert_eq!(engine.final_score(), 0);
        assert_eq!(engine.final_time(), None);
        assert_eq!(engine.player_position(), engine.player_spawn());
        assert_eq!(engine.player_velocity(), Some(Vec3::ZERO));
        assert_eq!(engine.goal_position(), Some(goal_spawn));
        assert!(engine.begin_run().is_ok());
    }

    proptest! {
        #[test]
        fn restart_is_idempotent(ticks in 0usize..90, finish in 0u8..3) {
            let mut engine = engine_with(scenario_course());
            engine.begin_run().unwrap();
            for _ in 0..ticks {
                engine.apply_input(&InputCommand::new(Action::Left));
                engine.tick();
            }
            match finish {
                1 => engine.handle_collision(&player(), &BodyId::new(GOAL_ID)),
                2 => engine.handle_collision(&player(), &BodyId::new(GROUND_ID)),
                _ => {}
            }
            engine.restart();
            let once = (
                engine.run_state(),
                engine.current_time(),
                engine.final_score(),
                engine.player_position(),
                engine.goal_position(),
            );
            engine.restart();
            let twice = (
                engine.run_state(),
                engine.current_time(),
                engine.final_score(),
                engine.player_position(),
                engine.goal_position(),
            );
            prop_assert_eq!(once, twice);
            prop_assert_eq!(engine.run_state(), RunState::NotStarted);
        }

        #[test]
        fn contacts_outside_a_run_change_nothing(ticks in 0usize..40, target in 0u8..2) {
            let mut engine = engine_with(scenario_course());
            let other = if target == 0 { GOAL_ID } else { GROUND_ID };
            engine.handle_collision(&player(), &BodyId::new(other));
            prop_assert_eq!(engine.run_state(), RunState::NotStarted);

            engine.begin_run().unwrap();
            for _ in 0..ticks {
                engine.tick();
            }
            engine.handle_collision(&player(), &BodyId::new(GROUND_ID));
            let frozen = (engine.current_time(), engine.final_score());
            for _ in 0..5 {
                engine.tick();
            }
            engine.handle_collision(&player(), &BodyId::new(other));
            prop_assert_eq!((engine.current_time(), engine.final_score()), frozen);
            prop_assert_eq!(engine.drain_events().len(), 1);
        }
    }
}
