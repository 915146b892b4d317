//! Rapier-backed physics world
//!
//! Wraps the rapier3d pipeline behind [`PhysicsWorld`]. Bodies are looked up
//! by their stable [`BodyId`]; each rapier body carries its index into `ids`
//! as user data so collision events can be mapped back.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::*;

use super::{BodyDesc, BodyId, Contact, PhysicsWorld, Shape};

fn to_na(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_na(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation =
        UnitQuaternion::from_quaternion(Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z));
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}

/// Collects collision events raised inside `PhysicsPipeline::step`
struct EventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl EventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain(&self) -> Vec<CollisionEvent> {
        match self.collisions.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }
}

impl EventHandler for EventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut events) = self.collisions.lock() {
            events.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

struct Entry {
    handle: RigidBodyHandle,
    /// Zero for fixed bodies
    mass: f32,
}

/// Rigid-body world built on rapier3d
pub struct RapierWorld {
    gravity: Vector<Real>,
    /// Applied to bodies added after the change
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: EventCollector,
    ids: Vec<BodyId>,
    entries: HashMap<BodyId, Entry>,
}

impl RapierWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: to_na(gravity),
            linear_damping: 0.01,
            angular_damping: 0.01,
            restitution: 0.3,
            friction: 0.5,
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: EventCollector::new(),
            ids: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        from_na(&self.gravity)
    }

    fn body(&self, id: &BodyId) -> Option<&RigidBody> {
        self.entries.get(id).and_then(|e| self.bodies.get(e.handle))
    }

    fn body_mut(&mut self, id: &BodyId) -> Option<&mut RigidBody> {
        let handle = self.entries.get(id)?.handle;
        self.bodies.get_mut(handle)
    }

    fn collider_owner(&self, handle: ColliderHandle) -> Option<BodyId> {
        let parent = self.colliders.get(handle)?.parent()?;
        let index = self.bodies.get(parent)?.user_data as usize;
        self.ids.get(index).cloned()
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, id: BodyId, desc: BodyDesc) {
        if self.entries.contains_key(&id) {
            log::warn!("Body {} already exists, ignoring", id);
            return;
        }
        let dynamic = !desc.is_static();
        let builder = if dynamic {
            RigidBodyBuilder::dynamic()
                .linear_damping(self.linear_damping)
                .angular_damping(self.angular_damping)
                .ccd_enabled(desc.ccd)
                .can_sleep(false)
        } else {
            RigidBodyBuilder::fixed()
        };
        let rb = builder
            .position(to_isometry(desc.position, desc.rotation))
            .user_data(self.ids.len() as u128)
            .build();
        let handle = self.bodies.insert(rb);

        // Body mass is spread evenly over its colliders
        let share = desc.mass / desc.colliders.len().max(1) as f32;
        for collider in &desc.colliders {
            let builder = match collider.shape {
                Shape::Sphere { radius } => ColliderBuilder::ball(radius),
                Shape::Cuboid { half_extents } => {
                    ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                }
                Shape::Plane => ColliderBuilder::halfspace(Unit::new_normalize(Vector::<Real>::y())),
            };
            let builder = builder
                .translation(to_na(collider.offset))
                .restitution(self.restitution)
                .friction(self.friction)
                .active_events(ActiveEvents::COLLISION_EVENTS);
            let built = if dynamic { builder.mass(share) } else { builder }.build();
            self.colliders
                .insert_with_parent(built, handle, &mut self.bodies);
        }

        self.ids.push(id.clone());
        self.entries.insert(
            id,
            Entry {
                handle,
                mass: if dynamic { desc.mass } else { 0.0 },
            },
        );
    }

    fn step(&mut self, dt: f32, contacts: &mut Vec<Contact>) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        for event in self.event_collector.drain() {
            if let CollisionEvent::Started(h1, h2, _) = event {
                if let (Some(a), Some(b)) = (self.collider_owner(h1), self.collider_owner(h2)) {
                    contacts.push(Contact::new(a, b));
                }
            }
        }

        // Forces and torques last for a single step
        for (_, rb) in self.bodies.iter_mut() {
            if rb.is_dynamic() {
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
        }
    }

    fn position(&self, id: &BodyId) -> Option<Vec3> {
        self.body(id).map(|rb| from_na(rb.translation()))
    }

    fn rotation(&self, id: &BodyId) -> Option<Quat> {
        self.body(id).map(|rb| {
            let q = rb.rotation().coords;
            Quat::from_xyzw(q.x, q.y, q.z, q.w)
        })
    }

    fn velocity(&self, id: &BodyId) -> Option<Vec3> {
        self.body(id).map(|rb| from_na(rb.linvel()))
    }

    fn angular_velocity(&self, id: &BodyId) -> Option<Vec3> {
        self.body(id).map(|rb| from_na(rb.angvel()))
    }

    fn mass(&self, id: &BodyId) -> Option<f32> {
        self.entries.get(id).map(|e| e.mass)
    }

    fn set_position(&mut self, id: &BodyId, position: Vec3) {
        if let Some(rb) = self.body_mut(id) {
            rb.set_translation(to_na(position), true);
        }
    }

    fn set_velocity(&mut self, id: &BodyId, velocity: Vec3) {
        if let Some(rb) = self.body_mut(id).filter(|rb| rb.is_dynamic()) {
            rb.set_linvel(to_na(velocity), true);
        }
    }

    fn set_angular_velocity(&mut self, id: &BodyId, angular_velocity: Vec3) {
        if let Some(rb) = self.body_mut(id).filter(|rb| rb.is_dynamic()) {
            rb.set_angvel(to_na(angular_velocity), true);
        }
    }

    fn apply_force(&mut self, id: &BodyId, force: Vec3) {
        if let Some(rb) = self.body_mut(id) {
            rb.add_force(to_na(force), true);
        }
    }

    fn apply_torque(&mut self, id: &BodyId, torque: Vec3) {
        if let Some(rb) = self.body_mut(id) {
            rb.add_torque(to_na(torque), true);
        }
    }

    fn body_count(&self) -> usize {
        self.entries.len()
    }
}
