//! Falling boxes on a static floor, simulated with rapier.
//!
//! Rapier owns the bodies, colliders and contact solving. A `hecs` world
//! indexes them: each box is an `(BodyHandle, BoxCollider)` entity and the
//! floor additionally carries [`Static`]. [`Simulation::step`] advances
//! rapier by one fixed step of 1/60 s.

use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, World};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    QueryPipeline, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};

use crate::mesh::Transform;

/// Fixed simulation step in seconds.
pub const FIXED_STEP: f32 = 1.0 / 60.0;

const GRAVITY: f32 = -9.81;
const RESTITUTION: f32 = 0.3;
const FRICTION: f32 = 0.6;

/// Rapier handles of one body and its collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyHandle {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// Box-shaped collision volume, in local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxCollider {
    pub half_extents: Vec3,
}

/// Marker for bodies that never move.
#[derive(Clone, Copy, Debug)]
pub struct Static;

/// Description of the static floor slab.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsFloor {
    /// Height of the floor's top surface.
    pub top: f32,
    pub size: f32,
    pub thickness: f32,
}

impl Default for PhysicsFloor {
    fn default() -> Self {
        Self {
            top: -1.5,
            size: 10.0,
            thickness: 0.2,
        }
    }
}

/// Description of a dynamic box about to be spawned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsBox {
    pub size: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl PhysicsBox {
    pub fn new(size: f32, position: Vec3) -> Self {
        Self {
            size,
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        }
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Motion of a dynamic body, read back from rapier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub sleeping: bool,
}

/// What the renderer needs to draw one body: a unit-cube model matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyView {
    pub model: Mat4,
    pub is_static: bool,
}

/// Everything rapier needs to step.
struct Engine {
    gravity: Vector3<f32>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    queries: QueryPipeline,
}

impl Engine {
    fn new() -> Self {
        let params = IntegrationParameters {
            dt: FIXED_STEP,
            ..Default::default()
        };
        Self {
            gravity: Vector3::new(0.0, GRAVITY, 0.0),
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            queries: QueryPipeline::new(),
        }
    }

    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.queries),
            &(),
            &(),
        );
    }
}

/// The physics world.
pub struct Simulation {
    world: World,
    engine: Engine,
    floor: PhysicsFloor,
    steps: u64,
    spawned: u32,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("bodies", &self.engine.bodies.len())
            .field("floor", &self.floor)
            .field("steps", &self.steps)
            .finish()
    }
}

impl Simulation {
    /// An empty world with only the floor.
    pub fn new(floor: PhysicsFloor) -> Self {
        let mut engine = Engine::new();
        let half = Vec3::new(floor.size, floor.thickness, floor.size) * 0.5;
        let center = Vec3::new(0.0, floor.top - half.y, 0.0);

        let body = engine
            .bodies
            .insert(RigidBodyBuilder::fixed().position(isometry(center, Quat::IDENTITY)));
        let collider = engine.colliders.insert_with_parent(
            ColliderBuilder::cuboid(half.x, half.y, half.z).friction(FRICTION),
            body,
            &mut engine.bodies,
        );

        let mut world = World::new();
        world.spawn((
            BodyHandle { body, collider },
            BoxCollider { half_extents: half },
            Static,
        ));
        Self {
            world,
            engine,
            floor,
            steps: 0,
            spawned: 0,
        }
    }

    /// The demo setup: the floor and a handful of tumbling boxes.
    pub fn with_demo_bodies() -> Self {
        let mut sim = Self::new(PhysicsFloor::default());
        for i in 0..4 {
            let x = -1.2 + i as f32 * 0.9;
            let tilt = Quat::from_euler(glam::EulerRot::XYZ, 0.3 * i as f32, 0.5, 0.2);
            let position = Vec3::new(x, 2.0 + i as f32 * 0.6, -0.8);
            sim.spawn_box(PhysicsBox::new(0.3, position).rotation(tilt));
        }
        sim
    }

    pub fn spawn_box(&mut self, desc: PhysicsBox) -> Entity {
        self.spawned += 1;
        tracing::debug!(position = ?desc.position, size = desc.size, "spawning physics box");

        let spin = Vec3::new(1.0, 0.5, -0.7) * desc.velocity.length().max(1.0);
        let body = self.engine.bodies.insert(
            RigidBodyBuilder::dynamic()
                .position(isometry(desc.position, desc.rotation))
                .linvel(vector(desc.velocity))
                .angvel(vector(spin)),
        );
        let half = desc.size * 0.5;
        let collider = self.engine.colliders.insert_with_parent(
            ColliderBuilder::cuboid(half, half, half)
                .restitution(RESTITUTION)
                .friction(FRICTION),
            body,
            &mut self.engine.bodies,
        );

        self.world.spawn((
            BodyHandle { body, collider },
            BoxCollider {
                half_extents: Vec3::splat(half),
            },
        ))
    }

    /// Drop a box above `point`, nudged sideways so repeated spawns scatter.
    pub fn spawn_above(&mut self, point: Vec3) -> Entity {
        let angle = self.spawned as f32 * 2.399;
        let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * 0.25;
        self.spawn_box(
            PhysicsBox::new(0.3, point + Vec3::Y * 2.5 + offset)
                .rotation(Quat::from_rotation_y(angle)),
        )
    }

    pub fn floor(&self) -> PhysicsFloor {
        self.floor
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Dynamic bodies only.
    pub fn body_count(&self) -> usize {
        self.world
            .query::<&BodyHandle>()
            .without::<&Static>()
            .iter()
            .count()
    }

    /// Placement and motion of a dynamic body.
    pub fn body(&self, entity: Entity) -> Option<(Transform, BodyState)> {
        let handle = *self.world.get::<&BodyHandle>(entity).ok()?;
        let body = self.engine.bodies.get(handle.body)?;
        if body.is_fixed() {
            return None;
        }
        let state = BodyState {
            velocity: glam_vec(body.linvel()),
            angular_velocity: glam_vec(body.angvel()),
            sleeping: body.is_sleeping(),
        };
        Some((transform(body.position()), state))
    }

    /// Every body, static ones included, as unit-cube model matrices.
    pub fn bodies(&self) -> Vec<BodyView> {
        self.world
            .query::<(&BodyHandle, &BoxCollider, Option<&Static>)>()
            .iter()
            .filter_map(|(_, (handle, collider, fixed))| {
                let body = self.engine.bodies.get(handle.body)?;
                let scale = Mat4::from_scale(collider.half_extents * 2.0);
                Some(BodyView {
                    model: transform(body.position()).matrix() * scale,
                    is_static: fixed.is_some(),
                })
            })
            .collect()
    }

    /// Advance one fixed step.
    pub fn step(&mut self) {
        self.engine.step();
        self.steps += 1;
    }
}

fn vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

fn glam_vec(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn isometry(position: Vec3, rotation: Quat) -> Isometry3<f32> {
    let q = Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z);
    Isometry3::from_parts(
        Translation3::new(position.x, position.y, position.z),
        UnitQuaternion::from_quaternion(q),
    )
}

fn transform(iso: &Isometry3<f32>) -> Transform {
    let q = iso.rotation.into_inner().coords;
    Transform::from_position(glam_vec(&iso.translation.vector))
        .rotation(Quat::from_xyzw(q.x, q.y, q.z, q.w))
}
