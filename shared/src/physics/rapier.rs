//! Rapier physics integration for the raft session.
//!
//! Bundles for the raft hull, loose beams and the player character, plus the collision
//! groups and the plugin that steps Rapier at the simulation tick rate.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::raft::config::{constants::*, RaftParams};
use crate::raft::structure::BrokenBeam;
use crate::raft::{BeamSensor, Debris, FloatingBeam, RaftDeck, RaftMaster};

/// Character and world physics constants.
pub mod constants {
    /// Gravity acceleration (m/s²) - negative for downward
    pub const GRAVITY: f32 = -20.0;
    /// Maximum fall speed (terminal velocity)
    pub const TERMINAL_VELOCITY: f32 = 50.0;
    /// Jump impulse velocity
    pub const JUMP_VELOCITY: f32 = 8.0;
    /// Default player movement speed
    pub const PLAYER_SPEED: f32 = 5.0;
    /// Swim speed multiplier
    pub const SWIM_SPEED: f32 = 0.7;
    /// Fraction of gravity felt while swimming
    pub const SWIM_GRAVITY_SCALE: f32 = 0.3;
    /// Fastest sinking speed in water
    pub const SWIM_MAX_FALL_SPEED: f32 = -2.0;
    /// Upward speed while holding jump in water
    pub const SWIM_RISE_SPEED: f32 = 2.0;
    /// Fraction of horizontal speed lost per second while falling
    pub const AIR_DRAG: f32 = 0.2;
    /// Walk input felt in the air, as acceleration over walk speed per second.
    /// Equal to `AIR_DRAG` so steady input settles at walk speed.
    pub const AIR_CONTROL: f32 = 0.2;
    /// Player hitbox
    pub const PLAYER_WIDTH: f32 = 0.8;
    pub const PLAYER_HEIGHT: f32 = 1.8;
}

/// Collision groups used by the session.
pub mod collision_groups {
    use bevy_rapier3d::prelude::Group;

    /// Player entities
    pub const PLAYER: Group = Group::GROUP_1;
    /// World/terrain colliders
    pub const WORLD: Group = Group::GROUP_2;
    /// Raft deck and beam sensors
    pub const RAFT: Group = Group::GROUP_3;
    /// Detached beams and floating collectibles
    pub const DEBRIS: Group = Group::GROUP_4;
    /// Hazards such as the shark
    pub const HAZARD: Group = Group::GROUP_5;
}

/// Mass and inertia of the whole hull, lumped at the body origin.
pub fn hull_mass_properties(mass: f32) -> MassProperties {
    let half = Vec3::new(
        (MAX_BEAMS as f32 - 1.0) * BEAM_SPACING / 2.0 + BEAM_HALF_WIDTH,
        BEAM_HALF_HEIGHT,
        BEAM_LENGTH / 2.0,
    );
    MassProperties {
        local_center_of_mass: Vec3::ZERO,
        mass,
        principal_inertia: Vec3::new(
            mass / 3.0 * (half.y * half.y + half.z * half.z),
            mass / 3.0 * (half.x * half.x + half.z * half.z),
            mass / 3.0 * (half.x * half.x + half.y * half.y),
        ),
        ..default()
    }
}

/// Bundle for the raft master body. Colliders live on child entities.
#[derive(Bundle)]
pub struct RaftMasterBundle {
    pub body: RigidBody,
    pub transform: Transform,
    pub velocity: Velocity,
    pub mass: AdditionalMassProperties,
    pub read_mass: ReadMassProperties,
    pub gravity_scale: GravityScale,
    pub damping: Damping,
    // Yaw locked, roll and pitch left to the buoyancy response
    pub locked_axes: LockedAxes,
    pub impulse: ExternalImpulse,
    pub sleeping: Sleeping,
    pub marker: RaftMaster,
}

impl RaftMasterBundle {
    pub fn new(position: Vec3, params: &RaftParams) -> Self {
        Self {
            body: RigidBody::Dynamic,
            transform: Transform::from_translation(position),
            velocity: Velocity::zero(),
            mass: AdditionalMassProperties::MassProperties(hull_mass_properties(params.mass)),
            read_mass: ReadMassProperties::default(),
            gravity_scale: GravityScale(params.gravity_scale),
            damping: Damping {
                linear_damping: params.linear_damping,
                angular_damping: params.angular_damping,
            },
            locked_axes: LockedAxes::ROTATION_LOCKED_Y,
            impulse: ExternalImpulse::default(),
            sleeping: Sleeping::disabled(),
            marker: RaftMaster,
        }
    }
}

/// Massless deck collider spanning the occupied beams.
#[derive(Bundle)]
pub struct RaftDeckBundle {
    pub collider: Collider,
    pub transform: Transform,
    pub density: ColliderMassProperties,
    pub friction: Friction,
    pub restitution: Restitution,
    pub events: ActiveEvents,
    pub collision_groups: CollisionGroups,
    pub deck: RaftDeck,
}

impl RaftDeckBundle {
    pub fn new(origin_x: f32, half_x: f32) -> Self {
        Self {
            collider: Collider::cuboid(half_x, BEAM_HALF_HEIGHT, BEAM_LENGTH / 2.0),
            transform: Transform::from_xyz(origin_x, 0.0, 0.0),
            density: ColliderMassProperties::Density(0.0),
            friction: Friction::coefficient(1.0),
            restitution: Restitution::coefficient(0.0),
            events: ActiveEvents::COLLISION_EVENTS,
            collision_groups: CollisionGroups::new(
                collision_groups::RAFT,
                collision_groups::PLAYER
                    | collision_groups::WORLD
                    | collision_groups::DEBRIS
                    | collision_groups::HAZARD,
            ),
            deck: RaftDeck,
        }
    }
}

/// Sensor over one beam slot, reporting contact with solid terrain.
#[derive(Bundle)]
pub struct BeamSensorBundle {
    pub collider: Collider,
    pub sensor: Sensor,
    pub transform: Transform,
    pub density: ColliderMassProperties,
    pub events: ActiveEvents,
    pub collision_groups: CollisionGroups,
    pub beam: BeamSensor,
}

impl BeamSensorBundle {
    pub fn new(slot: usize, offset_x: f32) -> Self {
        Self {
            collider: Collider::cuboid(BEAM_HALF_WIDTH, BEAM_HALF_HEIGHT, BEAM_LENGTH / 2.0),
            sensor: Sensor,
            transform: Transform::from_xyz(offset_x, 0.0, 0.0),
            density: ColliderMassProperties::Density(0.0),
            events: ActiveEvents::COLLISION_EVENTS,
            collision_groups: CollisionGroups::new(collision_groups::RAFT, collision_groups::WORLD),
            beam: BeamSensor { slot },
        }
    }
}

/// Bundle for a beam that broke off the hull.
#[derive(Bundle)]
pub struct DebrisBundle {
    pub body: RigidBody,
    pub collider: Collider,
    pub transform: Transform,
    pub velocity: Velocity,
    pub mass: AdditionalMassProperties,
    pub read_mass: ReadMassProperties,
    pub damping: Damping,
    pub friction: Friction,
    pub restitution: Restitution,
    pub impulse: ExternalImpulse,
    pub events: ActiveEvents,
    pub collision_groups: CollisionGroups,
    pub debris: Debris,
    pub floating: FloatingBeam,
}

impl DebrisBundle {
    pub fn from_broken(beam: &BrokenBeam) -> Self {
        Self {
            body: RigidBody::Dynamic,
            collider: Collider::cuboid(BEAM_HALF_WIDTH, BEAM_HALF_HEIGHT, BEAM_LENGTH / 2.0),
            transform: Transform::from_translation(beam.position).with_rotation(beam.rotation),
            velocity: Velocity {
                linvel: beam.linvel,
                angvel: beam.angvel,
            },
            mass: AdditionalMassProperties::Mass(DEBRIS_MASS),
            read_mass: ReadMassProperties::default(),
            damping: Damping {
                linear_damping: 1.2,
                angular_damping: 2.0,
            },
            friction: Friction::coefficient(0.9),
            restitution: Restitution::coefficient(0.0),
            impulse: ExternalImpulse::default(),
            events: ActiveEvents::COLLISION_EVENTS,
            collision_groups: CollisionGroups::new(collision_groups::DEBRIS, Group::ALL),
            debris: Debris,
            floating: FloatingBeam,
        }
    }
}

/// Bundle for creating the player character.
#[derive(Bundle)]
pub struct PlayerPhysicsBundle {
    pub body: RigidBody,
    pub collider: Collider,
    pub controller: KinematicCharacterController,
    pub friction: Friction,
    pub restitution: Restitution,
    pub collision_groups: CollisionGroups,
}

impl PlayerPhysicsBundle {
    /// Capsule of the given hitbox, moved by the character controller.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            body: RigidBody::KinematicPositionBased,
            collider: Collider::capsule_y(height / 2.0 - width / 2.0, width / 2.0),
            controller: KinematicCharacterController {
                snap_to_ground: Some(CharacterLength::Absolute(0.2)),
                ..default()
            },
            friction: Friction::coefficient(0.0),
            restitution: Restitution::coefficient(0.0),
            collision_groups: CollisionGroups::new(
                collision_groups::PLAYER,
                collision_groups::WORLD | collision_groups::RAFT | collision_groups::DEBRIS,
            ),
        }
    }

    pub fn default_player() -> Self {
        Self::new(constants::PLAYER_WIDTH, constants::PLAYER_HEIGHT)
    }
}

/// Solid terrain. Beam sensors touching one of these break their beam.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TerrainCollider;

/// Bundle for spawning a patch of solid blocks.
#[derive(Bundle)]
pub struct TerrainColliderBundle {
    pub collider: Collider,
    pub transform: Transform,
    pub terrain: TerrainCollider,
    pub collision_groups: CollisionGroups,
}

impl TerrainColliderBundle {
    /// Create a compound collider from block positions relative to `origin`.
    pub fn from_solid_blocks(origin: Vec3, blocks: &[IVec3]) -> Option<Self> {
        if blocks.is_empty() {
            return None;
        }

        let shapes: Vec<(Vec3, Quat, Collider)> = blocks
            .iter()
            .map(|block| {
                (
                    block.as_vec3() + crate::constants::HALF_BLOCK,
                    Quat::IDENTITY,
                    Collider::cuboid(0.5, 0.5, 0.5),
                )
            })
            .collect();

        Some(Self {
            collider: Collider::compound(shapes),
            transform: Transform::from_translation(origin),
            terrain: TerrainCollider,
            collision_groups: CollisionGroups::new(
                collision_groups::WORLD,
                Group::ALL, // World collides with everything
            ),
        })
    }
}

/// Plugin that sets up Rapier physics in the fixed schedule.
pub struct RaftPhysicsPlugin;

impl Plugin for RaftPhysicsPlugin {
    fn build(&self, app: &mut App) {
        // Step Rapier in FixedPostUpdate so it advances exactly once per simulation tick,
        // after every impulse of the tick has been written.
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule());

        // RapierConfiguration is a component on the context entity.
        app.add_systems(Startup, configure_rapier_context);
    }
}

fn configure_rapier_context(mut query: Query<&mut RapierConfiguration>) {
    for mut config in query.iter_mut() {
        config.gravity = Vec3::new(0.0, constants::GRAVITY, 0.0);
        config.physics_pipeline_active = true;
        config.query_pipeline_active = true;
    }
}
