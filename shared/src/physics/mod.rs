pub mod movement;
pub mod rapier;

pub use rapier::{
    collision_groups, constants, BeamSensorBundle, DebrisBundle, PlayerPhysicsBundle,
    RaftDeckBundle, RaftMasterBundle, RaftPhysicsPlugin, TerrainCollider, TerrainColliderBundle,
};
