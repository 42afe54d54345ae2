//! The breakable raft: beam layout, buoyancy and the ECS glue around them.

use bevy::prelude::*;

pub mod buoyancy;
pub mod config;
pub mod layout;
pub mod plugin;
pub mod structure;

pub use buoyancy::{DriftInput, RaftBodySnapshot, RaftImpulse, RaftLoad};
pub use config::RaftParams;
pub use layout::{DeckGeometry, RaftLayout, Side};
pub use plugin::{raft_snapshot, spawn_raft, RaftPlugin};
pub use structure::{RaftStructureState, StructureIntent};

/// The dynamic body carrying the whole hull.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct RaftMaster;

/// Walkable deck collider, child of the master.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct RaftDeck;

/// Sensor collider over beam slot `slot`, child of the master.
#[derive(Component, Debug, Clone, Copy)]
pub struct BeamSensor {
    pub slot: usize,
}

/// Visual follower for a non-centre beam.
#[derive(Component, Debug, Clone, Copy)]
pub struct RaftVisual {
    pub index: usize,
    pub offset_x: f32,
}

/// Whether the master body itself stands in for the centre beam.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RaftVisibility {
    CentreBeamVisible,
    #[default]
    CentreBeamHidden,
}

/// A beam that broke off the hull and floats on its own.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Debris;

/// Loose beam in the water that a [`CollectBeamRequest`] may pull onto the hull.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct FloatingBeam;

/// Ask the raft to absorb a floating beam.
#[derive(Event, Debug, Clone, Copy)]
pub struct CollectBeamRequest {
    pub beam: Entity,
    /// Collector position in raft body space, picks the side the beam is added on
    pub local_offset_hint: Option<Vec3>,
}

/// Answer to a [`CollectBeamRequest`]. The beam entity is despawned when accepted.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamCollectionResult {
    pub beam: Entity,
    pub accepted: bool,
}

/// One-off impulse from a collaborator, folded into the next physics tick.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct RaftShove {
    /// The raft master or a debris body
    pub body: Entity,
    pub point: Vec3,
    pub impulse: Vec3,
}

/// What the player coupling hands to the raft physics this tick.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct RaftPassenger {
    pub load: Option<RaftLoad>,
    pub landing_boost: Option<Vec3>,
}
