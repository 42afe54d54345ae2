use bevy::prelude::*;

pub mod coupling;
pub mod survival;
pub mod systems;

pub use coupling::{CouplingParams, JumpPhase, PlayerRaftCoupling};
pub use survival::{IslandMask, SwimEnergy, TerrainQuery};
pub use systems::PlayerPlugin;

use crate::physics::PlayerPhysicsBundle;

/// The controlled player character.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Input for one tick, delivered by the input collaborator.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerControl {
    /// Walk intent on the XZ plane
    pub movement: Vec2,
    pub jump_pressed: bool,
}

/// Character velocity integrated by the movement systems.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerMotion {
    pub velocity: Vec3,
    pub grounded: bool,
}

#[derive(Bundle)]
pub struct PlayerBundle {
    pub player: Player,
    pub transform: Transform,
    pub control: PlayerControl,
    pub motion: PlayerMotion,
    pub coupling: PlayerRaftCoupling,
    pub swim: SwimEnergy,
    pub physics: PlayerPhysicsBundle,
}

impl PlayerBundle {
    pub fn new(position: Vec3) -> Self {
        Self {
            player: Player,
            transform: Transform::from_translation(position),
            control: PlayerControl::default(),
            motion: PlayerMotion::default(),
            coupling: PlayerRaftCoupling::default(),
            swim: SwimEnergy::default(),
            physics: PlayerPhysicsBundle::default_player(),
        }
    }
}
