use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{BUBBLE_RADIUS, WATER_LEVEL};

pub mod constants {
    pub const SWIM_DRAIN_PER_TICK: f32 = 1.0 / 900.0;
    pub const SWIM_REFILL_PER_TICK: f32 = 0.04;
    /// Height above the water level below which a detached player counts as swimming
    pub const SWIM_SURFACE_MARGIN: f32 = 1.1;
    /// Distance inside the bubble edge that already counts as leaving it
    pub const BUBBLE_EDGE_MARGIN: f32 = 0.25;
    /// Swim HUD updates are sent at least this often
    pub const SWIM_SEND_INTERVAL: u64 = 20;
    /// Minimum energy change that triggers a swim HUD update
    pub const SWIM_SEND_DELTA: f32 = 0.01;
}

use constants::*;

/// Land lookup supplied by the terrain collaborator.
pub trait IslandMask: Send + Sync {
    fn is_island_base(&self, x: f32, z: f32) -> bool;
}

/// Terrain without islands.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOcean;

impl IslandMask for OpenOcean {
    fn is_island_base(&self, _x: f32, _z: f32) -> bool {
        false
    }
}

#[derive(Resource)]
pub struct TerrainQuery(pub Box<dyn IslandMask>);

impl Default for TerrainQuery {
    fn default() -> Self {
        Self(Box::new(OpenOcean))
    }
}

impl TerrainQuery {
    pub fn is_island_base(&self, x: f32, z: f32) -> bool {
        self.0.is_island_base(x, z)
    }
}

pub fn is_swimming(attached: bool, over_island: bool, y: f32) -> bool {
    !attached && !over_island && y <= WATER_LEVEL + SWIM_SURFACE_MARGIN
}

pub fn left_bubble(position: Vec3, centre: Vec2) -> bool {
    Vec2::new(position.x, position.z).distance(centre) >= BUBBLE_RADIUS - BUBBLE_EDGE_MARGIN
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwimEnergyUpdate {
    pub value: f32,
    pub in_water: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SwimOutcome {
    pub send: Option<SwimEnergyUpdate>,
    pub depleted: bool,
}

#[derive(Component, Debug, Clone)]
pub struct SwimEnergy {
    value: f32,
    last_sent: Option<f32>,
}

impl Default for SwimEnergy {
    fn default() -> Self {
        Self {
            value: 1.0,
            last_sent: None,
        }
    }
}

impl SwimEnergy {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn refill(&mut self) {
        self.value = 1.0;
    }

    /// Drain while swimming, refill otherwise. Depletion forces a HUD update.
    pub fn tick(&mut self, in_water: bool, tick: u64) -> SwimOutcome {
        self.value = if in_water {
            (self.value - SWIM_DRAIN_PER_TICK).max(0.0)
        } else {
            (self.value + SWIM_REFILL_PER_TICK).min(1.0)
        };
        let depleted = in_water && self.value <= 0.0;
        SwimOutcome {
            send: self.hud_update(in_water, depleted, tick),
            depleted,
        }
    }

    pub fn hud_update(
        &mut self,
        in_water: bool,
        force: bool,
        tick: u64,
    ) -> Option<SwimEnergyUpdate> {
        let moved = self
            .last_sent
            .is_none_or(|last| (self.value - last).abs() > SWIM_SEND_DELTA);
        if !(force || moved || tick % SWIM_SEND_INTERVAL == 0) {
            return None;
        }
        self.last_sent = Some(self.value);
        Some(SwimEnergyUpdate {
            value: self.value,
            in_water,
        })
    }
}
