use std::collections::VecDeque;

use bevy::prelude::*;

use super::buoyancy::RaftBodySnapshot;
use super::config::constants::DEBRIS_REATTACH_COOLDOWN;
use super::layout::{RaftLayout, Side};
use crate::math::inverse_rotate;

/// Layout change requested by a collision, applied at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureIntent {
    BreakBeam { slot: usize },
    ReattachDebris { debris: Entity },
}

/// Where and how fast a beam left the hull.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokenBeam {
    pub slot: usize,
    pub position: Vec3,
    pub rotation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebrisRecord {
    pub entity: Entity,
    pub cooldown: u32,
}

/// Entities making up one spawned raft.
#[derive(Debug, Clone, Default)]
pub struct RaftEntities {
    pub master: Option<Entity>,
    pub deck: Option<Entity>,
    /// One sensor per potential slot, indexed by slot
    pub sensors: Vec<Entity>,
    pub visuals: Vec<Entity>,
}

/// Beam layout of the raft plus everything that broke off it.
#[derive(Resource, Debug, Default)]
pub struct RaftStructureState {
    pub layout: RaftLayout,
    pub entities: RaftEntities,
    debris: Vec<DebrisRecord>,
    pending: VecDeque<StructureIntent>,
}

impl RaftStructureState {
    pub fn master(&self) -> Option<Entity> {
        self.entities.master
    }

    pub fn is_spawned(&self) -> bool {
        self.entities.master.is_some()
    }

    pub fn debris(&self) -> &[DebrisRecord] {
        &self.debris
    }

    /// Forget the current raft and return every entity that must be despawned.
    pub fn reset_for_spawn(&mut self) -> Vec<Entity> {
        let mut stale: Vec<Entity> = self.entities.master.into_iter().collect();
        // Children go with the master but may outlive it if it was already despawned.
        stale.extend(self.entities.deck);
        stale.extend(self.entities.sensors.drain(..));
        stale.extend(self.entities.visuals.drain(..));
        stale.extend(self.debris.drain(..).map(|d| d.entity));
        self.entities = RaftEntities::default();
        self.pending.clear();
        self.layout.reset();
        stale
    }

    pub fn enqueue(&mut self, intent: StructureIntent) {
        self.pending.push_back(intent);
    }

    pub fn drain_intents(&mut self) -> Vec<StructureIntent> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Remove slot `index` and describe where the freed beam now is.
    pub fn break_beam(&mut self, index: usize, body: &RaftBodySnapshot) -> Option<BrokenBeam> {
        if !self.is_spawned() {
            return None;
        }
        let offset = self.layout.remove(index)?;
        let position = body.world_point(Vec3::new(offset, 0.0, 0.0));
        Some(BrokenBeam {
            slot: index,
            position,
            rotation: body.rotation,
            linvel: body.velocity_at(position),
            angvel: body.angvel,
        })
    }

    /// Track a freshly spawned debris body, blocking reattachment for a while.
    pub fn register_debris(&mut self, entity: Entity) {
        self.debris.push(DebrisRecord {
            entity,
            cooldown: DEBRIS_REATTACH_COOLDOWN,
        });
    }

    pub fn forget_debris(&mut self, entity: Entity) {
        self.debris.retain(|d| d.entity != entity);
    }

    pub fn retain_debris(&mut self, mut alive: impl FnMut(Entity) -> bool) {
        self.debris.retain(|d| alive(d.entity));
    }

    pub fn tick_cooldowns(&mut self) {
        for d in &mut self.debris {
            d.cooldown = d.cooldown.saturating_sub(1);
        }
    }

    pub fn debris_ready(&self, entity: Entity) -> bool {
        self.debris
            .iter()
            .any(|d| d.entity == entity && d.cooldown == 0)
    }

    /// Add a floating beam to the hull on the side the collector stands on, or the side
    /// the beam lies on when there is no collector hint.
    pub fn collect_floating_beam(
        &mut self,
        beam_position: Vec3,
        local_offset_hint: Option<Vec3>,
        body: &RaftBodySnapshot,
    ) -> bool {
        if !self.is_spawned() || self.layout.is_full() {
            return false;
        }
        let local_x = match local_offset_hint {
            Some(hint) => hint.x,
            None => inverse_rotate(beam_position - body.position, body.rotation).x,
        };
        self.layout.append(Side::from_local_x(local_x))
    }

    /// Reattach a debris body touching the deck once its cooldown elapsed.
    pub fn try_reattach_debris(
        &mut self,
        debris: Entity,
        debris_position: Vec3,
        body: &RaftBodySnapshot,
    ) -> bool {
        if !self.is_spawned() || !self.debris_ready(debris) {
            return false;
        }
        let local = inverse_rotate(debris_position - body.position, body.rotation);
        if !self.layout.append(Side::from_local_x(local.x)) {
            return false;
        }
        self.forget_debris(debris);
        true
    }
}
