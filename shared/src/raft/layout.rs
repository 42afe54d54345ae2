use serde::{Deserialize, Serialize};

use super::config::constants::{
    BEAM_LENGTH, BEAM_SPACING, DECK_MARGIN, MAX_BEAMS, MIN_CONTROL_HALF_X,
};

/// Side of the hull a new beam is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Negative local X is the left side, everything else the right.
    pub fn from_local_x(x: f32) -> Self {
        if x < 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// Extents of the deck derived from the occupied beam slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckGeometry {
    /// Midpoint of the outermost slots, in body space
    pub origin_x: f32,
    pub half_x: f32,
    pub half_z: f32,
    /// Lateral span used to normalise steering and weight distribution
    pub control_half_x: f32,
}

impl DeckGeometry {
    /// Weight and steering normaliser, never below the minimum control span.
    pub fn control_denominator(&self) -> f32 {
        self.control_half_x.max(MIN_CONTROL_HALF_X)
    }
}

/// Lateral beam slot offsets of the hull, sorted ascending and centred on zero.
///
/// Every mutation recenters the slots and bumps [`RaftLayout::revision`] so the ECS side
/// can rebuild colliders and visuals only when something changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RaftLayout {
    slots: Vec<f32>,
    revision: u64,
}

impl Default for RaftLayout {
    fn default() -> Self {
        Self::default_layout()
    }
}

impl RaftLayout {
    /// Symmetric full hull: `(i - (max - 1) / 2) * spacing`.
    pub fn default_layout() -> Self {
        let half = (MAX_BEAMS as f32 - 1.0) / 2.0;
        let slots = (0..MAX_BEAMS)
            .map(|i| (i as f32 - half) * BEAM_SPACING)
            .collect();
        let mut layout = Self { slots, revision: 0 };
        layout.recenter();
        layout
    }

    pub fn from_slots(mut slots: Vec<f32>) -> Self {
        slots.retain(|x| x.is_finite());
        slots.sort_by(f32::total_cmp);
        slots.dedup();
        slots.truncate(MAX_BEAMS);
        let mut layout = Self { slots, revision: 0 };
        layout.recenter();
        layout
    }

    pub fn slots(&self) -> &[f32] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= MAX_BEAMS
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Remove the slot at `index`, returning its offset before recentering.
    pub fn remove(&mut self, index: usize) -> Option<f32> {
        if index >= self.slots.len() {
            return None;
        }
        let removed = self.slots.remove(index);
        self.recenter();
        self.revision += 1;
        Some(removed)
    }

    /// Append one beam spacing beyond the outermost slot on `side`.
    /// Returns `false` when the hull is already full.
    pub fn append(&mut self, side: Side) -> bool {
        if self.is_full() {
            return false;
        }
        let new_x = match (self.slots.first(), self.slots.last(), side) {
            (Some(min), _, Side::Left) => min - BEAM_SPACING,
            (_, Some(max), Side::Right) => max + BEAM_SPACING,
            _ => 0.0,
        };
        self.slots.push(new_x);
        self.slots.sort_by(f32::total_cmp);
        self.recenter();
        self.revision += 1;
        true
    }

    /// Restore the default hull, keeping the revision monotonic.
    pub fn reset(&mut self) {
        let revision = self.revision + 1;
        *self = Self::default_layout();
        self.revision = revision;
    }

    pub fn geometry(&self) -> DeckGeometry {
        let half_z = BEAM_LENGTH / 2.0;
        let (Some(&min), Some(&max)) = (self.slots.first(), self.slots.last()) else {
            return DeckGeometry {
                origin_x: 0.0,
                half_x: DECK_MARGIN,
                half_z,
                control_half_x: MIN_CONTROL_HALF_X,
            };
        };
        let origin_x = (min + max) / 2.0;
        let control = self
            .slots
            .iter()
            .map(|x| (x - origin_x).abs())
            .fold(0.0_f32, f32::max);
        DeckGeometry {
            origin_x,
            half_x: (max - min) / 2.0 + DECK_MARGIN,
            half_z,
            control_half_x: control.max(MIN_CONTROL_HALF_X),
        }
    }

    /// Index of the slot closest to zero when the slot count is odd.
    pub fn centre_slot(&self) -> Option<usize> {
        if self.slots.len() % 2 == 0 {
            return None;
        }
        self.slots
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map(|(i, _)| i)
    }

    fn recenter(&mut self) {
        if self.slots.is_empty() {
            return;
        }
        let mean = self.slots.iter().sum::<f32>() / self.slots.len() as f32;
        if mean != 0.0 {
            for x in &mut self.slots {
                *x -= mean;
            }
        }
    }
}
