//! Player to raft coupling.
//!
//! Decides every tick whether the player rides the raft and rewrites the player's
//! horizontal velocity so they move with the deck, including its spin at their offset.
//! Jumps are tracked by [`JumpPhase`]: the relative velocity at take-off is carried and
//! re-added to the raft's *current* point velocity until the player lands again.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::{horizontal, inverse_rotate};
use crate::raft::buoyancy::{steer_bias, RaftBodySnapshot, RaftLoad};
use crate::raft::config::constants::DEFAULT_PLAYER_WEIGHT;
use crate::raft::layout::RaftLayout;

pub mod constants {
    /// Ticks attachment survives after the player left the deck footprint
    pub const ATTACH_GRACE_TICKS: u32 = 6;
    /// Vertical band above the deck centre that still counts as standing on it
    pub const MIN_LOCAL_Y: f32 = -0.75;
    pub const MAX_LOCAL_Y: f32 = 3.0;
    /// Fraction of the deck half width past which a landing kicks the raft
    pub const LANDING_EDGE_THRESHOLD: f32 = 0.55;
    pub const LANDING_BOOST_TICKS: u32 = 8;
    /// Multiplier of the first boost tick
    pub const LANDING_BOOST_JOLT: f32 = 2.5;
}

use constants::*;

#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingParams {
    pub walk_speed: f32,
    pub jump_speed: f32,
    pub player_weight: f32,
    /// Sideways impulse on the raft for a landing right at the deck edge
    pub landing_boost_impulse: f32,
}

impl Default for CouplingParams {
    fn default() -> Self {
        Self {
            walk_speed: crate::physics::constants::PLAYER_SPEED,
            jump_speed: crate::physics::constants::JUMP_VELOCITY,
            player_weight: DEFAULT_PLAYER_WEIGHT,
            landing_boost_impulse: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JumpPhase {
    #[default]
    Grounded,
    JumpRising {
        carry: Vec2,
    },
    Airborne {
        carry: Vec2,
    },
    LandingBoost {
        ticks_left: u32,
        /// -1 for the left edge, 1 for the right edge
        side: f32,
        strength: f32,
    },
}

/// Player position relative to the deck for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAttachment {
    /// Player position in raft body space
    pub local_offset: Vec3,
    pub steer_bias: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplingInput {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    /// Walk intent on the XZ plane, at most unit length
    pub movement: Vec2,
    pub jump_pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplingOutcome {
    pub attachment: Option<PlayerAttachment>,
    pub velocity: Vec3,
    /// Impulse to add to the raft on top of the buoyancy impulse
    pub raft_boost: Option<Vec3>,
    pub respawn: bool,
}

impl CouplingOutcome {
    fn detached(velocity: Vec3) -> Self {
        Self {
            attachment: None,
            velocity,
            raft_boost: None,
            respawn: false,
        }
    }

    pub fn load(&self, weight: f32) -> Option<RaftLoad> {
        self.attachment.map(|a| RaftLoad {
            local_offset: a.local_offset,
            weight,
        })
    }
}

/// On-deck footprint test in raft body space.
pub fn is_on_deck(local: Vec3, layout: &RaftLayout) -> bool {
    let geometry = layout.geometry();
    (local.x - geometry.origin_x).abs() <= geometry.half_x
        && local.z.abs() <= geometry.half_z
        && (MIN_LOCAL_Y..=MAX_LOCAL_Y).contains(&local.y)
}

/// Per-player coupling state.
#[derive(Component, Debug, Clone, Default)]
pub struct PlayerRaftCoupling {
    phase: JumpPhase,
    attached: bool,
    grace_left: u32,
    jump_was_pressed: bool,
}

impl PlayerRaftCoupling {
    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn detach(&mut self) {
        self.attached = false;
        self.grace_left = 0;
        self.phase = JumpPhase::Grounded;
    }

    /// Advance one tick. `raft` is `None` when no raft is spawned.
    pub fn step(
        &mut self,
        input: CouplingInput,
        raft: Option<(&RaftBodySnapshot, &RaftLayout)>,
        params: &CouplingParams,
    ) -> CouplingOutcome {
        let jump_edge = input.jump_pressed && !self.jump_was_pressed;
        self.jump_was_pressed = input.jump_pressed;

        let Some((body, layout)) = raft else {
            self.detach();
            return CouplingOutcome::detached(input.velocity);
        };

        let local = inverse_rotate(input.position - body.position, body.rotation);
        if is_on_deck(local, layout) {
            self.attached = true;
            self.grace_left = ATTACH_GRACE_TICKS;
        } else if self.attached && self.grace_left > 0 {
            self.grace_left -= 1;
        } else {
            self.detach();
        }

        if !self.attached {
            return CouplingOutcome::detached(input.velocity);
        }

        if layout.is_empty() {
            self.detach();
            return CouplingOutcome {
                respawn: true,
                ..CouplingOutcome::detached(input.velocity)
            };
        }

        let geometry = layout.geometry();
        let raft_point = horizontal(body.velocity_at(input.position));
        let relative = horizontal(input.velocity) - raft_point;
        let walk = input.movement.clamp_length_max(1.0) * params.walk_speed;
        let mut velocity = input.velocity;
        let mut raft_boost = None;

        let horizontal_velocity = match self.phase {
            JumpPhase::Grounded | JumpPhase::LandingBoost { .. } if input.grounded && jump_edge => {
                velocity.y = velocity.y.max(params.jump_speed);
                self.phase = JumpPhase::JumpRising { carry: relative };
                raft_point + relative
            }
            JumpPhase::Grounded | JumpPhase::LandingBoost { .. } if !input.grounded => {
                self.phase = JumpPhase::Airborne { carry: relative };
                raft_point + relative
            }
            JumpPhase::Grounded => raft_point + walk,
            JumpPhase::LandingBoost {
                ticks_left,
                side,
                strength,
            } => {
                raft_boost = Some(self.boost_impulse(body, ticks_left, side, strength, params));
                self.phase = if ticks_left > 1 {
                    JumpPhase::LandingBoost {
                        ticks_left: ticks_left - 1,
                        side,
                        strength,
                    }
                } else {
                    JumpPhase::Grounded
                };
                raft_point + walk
            }
            JumpPhase::JumpRising { carry } => {
                if velocity.y <= 0.0 {
                    self.phase = JumpPhase::Airborne { carry };
                }
                raft_point + carry
            }
            JumpPhase::Airborne { .. } if input.grounded => {
                let edge = ((local.x - geometry.origin_x).abs() / geometry.half_x).min(1.0);
                if edge >= LANDING_EDGE_THRESHOLD {
                    let side = (local.x - geometry.origin_x).signum();
                    let strength =
                        (edge - LANDING_EDGE_THRESHOLD) / (1.0 - LANDING_EDGE_THRESHOLD);
                    raft_boost = Some(self.boost_impulse(
                        body,
                        LANDING_BOOST_TICKS,
                        side,
                        strength,
                        params,
                    ));
                    self.phase = JumpPhase::LandingBoost {
                        ticks_left: LANDING_BOOST_TICKS - 1,
                        side,
                        strength,
                    };
                } else {
                    self.phase = JumpPhase::Grounded;
                }
                raft_point + walk
            }
            JumpPhase::Airborne { carry } => raft_point + carry,
        };
        velocity.x = horizontal_velocity.x;
        velocity.z = horizontal_velocity.y;

        CouplingOutcome {
            attachment: Some(PlayerAttachment {
                local_offset: local,
                steer_bias: steer_bias(local.x, &geometry),
            }),
            velocity,
            raft_boost,
            respawn: false,
        }
    }

    /// Boost for the tick with `ticks_left` remaining: full jolt first, then a linear decay.
    fn boost_impulse(
        &self,
        body: &RaftBodySnapshot,
        ticks_left: u32,
        side: f32,
        strength: f32,
        params: &CouplingParams,
    ) -> Vec3 {
        let scale = if ticks_left >= LANDING_BOOST_TICKS {
            LANDING_BOOST_JOLT
        } else {
            ticks_left as f32 / LANDING_BOOST_TICKS as f32
        };
        let right = body.right().with_y(0.0).normalize_or_zero();
        right * side * strength * scale * params.landing_boost_impulse
    }
}
