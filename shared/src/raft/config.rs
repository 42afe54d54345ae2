//! Raft tuning.
//!
//! Geometry and force gains that never change at runtime are constants; the buoyancy
//! and body parameters live in [`RaftParams`] so a session can load them from disk.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Structural and force constants of the raft hull.
pub mod constants {
    /// Maximum number of beams the hull can hold
    pub const MAX_BEAMS: usize = 5;
    /// Lateral distance between neighbouring beams
    pub const BEAM_SPACING: f32 = 1.1;
    /// Beam length along local Z
    pub const BEAM_LENGTH: f32 = 5.0;
    /// Half width of a single beam
    pub const BEAM_HALF_WIDTH: f32 = 0.5;
    /// Half height of a beam and of the deck collider
    pub const BEAM_HALF_HEIGHT: f32 = 0.5;
    /// Margin added around the outermost beams for the deck collider
    pub const DECK_MARGIN: f32 = 0.5;
    /// Lower bound for the steering / weight control span
    pub const MIN_CONTROL_HALF_X: f32 = 0.6;

    /// Floater sample positions along local Z, per beam
    pub const FLOATER_ZS: [f32; 5] = [-2.5, -1.25, 0.0, 1.25, 2.5];
    /// Depth above which a floater is still treated as wet
    pub const WET_DEPTH: f32 = -0.05;

    /// Softening term of the inverse-square weight falloff
    pub const WEIGHT_FALLOFF_SOFTENING: f32 = 0.25;
    /// How much the standing side pulls extra weight to its floaters
    pub const WEIGHT_SIDE_BIAS: f32 = 0.8;
    /// Player weight gain on the floaters
    pub const PLAYER_WEIGHT_GAIN: f32 = 4.0;
    /// Default player weight
    pub const DEFAULT_PLAYER_WEIGHT: f32 = 85.0;

    /// Steer bias below which no steering force is applied
    pub const STEER_DEADZONE: f32 = 0.02;
    /// Lateral steering gain
    pub const STEER_LATERAL_GAIN: f32 = 5.6;
    /// Yaw steering gain
    pub const STEER_YAW_GAIN: f32 = 1.2;

    /// Drift velocity-servo gain
    pub const DRIFT_SERVO_GAIN: f32 = 2.6;
    /// Yaw alignment proportional gain
    pub const YAW_KP: f32 = 6.0;
    /// Yaw alignment derivative gain
    pub const YAW_KD: f32 = 4.0;

    /// Debris floats at this height above the water level
    pub const DEBRIS_FLOAT_HEIGHT: f32 = 0.5;
    /// Debris vertical correction gain
    pub const DEBRIS_LIFT_GAIN: f32 = 6.0;
    /// Fraction of the drift speed debris drifts at
    pub const DEBRIS_DRIFT_FACTOR: f32 = 0.4;
    /// Debris horizontal servo gain
    pub const DEBRIS_SERVO_GAIN: f32 = 0.2;
    /// Ticks before a detached beam may reattach
    pub const DEBRIS_REATTACH_COOLDOWN: u32 = 20;
    /// Extra mass of a detached beam
    pub const DEBRIS_MASS: f32 = 40.0;

    /// Amplitude of the visual beam bob
    pub const WIGGLE_AMPLITUDE: f32 = 0.08;
    /// Phase advance of the visual bob per tick
    pub const WIGGLE_RATE: f32 = 0.08;
    /// Phase offset between neighbouring beams
    pub const WIGGLE_BEAM_PHASE: f32 = 1.3;
}

/// Runtime raft body and buoyancy parameters.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RaftParams {
    /// Additional mass of the master body
    pub mass: f32,
    pub buoyancy_stiffness: f32,
    pub buoyancy_damping: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    /// Water surface offset the floaters are pulled toward
    pub target_height: f32,
    /// Emit the periodic physics debug report
    pub debug: bool,
    pub debug_interval: u32,
}

impl Default for RaftParams {
    fn default() -> Self {
        Self {
            mass: 280.0,
            buoyancy_stiffness: 26.0,
            buoyancy_damping: 7.0,
            linear_damping: 0.8,
            angular_damping: 2.0,
            gravity_scale: 0.92,
            target_height: 1.0,
            debug: false,
            debug_interval: 40,
        }
    }
}
