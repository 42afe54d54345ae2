use bevy::prelude::*;

pub const TICKS_PER_SECOND: u64 = 20;
/// Fixed simulation step. Every impulse in the raft core scales by this, never by frame time.
pub const TICK_DELTA: f32 = 1.0 / TICKS_PER_SECOND as f32;
pub const WATER_LEVEL: f32 = 5.0;
pub const BUBBLE_RADIUS: f32 = 15.0;
pub const STANDARD_GRAVITY: f32 = 9.81;
pub const DEFAULT_SEED: u64 = 0x5eed_4a4f;
pub const RAFT_SPAWN_HEIGHT: f32 = 1.2;
pub const PLAYER_RESPAWN_HEIGHT: f32 = 5.0;
pub const HALF_BLOCK: Vec3 = Vec3 {
    x: 0.5,
    y: 0.5,
    z: 0.5,
};
