//! Character integration for the player.
//!
//! The coupling decides the player's horizontal velocity while they ride the raft; this
//! module adds free movement, gravity and swimming, and hands the resulting translation
//! to Rapier's kinematic character controller.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::constants::{TICK_DELTA, WATER_LEVEL};
use crate::math::horizontal;
use crate::physics::constants::{
    AIR_CONTROL, AIR_DRAG, GRAVITY, JUMP_VELOCITY, PLAYER_SPEED, SWIM_GRAVITY_SCALE,
    SWIM_MAX_FALL_SPEED, SWIM_RISE_SPEED, SWIM_SPEED, TERMINAL_VELOCITY,
};
use crate::player::coupling::PlayerRaftCoupling;
use crate::player::survival::constants::SWIM_SURFACE_MARGIN;
use crate::player::{PlayerControl, PlayerMotion};

/// Vertical velocity for one tick of free (not coupled) motion.
pub fn free_vertical_velocity(
    vy: f32,
    grounded: bool,
    swimming: bool,
    jump_pressed: bool,
    delta: f32,
) -> f32 {
    let mut vy = vy;
    if swimming {
        vy += GRAVITY * SWIM_GRAVITY_SCALE * delta;
        vy = vy.max(SWIM_MAX_FALL_SPEED);
        if jump_pressed {
            vy = SWIM_RISE_SPEED;
        }
    } else if grounded && jump_pressed {
        vy = JUMP_VELOCITY;
    } else if !grounded {
        vy += GRAVITY * delta;
    }
    vy.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY)
}

/// Horizontal velocity for one tick of free motion. In the air the current velocity is
/// kept, so a fall off a moving raft keeps its momentum, and walk input only steers.
pub fn free_horizontal_velocity(
    current: Vec2,
    walk: Vec2,
    grounded: bool,
    swimming: bool,
    delta: f32,
) -> Vec2 {
    if grounded || swimming {
        return walk;
    }
    current * (1.0 - AIR_DRAG * delta) + walk * AIR_CONTROL * delta
}

/// Read back the controller's ground contact from the last physics step.
pub fn read_character_output(
    mut players: Query<(&mut PlayerMotion, Option<&KinematicCharacterControllerOutput>)>,
) {
    for (mut motion, output) in players.iter_mut() {
        let Some(output) = output else {
            continue;
        };
        motion.grounded = output.grounded;
        if motion.grounded && motion.velocity.y < 0.0 {
            motion.velocity.y = 0.0;
        }
    }
}

/// Integrate player velocity and queue the character controller move.
pub fn integrate_player_motion(
    mut players: Query<(
        &Transform,
        &PlayerControl,
        &PlayerRaftCoupling,
        &mut PlayerMotion,
        &mut KinematicCharacterController,
    )>,
) {
    let delta = TICK_DELTA;
    for (transform, control, coupling, mut motion, mut controller) in players.iter_mut() {
        let attached = coupling.is_attached();
        let swimming = !attached && transform.translation.y <= WATER_LEVEL + SWIM_SURFACE_MARGIN;

        if attached {
            // Jump and carry are already resolved by the coupling; only gravity is left.
            if !motion.grounded {
                motion.velocity.y += GRAVITY * delta;
            }
            motion.velocity.y = motion.velocity.y.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY);
        } else {
            let speed = if swimming { PLAYER_SPEED * SWIM_SPEED } else { PLAYER_SPEED };
            let walk = control.movement.clamp_length_max(1.0) * speed;
            let planar = free_horizontal_velocity(
                horizontal(motion.velocity),
                walk,
                motion.grounded,
                swimming,
                delta,
            );
            motion.velocity.x = planar.x;
            motion.velocity.z = planar.y;
            motion.velocity.y = free_vertical_velocity(
                motion.velocity.y,
                motion.grounded,
                swimming,
                control.jump_pressed,
                delta,
            );
        }

        controller.translation = Some(motion.velocity * delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_fall_accelerates() {
        let vy = free_vertical_velocity(0.0, false, false, false, TICK_DELTA);
        assert!((vy - GRAVITY * TICK_DELTA).abs() < 1e-6);
    }

    #[test]
    fn test_grounded_jump() {
        assert_eq!(free_vertical_velocity(0.0, true, false, true, TICK_DELTA), JUMP_VELOCITY);
        assert_eq!(
            free_vertical_velocity(0.0, false, false, true, TICK_DELTA),
            GRAVITY * TICK_DELTA
        );
    }

    #[test]
    fn test_swimming_sinks_slowly() {
        let mut vy = 0.0;
        for _ in 0..100 {
            vy = free_vertical_velocity(vy, false, true, false, TICK_DELTA);
        }
        assert_eq!(vy, SWIM_MAX_FALL_SPEED);
        assert_eq!(free_vertical_velocity(vy, false, true, true, TICK_DELTA), SWIM_RISE_SPEED);
    }

    #[test]
    fn test_terminal_velocity() {
        let vy = free_vertical_velocity(-TERMINAL_VELOCITY, false, false, false, TICK_DELTA);
        assert_eq!(vy, -TERMINAL_VELOCITY);
    }

    #[test]
    fn test_airborne_keeps_horizontal_momentum() {
        let mut planar = Vec2::new(3.0, 0.0);
        for _ in 0..10 {
            planar = free_horizontal_velocity(planar, Vec2::ZERO, false, false, TICK_DELTA);
        }
        assert!(planar.x > 2.5 && planar.x < 3.0);
        assert_eq!(planar.y, 0.0);

        let walk = Vec2::new(0.0, PLAYER_SPEED);
        assert_eq!(free_horizontal_velocity(planar, walk, true, false, TICK_DELTA), walk);
        assert_eq!(free_horizontal_velocity(planar, walk, false, true, TICK_DELTA), walk);
    }
}
