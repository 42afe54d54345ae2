//! Small vector helpers shared by the raft physics and the player coupling.
//!
//! Quaternions are assumed to be unit length; the inverse rotation uses the conjugate.

use bevy::math::{Quat, Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// Rotate a local-space vector into world space.
#[inline]
pub fn rotate(v: Vec3, rotation: Quat) -> Vec3 {
    rotation * v
}

/// Rotate a world-space vector into the local frame of `rotation`.
#[inline]
pub fn inverse_rotate(v: Vec3, rotation: Quat) -> Vec3 {
    rotation.conjugate() * v
}

#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    a.cross(b)
}

#[inline]
pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

/// Velocity of a point rigidly attached to a body: `v_cm + ω × r`.
#[inline]
pub fn point_velocity(linvel: Vec3, angvel: Vec3, center: Vec3, point: Vec3) -> Vec3 {
    linvel + cross(angvel, point - center)
}

/// Wrap an angle to `[-π, π]`.
pub fn wrap_angle(mut angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    while angle > PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}

/// Linear and angular impulse produced by `impulse` applied at `point` of a body centred
/// at `center`.
#[inline]
pub fn impulse_at_point(impulse: Vec3, center: Vec3, point: Vec3) -> (Vec3, Vec3) {
    (impulse, cross(point - center, impulse))
}

/// Heading angle of a horizontal direction, measured from +Z toward +X.
#[inline]
pub fn yaw_of(direction: Vec2) -> f32 {
    direction.x.atan2(direction.y)
}

/// Horizontal (XZ) part of a 3D vector.
#[inline]
pub fn horizontal(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}
