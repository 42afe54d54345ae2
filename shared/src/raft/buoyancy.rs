//! Multi-point buoyancy and control impulses for the raft hull.
//!
//! Everything here is a pure function of a [`RaftBodySnapshot`] read once per tick. The
//! ECS systems in [`super::plugin`] gather the snapshot and write the resulting
//! [`RaftImpulse`] to the master body.

use bevy::math::{Quat, Vec2, Vec3};

use super::config::{constants::*, RaftParams};
use super::layout::{DeckGeometry, RaftLayout};
use crate::constants::{STANDARD_GRAVITY, WATER_LEVEL};
use crate::math::{clamp, point_velocity, rotate, wrap_angle, yaw_of};

/// Rigid-body state of the master body for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaftBodySnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
    pub mass: f32,
}

impl RaftBodySnapshot {
    pub fn at_rest(position: Vec3, mass: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            mass,
        }
    }

    pub fn right(&self) -> Vec3 {
        rotate(Vec3::X, self.rotation)
    }

    pub fn up(&self) -> Vec3 {
        rotate(Vec3::Y, self.rotation)
    }

    pub fn forward(&self) -> Vec3 {
        rotate(Vec3::Z, self.rotation)
    }

    /// World position of a body-space point.
    pub fn world_point(&self, local: Vec3) -> Vec3 {
        self.position + rotate(local, self.rotation)
    }

    /// World velocity of a world-space point rigidly attached to the body.
    pub fn velocity_at(&self, world_point: Vec3) -> Vec3 {
        point_velocity(self.linvel, self.angvel, self.position, world_point)
    }
}

/// A passenger pressing down on the deck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaftLoad {
    /// Passenger position in body space
    pub local_offset: Vec3,
    pub weight: f32,
}

/// Current the hull is servoed toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftInput {
    /// Horizontal unit heading (x, z)
    pub direction: Vec2,
    pub speed: f32,
}

impl DriftInput {
    pub fn target_velocity(&self) -> Vec2 {
        self.direction * self.speed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RaftImpulse {
    pub linear: Vec3,
    pub torque: Vec3,
}

/// Values surfaced by the periodic debug report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuoyancyReport {
    pub average_depth: f32,
    pub wet_points: usize,
}

/// Floater sample points in body space: five along Z for every occupied slot, laid out
/// around the deck origin.
pub fn floater_points(layout: &RaftLayout) -> Vec<Vec3> {
    let origin_x = layout.geometry().origin_x;
    layout
        .slots()
        .iter()
        .flat_map(|&slot| FLOATER_ZS.iter().map(move |&z| Vec3::new(slot - origin_x, 0.0, z)))
        .collect()
}

/// Upward impulse of one floater before passenger weight is subtracted.
/// `None` when the floater is out of the water.
pub fn sample_lift(
    depth: f32,
    vertical_velocity: f32,
    mass_share: f32,
    params: &RaftParams,
    dt: f32,
) -> Option<f32> {
    if depth <= WET_DEPTH {
        return None;
    }
    let spring = depth.max(0.0) * params.buoyancy_stiffness * mass_share;
    let damping = -vertical_velocity * params.buoyancy_damping * mass_share;
    let base = STANDARD_GRAVITY * mass_share;
    Some(((spring + damping + base) * dt).max(0.0))
}

/// Passenger weight felt by the hull shrinks as beams are lost.
pub fn tilt_scale(beam_count: usize) -> f32 {
    match beam_count {
        0..=2 => 0.4,
        3 => 0.6,
        4 => 0.8,
        _ => 1.0,
    }
}

/// Passenger lateral position normalised to `[-1, 1]` across the control span.
pub fn steer_bias(local_x: f32, geometry: &DeckGeometry) -> f32 {
    let denom = geometry.control_denominator();
    let x = clamp(local_x, geometry.origin_x - denom, geometry.origin_x + denom)
        - geometry.origin_x;
    clamp(x / denom, -1.0, 1.0)
}

/// Normalised share of the passenger weight taken by each floater.
///
/// Falls off with the inverse square of the horizontal distance to the passenger and is
/// skewed toward the side the passenger stands on.
pub fn weight_factors(points: &[Vec3], geometry: &DeckGeometry, load_offset: Vec3) -> Vec<f32> {
    let denom = geometry.control_denominator();
    let x = clamp(
        load_offset.x,
        geometry.origin_x - geometry.control_half_x,
        geometry.origin_x + geometry.control_half_x,
    ) - geometry.origin_x;
    let side_bias = clamp(x / denom, -1.0, 1.0);

    let raw: Vec<f32> = points
        .iter()
        .map(|p| {
            let dx = x - p.x;
            let dz = load_offset.z - p.z;
            let base = 1.0 / (dx * dx + dz * dz + WEIGHT_FALLOFF_SOFTENING);
            base * (1.0 + side_bias * (p.x / denom) * WEIGHT_SIDE_BIAS)
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    let sum = if sum == 0.0 { 1.0 } else { sum };
    raw.into_iter().map(|w| w / sum).collect()
}

/// Total impulse and torque for the master body this tick.
pub fn compute_raft_impulse(
    snapshot: &RaftBodySnapshot,
    layout: &RaftLayout,
    params: &RaftParams,
    load: Option<RaftLoad>,
    drift: DriftInput,
    dt: f32,
) -> (RaftImpulse, BuoyancyReport) {
    let mut impulse = RaftImpulse::default();
    let mut report = BuoyancyReport::default();

    let points = floater_points(layout);
    if points.is_empty() || snapshot.mass <= 0.0 {
        return (impulse, report);
    }

    let mass = snapshot.mass;
    let geometry = layout.geometry();
    let mass_share = mass / points.len() as f32;
    let target_y = WATER_LEVEL + params.target_height;
    let local_up = snapshot.up();

    let passenger = load.map(|load| {
        let factors = weight_factors(&points, &geometry, load.local_offset);
        let extra_down =
            load.weight * STANDARD_GRAVITY * PLAYER_WEIGHT_GAIN * tilt_scale(layout.len()) * dt;
        (factors, extra_down)
    });

    let mut depth_sum = 0.0;
    for (i, local) in points.iter().enumerate() {
        let offset = rotate(*local, snapshot.rotation);
        let point = snapshot.position + offset;
        let depth = target_y - point.y;
        depth_sum += depth;

        let vy = snapshot.velocity_at(point).y;
        let Some(mut lift) = sample_lift(depth, vy, mass_share, params, dt) else {
            continue;
        };
        report.wet_points += 1;
        if let Some((factors, extra_down)) = &passenger {
            lift -= extra_down * factors[i];
        }
        if lift > 0.0 {
            impulse.linear.y += lift;
            impulse.torque.x += -offset.z * lift;
            impulse.torque.z += offset.x * lift;
        }
    }
    report.average_depth = depth_sum / points.len() as f32;

    if let Some(load) = load {
        let steer = steer_bias(load.local_offset.x, &geometry);
        if steer.abs() > STEER_DEADZONE {
            let right = snapshot.right();
            let lateral = steer * mass * STEER_LATERAL_GAIN * dt;
            impulse.linear.x += right.x * lateral;
            impulse.linear.z += right.z * lateral;
            impulse.torque += local_up * steer * mass * STEER_YAW_GAIN * dt;
        }
    }

    let target = drift.target_velocity();
    impulse.linear.x += (target.x - snapshot.linvel.x) * mass * DRIFT_SERVO_GAIN * dt;
    impulse.linear.z += (target.y - snapshot.linvel.z) * mass * DRIFT_SERVO_GAIN * dt;

    let forward = snapshot.forward();
    let yaw_error = wrap_angle(yaw_of(drift.direction) - forward.x.atan2(forward.z));
    let yaw = (yaw_error * YAW_KP * mass - snapshot.angvel.y * YAW_KD * mass) * dt;
    impulse.torque.x += local_up.x * yaw;
    impulse.torque.z += local_up.z * yaw;
    impulse.torque.y = 0.0;

    (impulse, report)
}

/// Impulse keeping a loose beam afloat and drifting slower than the hull.
pub fn compute_debris_impulse(
    position: Vec3,
    linvel: Vec3,
    mass: f32,
    drift: DriftInput,
    dt: f32,
) -> Vec3 {
    let mut impulse = Vec3::ZERO;
    let error = WATER_LEVEL + DEBRIS_FLOAT_HEIGHT - position.y;
    if error > -0.1 {
        impulse.y = (error * DEBRIS_LIFT_GAIN * mass * dt).max(0.0);
    }
    let target = drift.target_velocity() * DEBRIS_DRIFT_FACTOR;
    impulse.x = (target.x - linvel.x) * mass * DEBRIS_SERVO_GAIN * dt;
    impulse.z = (target.y - linvel.z) * mass * DEBRIS_SERVO_GAIN * dt;
    impulse
}

/// Local Y bob of the visual follower at `index`.
pub fn visual_wiggle(tick: u64, index: usize) -> f32 {
    (tick as f32 * WIGGLE_RATE + index as f32 * WIGGLE_BEAM_PHASE).sin() * WIGGLE_AMPLITUDE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_DELTA;

    const MASS: f32 = 280.0;

    fn still() -> DriftInput {
        DriftInput {
            direction: Vec2::Y,
            speed: 0.0,
        }
    }

    fn floating_at(y: f32) -> RaftBodySnapshot {
        RaftBodySnapshot::at_rest(Vec3::new(0.0, y, 0.0), MASS)
    }

    #[test]
    fn test_floater_count() {
        let layout = RaftLayout::default_layout();
        assert_eq!(floater_points(&layout).len(), 25);
    }

    #[test]
    fn test_sample_lift_dry_point() {
        let params = RaftParams::default();
        assert_eq!(sample_lift(-0.2, 0.0, 10.0, &params, TICK_DELTA), None);
        let at_surface = sample_lift(0.0, 0.0, 10.0, &params, TICK_DELTA).unwrap();
        assert!((at_surface - STANDARD_GRAVITY * 10.0 * TICK_DELTA).abs() < 1e-4);
    }

    #[test]
    fn test_submerged_hull_pushes_up_beyond_weight() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let snapshot = floating_at(WATER_LEVEL + params.target_height - 0.5);
        let (impulse, report) =
            compute_raft_impulse(&snapshot, &layout, &params, None, still(), TICK_DELTA);
        assert!(impulse.linear.y > MASS * STANDARD_GRAVITY * TICK_DELTA);
        assert_eq!(report.wet_points, 25);
        assert!((report.average_depth - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_hull_above_water_gets_no_lift() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let snapshot = floating_at(WATER_LEVEL + params.target_height + 1.0);
        let (impulse, report) =
            compute_raft_impulse(&snapshot, &layout, &params, None, still(), TICK_DELTA);
        assert_eq!(impulse.linear.y, 0.0);
        assert_eq!(report.wet_points, 0);
    }

    #[test]
    fn test_level_hull_has_no_roll_torque() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let snapshot = floating_at(WATER_LEVEL + params.target_height - 0.2);
        let (impulse, _) =
            compute_raft_impulse(&snapshot, &layout, &params, None, still(), TICK_DELTA);
        assert!(impulse.torque.x.abs() < 1e-3);
        assert!(impulse.torque.z.abs() < 1e-3);
        assert_eq!(impulse.torque.y, 0.0);
    }

    #[test]
    fn test_weight_factors_normalised_and_biased() {
        let layout = RaftLayout::default_layout();
        let points = floater_points(&layout);
        let geometry = layout.geometry();
        let factors = weight_factors(&points, &geometry, Vec3::new(2.0, 0.0, 0.0));
        let sum: f32 = factors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);

        let side_weight = |sign: f32| -> f32 {
            points
                .iter()
                .zip(&factors)
                .filter(|(p, _)| p.x * sign > 0.0)
                .map(|(_, w)| w)
                .sum()
        };
        let right = side_weight(1.0);
        let left = side_weight(-1.0);
        assert!(right > left);
    }

    #[test]
    fn test_passenger_on_right_rolls_hull_right() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let snapshot = floating_at(WATER_LEVEL + params.target_height - 0.3);
        let load = RaftLoad {
            local_offset: Vec3::new(2.0, 1.0, 0.0),
            weight: DEFAULT_PLAYER_WEIGHT,
        };
        let (empty, _) =
            compute_raft_impulse(&snapshot, &layout, &params, None, still(), TICK_DELTA);
        let (loaded, _) =
            compute_raft_impulse(&snapshot, &layout, &params, Some(load), still(), TICK_DELTA);
        assert!(loaded.linear.y < empty.linear.y);
        // Less lift on +X means less +Z torque from the floaters.
        assert!(loaded.torque.z < empty.torque.z);
    }

    #[test]
    fn test_steer_sign_follows_passenger_side() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let snapshot = floating_at(WATER_LEVEL + params.target_height);
        for (x, sign) in [(1.5_f32, 1.0_f32), (-1.5, -1.0)] {
            let load = RaftLoad {
                local_offset: Vec3::new(x, 1.0, 0.0),
                weight: DEFAULT_PLAYER_WEIGHT,
            };
            let (impulse, _) =
                compute_raft_impulse(&snapshot, &layout, &params, Some(load), still(), TICK_DELTA);
            assert_eq!(impulse.linear.x.signum(), sign);
        }
    }

    #[test]
    fn test_steer_bias_deadzone_and_clamp() {
        let geometry = RaftLayout::default_layout().geometry();
        assert!(steer_bias(0.01, &geometry).abs() <= STEER_DEADZONE);
        assert_eq!(steer_bias(10.0, &geometry), 1.0);
        assert_eq!(steer_bias(-10.0, &geometry), -1.0);
    }

    #[test]
    fn test_drift_servo_converges() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let drift = DriftInput {
            direction: Vec2::new(1.0, 0.0),
            speed: 2.0,
        };
        let mut snapshot = floating_at(WATER_LEVEL + params.target_height + 2.0);
        snapshot.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut error = snapshot.linvel.x - 2.0;
        for _ in 0..200 {
            let (impulse, _) =
                compute_raft_impulse(&snapshot, &layout, &params, None, drift, TICK_DELTA);
            snapshot.linvel.x += impulse.linear.x / MASS;
            snapshot.linvel.z += impulse.linear.z / MASS;

            // Approach from below, never overshooting the current.
            let next = snapshot.linvel.x - 2.0;
            assert!(next.abs() <= error.abs() + 1e-6);
            assert!(next <= 0.0, "servo overshot: {next}");
            error = next;
        }
        assert!((snapshot.linvel.x - 2.0).abs() < 0.05);
        assert!(snapshot.linvel.z.abs() < 0.05);
    }

    #[test]
    fn test_yaw_error_produces_torque_toward_heading() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let drift = DriftInput {
            direction: Vec2::new(1.0, 0.0),
            speed: 0.0,
        };
        let mut snapshot = floating_at(WATER_LEVEL + 10.0);
        // Tilt slightly so local up has a horizontal component to carry the yaw impulse.
        snapshot.rotation = Quat::from_rotation_x(0.1);
        let (impulse, _) =
            compute_raft_impulse(&snapshot, &layout, &params, None, drift, TICK_DELTA);
        assert_eq!(impulse.torque.y, 0.0);
        assert!(impulse.torque.x.abs() < 1e-6);
        assert!(impulse.torque.z > 0.0);
    }

    #[test]
    fn test_zero_mass_skips() {
        let params = RaftParams::default();
        let layout = RaftLayout::default_layout();
        let snapshot = RaftBodySnapshot::at_rest(Vec3::ZERO, 0.0);
        let (impulse, _) =
            compute_raft_impulse(&snapshot, &layout, &params, None, still(), TICK_DELTA);
        assert_eq!(impulse, RaftImpulse::default());
    }

    #[test]
    fn test_debris_floats_and_drifts_slower() {
        let drift = DriftInput {
            direction: Vec2::new(0.0, 1.0),
            speed: 2.0,
        };
        let sunk = compute_debris_impulse(
            Vec3::new(0.0, WATER_LEVEL - 1.0, 0.0),
            Vec3::ZERO,
            DEBRIS_MASS,
            drift,
            TICK_DELTA,
        );
        assert!(sunk.y > 0.0);
        assert!(sunk.z > 0.0);

        let high = compute_debris_impulse(
            Vec3::new(0.0, WATER_LEVEL + 3.0, 0.0),
            Vec3::ZERO,
            DEBRIS_MASS,
            drift,
            TICK_DELTA,
        );
        assert_eq!(high.y, 0.0);

        let cruising = compute_debris_impulse(
            Vec3::new(0.0, WATER_LEVEL + DEBRIS_FLOAT_HEIGHT, 0.0),
            Vec3::new(0.0, 0.0, 2.0 * DEBRIS_DRIFT_FACTOR),
            DEBRIS_MASS,
            drift,
            TICK_DELTA,
        );
        assert!(cruising.length() < 1e-4);
    }

    #[test]
    fn test_visual_wiggle_bounded() {
        for tick in 0..200 {
            for i in 0..MAX_BEAMS {
                assert!(visual_wiggle(tick, i).abs() <= WIGGLE_AMPLITUDE + 1e-6);
            }
        }
    }
}
