//! Drift current heading.
//!
//! The heading wanders slowly: every `steer_interval` ticks a new target a few degrees
//! off the current heading is picked, and the current heading is blended toward it a
//! little every tick. A [`WavyChannel`] can override the heading so the raft follows the
//! channel between the banks.

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::raft::buoyancy::DriftInput;

pub mod constants {
    /// Upper bound of the adjustable drift speed
    pub const MAX_DRIFT_SPEED: f32 = 2.0;

    /// Lateral amplitude of the channel centreline
    pub const CHANNEL_AMPLITUDE: f32 = 4.0;
    pub const CHANNEL_FREQUENCY: f32 = 0.15;
    pub const CHANNEL_PHASE: f32 = 0.4;
    /// Length of one bank segment along the channel
    pub const BANK_SEGMENT_LENGTH: f32 = 14.0;
    /// Extra phase advance per bank segment
    pub const BANK_SEGMENT_PHASE: f32 = 0.6;
}

use constants::*;

#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftParams {
    /// Ticks between two new wander targets
    pub steer_interval: u32,
    /// Per-tick blend factor toward the target heading
    pub turn_rate: f32,
    /// Largest heading change of a new target, in radians
    pub max_perturbation: f32,
    pub speed: f32,
    /// Heading at spawn, on the XZ plane
    pub initial_heading: Vec2,
    /// Let the wavy channel supply the heading
    pub follow_channel: bool,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            steer_interval: 220,
            turn_rate: 0.03,
            max_perturbation: 0.125,
            speed: MAX_DRIFT_SPEED,
            initial_heading: Vec2::new(0.0, -1.0),
            follow_channel: false,
        }
    }
}

/// Largest angle a single blend step with factor `mix` can turn a unit heading.
///
/// The blended vector is `(1 - mix) a + mix b` for unit `a`, `b`; its angle to `a` peaks
/// at `asin(mix / (1 - mix))`.
pub fn max_step_angle(mix: f32) -> f32 {
    (mix / (1.0 - mix)).clamp(-1.0, 1.0).asin()
}

#[derive(Resource, Debug, Clone)]
pub struct DriftState {
    current: Vec2,
    target: Vec2,
    timer: u32,
    speed: f32,
    rng: StdRng,
}

impl DriftState {
    pub fn new(params: &DriftParams, seed: u64) -> Self {
        let heading = params.initial_heading.try_normalize().unwrap_or(Vec2::NEG_Y);
        Self {
            current: heading,
            target: heading,
            timer: 0,
            speed: params.speed.clamp(0.0, MAX_DRIFT_SPEED),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn heading(&self) -> Vec2 {
        self.current
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Steer toward `heading` until the next wander target is picked.
    pub fn set_target(&mut self, heading: Vec2) {
        if let Some(heading) = heading.try_normalize() {
            self.target = heading;
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = if speed.is_finite() {
            speed.clamp(0.0, MAX_DRIFT_SPEED)
        } else {
            0.0
        };
    }

    pub fn input(&self) -> DriftInput {
        DriftInput {
            direction: self.current,
            speed: self.speed,
        }
    }

    /// Advance one tick. A channel heading, when present, replaces the blended heading.
    pub fn tick(&mut self, params: &DriftParams, channel: Option<Vec2>) {
        self.timer = self.timer.wrapping_add(1);
        if params.steer_interval > 0 && self.timer % params.steer_interval == 0 {
            let angle = self.current.y.atan2(self.current.x)
                + self
                    .rng
                    .gen_range(-params.max_perturbation..=params.max_perturbation);
            self.target = Vec2::new(angle.cos(), angle.sin());
        }

        let mix = params.turn_rate;
        let blended = self.current * (1.0 - mix) + self.target * mix;
        self.current = blended.try_normalize().unwrap_or(self.current);

        if let Some(heading) = channel.and_then(Vec2::try_normalize) {
            self.current = heading;
        }
    }
}

/// Wavy centreline between the channel banks, in a basis fixed when the channel is laid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavyChannel {
    pub origin: Vec2,
    pub forward: Vec2,
    pub perp: Vec2,
}

impl WavyChannel {
    pub fn from_heading(origin: Vec2, heading: Vec2) -> Self {
        let forward = heading.try_normalize().unwrap_or(Vec2::NEG_Y);
        Self {
            origin,
            forward,
            perp: Vec2::new(-forward.y, forward.x),
        }
    }

    fn phase(t: f32) -> f32 {
        t * CHANNEL_FREQUENCY + (t / BANK_SEGMENT_LENGTH) * BANK_SEGMENT_PHASE + CHANNEL_PHASE
    }

    /// Lateral offset of the centreline at distance `t` along the channel.
    pub fn centre_lateral(t: f32) -> f32 {
        Self::phase(t).sin() * CHANNEL_AMPLITUDE
    }

    /// Distance along the channel and lateral offset of `position`.
    pub fn project(&self, position: Vec2) -> (f32, f32) {
        let r = position - self.origin;
        (r.dot(self.forward), r.dot(self.perp))
    }

    /// Unit tangent of the centreline abreast of `position`.
    pub fn heading_at(&self, position: Vec2) -> Vec2 {
        let (t, _) = self.project(position);
        let total_frequency = CHANNEL_FREQUENCY + BANK_SEGMENT_PHASE / BANK_SEGMENT_LENGTH;
        let slope = Self::phase(t).cos() * CHANNEL_AMPLITUDE * total_frequency;
        (self.forward + self.perp * slope)
            .try_normalize()
            .unwrap_or(self.forward)
    }
}

/// Channel currently steering the drift, if any.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DriftChannel(pub Option<WavyChannel>);

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_between(a: Vec2, b: Vec2) -> f32 {
        a.angle_to(b).abs()
    }

    #[test]
    fn test_drift_smoothing_bounded_per_tick() {
        let params = DriftParams::default();
        let mut state = DriftState::new(&params, 7);
        let bound = max_step_angle(params.turn_rate) + 1e-4;
        for _ in 0..300 {
            let before = state.heading();
            state.tick(&params, None);
            assert!(angle_between(before, state.heading()) <= bound);
            assert!((state.heading().length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_quarter_turn_converges_smoothly() {
        let params = DriftParams {
            steer_interval: 0,
            turn_rate: 0.03,
            initial_heading: Vec2::new(0.0, -1.0),
            ..default()
        };
        let mut state = DriftState::new(&params, 1);
        state.set_target(Vec2::new(1.0, 0.0));
        let bound = max_step_angle(params.turn_rate) + 1e-4;
        for _ in 0..300 {
            let before = state.heading();
            state.tick(&params, None);
            assert!(angle_between(before, state.heading()) <= bound);
            assert!(
                angle_between(state.heading(), Vec2::X) <= angle_between(before, Vec2::X) + 1e-6
            );
        }
        assert!(angle_between(state.heading(), Vec2::X) < 1e-2);
        assert_eq!(state.target(), Vec2::X);
    }

    #[test]
    fn test_degenerate_target_ignored() {
        let mut state = DriftState::new(&DriftParams::default(), 1);
        state.set_target(Vec2::ZERO);
        assert_eq!(state.target(), Vec2::NEG_Y);
    }

    #[test]
    fn test_new_target_only_on_interval() {
        let params = DriftParams::default();
        let mut state = DriftState::new(&params, 11);
        let initial = state.target();
        for _ in 1..params.steer_interval {
            state.tick(&params, None);
        }
        assert_eq!(state.target(), initial);
        state.tick(&params, None);
        assert!(angle_between(initial, state.target()) <= params.max_perturbation + 1e-4);
    }

    #[test]
    fn test_same_seed_same_heading() {
        let params = DriftParams::default();
        let mut a = DriftState::new(&params, 3);
        let mut b = DriftState::new(&params, 3);
        for _ in 0..1000 {
            a.tick(&params, None);
            b.tick(&params, None);
        }
        assert_eq!(a.heading(), b.heading());
    }

    #[test]
    fn test_channel_overrides_heading() {
        let params = DriftParams::default();
        let mut state = DriftState::new(&params, 5);
        state.tick(&params, Some(Vec2::new(3.0, 0.0)));
        assert_eq!(state.heading(), Vec2::X);
        // A degenerate channel heading leaves the blended heading alone.
        state.tick(&params, Some(Vec2::ZERO));
        assert!((state.heading().length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_speed_clamped() {
        let mut state = DriftState::new(&DriftParams::default(), 1);
        state.set_speed(5.0);
        assert_eq!(state.speed(), MAX_DRIFT_SPEED);
        state.set_speed(-1.0);
        assert_eq!(state.speed(), 0.0);
        state.set_speed(f32::NAN);
        assert_eq!(state.speed(), 0.0);
    }

    #[test]
    fn test_max_step_angle() {
        assert!((max_step_angle(0.03) - (0.03_f32 / 0.97).asin()).abs() < 1e-6);
        assert_eq!(max_step_angle(0.0), 0.0);
    }

    #[test]
    fn test_channel_heading_follows_centreline_slope() {
        let channel = WavyChannel::from_heading(Vec2::ZERO, Vec2::new(0.0, -1.0));
        assert_eq!(channel.perp, Vec2::new(1.0, 0.0));
        let heading = channel.heading_at(Vec2::ZERO);
        assert!((heading.length() - 1.0).abs() < 1e-5);
        // At t = 0 the phase is 0.4, so the centreline still bends toward +perp.
        assert!(heading.x > 0.0);
        assert!(heading.y < 0.0);
    }

    #[test]
    fn test_channel_projection() {
        let channel = WavyChannel::from_heading(Vec2::new(1.0, 1.0), Vec2::X);
        let (t, lateral) = channel.project(Vec2::new(4.0, 3.0));
        assert!((t - 3.0).abs() < 1e-5);
        assert!((lateral - 2.0).abs() < 1e-5);
        assert!(WavyChannel::centre_lateral(0.0).abs() <= CHANNEL_AMPLITUDE);
    }
}
