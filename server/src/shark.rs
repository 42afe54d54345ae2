use bevy::prelude::*;
use bevy_ecs::system::{Res, ResMut};
use bevy_log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::constants::{BUBBLE_RADIUS, TICK_DELTA, WATER_LEVEL};
use shared::math::horizontal;
use shared::player::Player;
use shared::raft::{Debris, RaftMaster, RaftShove, RaftStructureState};
use shared::session::{BubbleCenter, RespawnRequest};
use shared::sets::{RaftTickSet, SimulationTick};

pub mod constants {
    pub const CIRCLE_SPEED: f32 = 8.0;
    pub const CIRCLE_RADIUS: f32 = 15.0;
    /// Orbit angle advance, radians per second
    pub const CIRCLE_ANGULAR_RATE: f32 = 0.5;
    pub const RAM_SPEED: f32 = 15.0;
    /// Per-tick chance to start a ram while circling
    pub const RAM_CHANCE: f32 = 0.02;
    pub const RAM_TIMEOUT_TICKS: u32 = 120;
    pub const RAM_HIT_DISTANCE: f32 = 2.2;
    pub const SHOVE_RADIUS: f32 = 3.0;
    pub const SHOVE_GAIN: f32 = 25.0;
    pub const SHOVE_LIFT: f32 = 10.0;
    /// Cruising depth below the water level
    pub const SWIM_DEPTH: f32 = 0.5;
    pub const DEPTH_GAIN: f32 = 5.0;
    /// Spawn distance inside the bubble edge
    pub const SPAWN_INSET: f32 = 5.0;
    pub const ARRIVE_DISTANCE: f32 = 0.1;
}

use constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SharkBehavior {
    #[default]
    Circling,
    Ramming {
        target: Vec2,
        timer: u32,
    },
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Shark {
    pub behavior: SharkBehavior,
    pub velocity: Vec3,
    pub yaw: f32,
}

/// A beam the shark may ram, either a slot of the hull or a debris body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamTarget {
    pub body: Entity,
    pub position: Vec3,
}

#[derive(Resource)]
pub struct SharkRng(pub StdRng);

impl Shark {
    /// Advance the shark brain by one tick. `roll` is a uniform sample in `[0, 1)`.
    pub fn think(
        &mut self,
        position: Vec3,
        orbit_centre: Vec2,
        time: f32,
        beams: &[BeamTarget],
        roll: f32,
    ) -> Vec<RaftShove> {
        let here = horizontal(position);
        let mut target = None;

        match self.behavior {
            SharkBehavior::Circling => {
                let nearest = beams.iter().min_by(|a, b| {
                    here.distance_squared(horizontal(a.position))
                        .total_cmp(&here.distance_squared(horizontal(b.position)))
                });
                match nearest {
                    Some(beam) if roll < RAM_CHANCE => {
                        let aim = horizontal(beam.position);
                        self.behavior = SharkBehavior::Ramming {
                            target: aim,
                            timer: RAM_TIMEOUT_TICKS,
                        };
                        target = Some(aim);
                        debug!("Shark ramming beam at {:?}", aim);
                    }
                    _ => {
                        let angle = time * CIRCLE_ANGULAR_RATE;
                        target = Some(
                            orbit_centre + Vec2::new(angle.cos(), angle.sin()) * CIRCLE_RADIUS,
                        );
                    }
                }
            }
            SharkBehavior::Ramming { target: aim, timer } => {
                if timer == 0 || beams.is_empty() {
                    self.behavior = SharkBehavior::Circling;
                } else {
                    self.behavior = SharkBehavior::Ramming {
                        target: aim,
                        timer: timer - 1,
                    };
                    target = Some(aim);
                }
            }
        }

        if let Some(target) = target {
            let delta = target - here;
            let distance = delta.length();
            let speed = match self.behavior {
                SharkBehavior::Ramming { .. } => RAM_SPEED,
                SharkBehavior::Circling => CIRCLE_SPEED,
            };
            let planar = if distance > ARRIVE_DISTANCE {
                delta / distance * speed
            } else {
                Vec2::ZERO
            };
            let vy = (WATER_LEVEL - SWIM_DEPTH - position.y) * DEPTH_GAIN;
            self.velocity = Vec3::new(planar.x, vy, planar.y);
            self.yaw = delta.x.atan2(delta.y);
        }

        let SharkBehavior::Ramming { target: aim, .. } = self.behavior else {
            return Vec::new();
        };
        if here.distance(aim) >= RAM_HIT_DISTANCE {
            return Vec::new();
        }
        self.behavior = SharkBehavior::Circling;
        beams
            .iter()
            .filter_map(|beam| {
                let offset = horizontal(beam.position) - here;
                (offset.length() < SHOVE_RADIUS).then(|| RaftShove {
                    body: beam.body,
                    point: beam.position,
                    impulse: Vec3::new(offset.x * SHOVE_GAIN, SHOVE_LIFT, offset.y * SHOVE_GAIN),
                })
            })
            .collect()
    }
}

pub struct SharkPlugin {
    pub seed: u64,
}

impl Plugin for SharkPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SharkRng(StdRng::seed_from_u64(self.seed)))
            .add_systems(Startup, spawn_shark)
            .add_systems(
                FixedUpdate,
                (respawn_shark, update_sharks)
                    .chain()
                    .in_set(RaftTickSet::Collaborators),
            );
    }
}

fn shark_spawn_point(centre: Vec2, rng: &mut StdRng) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = BUBBLE_RADIUS - SPAWN_INSET;
    Vec3::new(
        centre.x + angle.cos() * distance,
        WATER_LEVEL - SWIM_DEPTH,
        centre.y + angle.sin() * distance,
    )
}

fn spawn_shark(mut commands: Commands, bubble: Res<BubbleCenter>, mut rng: ResMut<SharkRng>) {
    let position = shark_spawn_point(bubble.0, &mut rng.0);
    commands.spawn((Shark::default(), Transform::from_translation(position)));
    info!("Shark spawned at {:?}", position);
}

fn respawn_shark(
    mut requests: EventReader<RespawnRequest>,
    bubble: Res<BubbleCenter>,
    mut rng: ResMut<SharkRng>,
    mut sharks: Query<(&mut Shark, &mut Transform)>,
) {
    if requests.read().count() == 0 {
        return;
    }
    for (mut shark, mut transform) in sharks.iter_mut() {
        *shark = Shark::default();
        transform.translation = shark_spawn_point(bubble.0, &mut rng.0);
    }
}

/// Hull slots and loose debris, in world space.
pub fn collect_beam_targets(
    state: &RaftStructureState,
    master: Option<&Transform>,
    debris: impl Iterator<Item = (Entity, Vec3)>,
) -> Vec<BeamTarget> {
    let mut beams: Vec<BeamTarget> = match (state.master(), master) {
        (Some(body), Some(transform)) => state
            .layout
            .slots()
            .iter()
            .map(|&x| BeamTarget {
                body,
                position: transform.transform_point(Vec3::new(x, 0.0, 0.0)),
            })
            .collect(),
        _ => Vec::new(),
    };
    beams.extend(debris.map(|(body, position)| BeamTarget { body, position }));
    beams
}

fn update_sharks(
    tick: Res<SimulationTick>,
    bubble: Res<BubbleCenter>,
    state: Res<RaftStructureState>,
    mut rng: ResMut<SharkRng>,
    masters: Query<&Transform, (With<RaftMaster>, Without<Shark>)>,
    debris: Query<(Entity, &Transform), (With<Debris>, Without<Shark>)>,
    players: Query<&Transform, (With<Player>, Without<Shark>)>,
    mut sharks: Query<(&mut Shark, &mut Transform)>,
    mut shoves: EventWriter<RaftShove>,
) {
    let master = state.master().and_then(|entity| masters.get(entity).ok());
    let beams = collect_beam_targets(
        &state,
        master,
        debris.iter().map(|(entity, transform)| (entity, transform.translation)),
    );
    let orbit_centre = players
        .iter()
        .next()
        .map(|transform| horizontal(transform.translation))
        .unwrap_or(bubble.0);
    let time = tick.0 as f32 * TICK_DELTA;

    for (mut shark, mut transform) in sharks.iter_mut() {
        let roll = rng.0.gen::<f32>();
        let hits = shark.think(transform.translation, orbit_centre, time, &beams, roll);
        if !hits.is_empty() {
            info!("Shark hit the raft, {} beams shoved", hits.len());
            shoves.write_batch(hits);
        }
        transform.translation += shark.velocity * TICK_DELTA;
        transform.rotation = Quat::from_rotation_y(shark.yaw);
    }
}
