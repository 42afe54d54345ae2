//! One raft survival session: wires the raft, the player and the drift into the fixed
//! tick and handles respawns.

use bevy::prelude::*;
use bevy_log::{debug, info};
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SEED, PLAYER_RESPAWN_HEIGHT, WATER_LEVEL};
use crate::drift::{DriftChannel, DriftParams, DriftState, WavyChannel};
use crate::math::horizontal;
use crate::physics::RaftPhysicsPlugin;
use crate::player::{
    Player, PlayerBundle, PlayerMotion, PlayerPlugin, PlayerRaftCoupling, SwimEnergy,
};
use crate::raft::{spawn_raft, RaftMaster, RaftParams, RaftPlugin, RaftStructureState};
use crate::sets::{configure_raft_tick_sets, RaftTickSet, SimulationTick};
use crate::telemetry::{HudMessage, TelemetryPlugin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RespawnReason {
    RaftDestroyed,
    LeftBubble,
    SwimEnergyDepleted,
    Manual,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnRequest {
    pub reason: RespawnReason,
}

/// Centre of the playable water bubble, follows the raft.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct BubbleCenter(pub Vec2);

pub struct RaftSessionPlugin {
    pub seed: u64,
    /// Install the Rapier pipeline. Off for tests that step systems by hand.
    pub with_physics: bool,
}

impl Default for RaftSessionPlugin {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            with_physics: true,
        }
    }
}

impl Plugin for RaftSessionPlugin {
    fn build(&self, app: &mut App) {
        configure_raft_tick_sets(app);

        let drift_params = app
            .world()
            .get_resource::<DriftParams>()
            .cloned()
            .unwrap_or_default();
        app.insert_resource(DriftState::new(&drift_params, self.seed))
            .insert_resource(drift_params)
            .init_resource::<DriftChannel>()
            .init_resource::<BubbleCenter>()
            .add_event::<RespawnRequest>()
            .add_plugins((RaftPlugin, PlayerPlugin, TelemetryPlugin));

        if self.with_physics {
            app.add_plugins(RaftPhysicsPlugin);
        }

        app.add_systems(Startup, spawn_session)
            .add_systems(
                FixedUpdate,
                (update_bubble_center, update_drift)
                    .chain()
                    .in_set(RaftTickSet::Drift),
            )
            .add_systems(
                FixedUpdate,
                handle_respawn_requests
                    .after(crate::player::systems::update_swim_energy)
                    .in_set(RaftTickSet::Survival),
            );
    }
}

fn spawn_session(
    mut commands: Commands,
    mut state: ResMut<RaftStructureState>,
    params: Res<RaftParams>,
    bubble: Res<BubbleCenter>,
) {
    let centre = bubble.0;
    spawn_raft(&mut commands, &mut state, &params, centre);
    commands.spawn(PlayerBundle::new(player_spawn_point(centre)));
}

pub fn player_spawn_point(centre: Vec2) -> Vec3 {
    Vec3::new(centre.x, WATER_LEVEL + PLAYER_RESPAWN_HEIGHT, centre.y)
}

/// Mean XZ of the beams still on the hull.
pub fn beam_centroid(state: &RaftStructureState, master: &Transform) -> Option<Vec2> {
    if state.layout.is_empty() {
        return None;
    }
    let sum: Vec2 = state
        .layout
        .slots()
        .iter()
        .map(|&x| horizontal(master.transform_point(Vec3::new(x, 0.0, 0.0))))
        .sum();
    Some(sum / state.layout.len() as f32)
}

/// Keep the bubble on the raft, or on the player once the raft is gone.
pub fn update_bubble_center(
    state: Res<RaftStructureState>,
    masters: Query<&Transform, With<RaftMaster>>,
    players: Query<&Transform, (With<Player>, Without<RaftMaster>)>,
    mut bubble: ResMut<BubbleCenter>,
) {
    let from_raft = state
        .master()
        .and_then(|master| masters.get(master).ok())
        .and_then(|transform| beam_centroid(&state, transform));
    let centre = from_raft.or_else(|| {
        players
            .iter()
            .next()
            .map(|transform| horizontal(transform.translation))
    });
    if let Some(centre) = centre {
        bubble.0 = centre;
    }
}

pub fn update_drift(
    params: Res<DriftParams>,
    bubble: Res<BubbleCenter>,
    mut channel: ResMut<DriftChannel>,
    mut drift: ResMut<DriftState>,
) {
    let heading = if params.follow_channel {
        let laid = *channel
            .0
            .get_or_insert_with(|| WavyChannel::from_heading(bubble.0, drift.heading()));
        Some(laid.heading_at(bubble.0))
    } else {
        None
    };
    drift.tick(&params, heading);
}

/// Respawn once per tick no matter how many requests arrived.
pub fn handle_respawn_requests(
    mut commands: Commands,
    mut requests: EventReader<RespawnRequest>,
    mut state: ResMut<RaftStructureState>,
    params: Res<RaftParams>,
    bubble: Res<BubbleCenter>,
    tick: Res<SimulationTick>,
    mut players: Query<
        (
            &mut Transform,
            &mut PlayerMotion,
            &mut PlayerRaftCoupling,
            &mut SwimEnergy,
            Option<&mut Velocity>,
        ),
        With<Player>,
    >,
    mut hud: EventWriter<HudMessage>,
) {
    let Some(request) = requests.read().last().copied() else {
        return;
    };
    info!("Respawning after {:?}", request.reason);

    let centre = bubble.0;
    spawn_raft(&mut commands, &mut state, &params, centre);

    for (mut transform, mut motion, mut coupling, mut swim, velocity) in players.iter_mut() {
        transform.translation = player_spawn_point(centre);
        *motion = PlayerMotion::default();
        if let Some(mut velocity) = velocity {
            *velocity = Velocity::zero();
        }
        coupling.reset();
        swim.refill();
        if let Some(update) = swim.hud_update(false, true, tick.0) {
            hud.write(HudMessage::SwimEnergy {
                value: update.value,
                in_water: update.in_water,
            });
        }
        debug!("Player moved to {:?}", transform.translation);
    }
}
