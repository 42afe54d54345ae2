use bevy::prelude::*;
use bevy_log::{debug, info};
use bevy_rapier3d::prelude::*;

use super::coupling::{CouplingInput, CouplingParams, PlayerRaftCoupling};
use super::survival::{is_swimming, left_bubble, SwimEnergy, TerrainQuery};
use super::{Player, PlayerControl, PlayerMotion};
use crate::physics::movement::{integrate_player_motion, read_character_output};
use crate::raft::{raft_snapshot, RaftMaster, RaftPassenger, RaftStructureState};
use crate::session::{BubbleCenter, RespawnReason, RespawnRequest};
use crate::sets::{RaftTickSet, SimulationTick};
use crate::telemetry::HudMessage;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CouplingParams>()
            .init_resource::<TerrainQuery>()
            .add_systems(
                FixedUpdate,
                (read_character_output, couple_player_to_raft)
                    .chain()
                    .in_set(RaftTickSet::Coupling),
            )
            .add_systems(
                FixedUpdate,
                apply_landing_boost.in_set(RaftTickSet::LandingBoost),
            )
            .add_systems(
                FixedUpdate,
                integrate_player_motion.in_set(RaftTickSet::Movement),
            )
            .add_systems(
                FixedUpdate,
                update_swim_energy.in_set(RaftTickSet::Survival),
            );
    }
}

/// Sample the player against the deck and hand the resulting load to the raft physics.
pub fn couple_player_to_raft(
    params: Res<CouplingParams>,
    state: Res<RaftStructureState>,
    masters: Query<(&Transform, &Velocity, &ReadMassProperties), With<RaftMaster>>,
    mut players: Query<
        (
            &Transform,
            &PlayerControl,
            &mut PlayerMotion,
            &mut PlayerRaftCoupling,
        ),
        (With<Player>, Without<RaftMaster>),
    >,
    mut passenger: ResMut<RaftPassenger>,
    mut respawns: EventWriter<RespawnRequest>,
) {
    *passenger = RaftPassenger::default();

    let body = masters
        .single()
        .ok()
        .filter(|_| state.is_spawned())
        .map(|(transform, velocity, mass)| raft_snapshot(transform, velocity, mass));
    let raft = body.as_ref().map(|body| (body, &state.layout));

    for (transform, control, mut motion, mut coupling) in players.iter_mut() {
        let was_attached = coupling.is_attached();
        let outcome = coupling.step(
            CouplingInput {
                position: transform.translation,
                velocity: motion.velocity,
                grounded: motion.grounded,
                movement: control.movement,
                jump_pressed: control.jump_pressed,
            },
            raft,
            &params,
        );
        motion.velocity = outcome.velocity;
        passenger.load = outcome.load(params.player_weight);
        passenger.landing_boost = outcome.raft_boost;

        if was_attached != coupling.is_attached() {
            debug!("Player attached to raft: {}", coupling.is_attached());
        }
        if outcome.respawn {
            info!("Raft lost its last beam under the player");
            respawns.write(RespawnRequest {
                reason: RespawnReason::RaftDestroyed,
            });
        }
    }
}

/// Layer the landing kick on top of the buoyancy impulse written earlier this tick.
pub fn apply_landing_boost(
    passenger: Res<RaftPassenger>,
    mut masters: Query<&mut ExternalImpulse, With<RaftMaster>>,
) {
    let Some(boost) = passenger.landing_boost else {
        return;
    };
    if let Ok(mut external) = masters.single_mut() {
        external.impulse += boost;
    }
}

pub fn update_swim_energy(
    tick: Res<SimulationTick>,
    terrain: Res<TerrainQuery>,
    bubble: Res<BubbleCenter>,
    mut players: Query<(&Transform, &PlayerRaftCoupling, &mut SwimEnergy), With<Player>>,
    mut hud: EventWriter<HudMessage>,
    mut respawns: EventWriter<RespawnRequest>,
) {
    for (transform, coupling, mut swim) in players.iter_mut() {
        let position = transform.translation;
        let in_water = is_swimming(
            coupling.is_attached(),
            terrain.is_island_base(position.x, position.z),
            position.y,
        );
        let outcome = swim.tick(in_water, tick.0);
        if let Some(update) = outcome.send {
            hud.write(HudMessage::SwimEnergy {
                value: update.value,
                in_water: update.in_water,
            });
        }
        if outcome.depleted {
            respawns.write(RespawnRequest {
                reason: RespawnReason::SwimEnergyDepleted,
            });
            continue;
        }
        if left_bubble(position, bubble.0) {
            respawns.write(RespawnRequest {
                reason: RespawnReason::LeftBubble,
            });
        }
    }
}
