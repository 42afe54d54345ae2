use bevy::prelude::*;
use bevy_ecs::resource::Resource;
use bevy_log::debug;
use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::drift::DriftState;
use crate::raft::RaftStructureState;
use crate::session::BubbleCenter;
use crate::sets::{RaftTickSet, SimulationTick};

pub const MINIMAP_INTERVAL: u64 = 5;

/// Latest raft state as seen by the HUD and the minimap.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaftTelemetry {
    pub tick: u64,
    pub centre: Vec2,
    pub heading: Vec2,
    pub drift_speed: f32,
    pub beams: usize,
    pub debris: usize,
}

impl Default for RaftTelemetry {
    fn default() -> Self {
        Self {
            tick: 0,
            centre: Vec2::ZERO,
            heading: Vec2::NEG_Y,
            drift_speed: 0.0,
            beams: 0,
            debris: 0,
        }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HudMessage {
    Minimap {
        centre: Vec2,
        heading: Vec2,
        beams: usize,
    },
    SwimEnergy {
        value: f32,
        in_water: bool,
    },
}

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RaftTelemetry>()
            .add_event::<HudMessage>()
            .add_systems(
                FixedUpdate,
                update_telemetry.in_set(RaftTickSet::Collaborators),
            );
    }
}

pub fn update_telemetry(
    tick: Res<SimulationTick>,
    bubble: Res<BubbleCenter>,
    state: Res<RaftStructureState>,
    drift: Option<Res<DriftState>>,
    mut telemetry: ResMut<RaftTelemetry>,
    mut hud: EventWriter<HudMessage>,
) {
    let (heading, drift_speed) = drift
        .map(|d| (d.heading(), d.speed()))
        .unwrap_or((telemetry.heading, 0.0));
    *telemetry = RaftTelemetry {
        tick: tick.0,
        centre: bubble.0,
        heading,
        drift_speed,
        beams: if state.is_spawned() {
            state.layout.len()
        } else {
            0
        },
        debris: state.debris().len(),
    };

    if tick.0 % MINIMAP_INTERVAL == 0 {
        hud.write(HudMessage::Minimap {
            centre: telemetry.centre,
            heading: telemetry.heading,
            beams: telemetry.beams,
        });
    }
}

/// Encode a HUD message for whatever transport the front end uses.
pub fn hud_message_to_payload(message: &HudMessage) -> Result<Vec<u8>, bincode::Error> {
    let payload = bincode::options().serialize(message)?;
    let output = lz4::block::compress(&payload, None, true)?;
    debug!(
        "HUD payload {} bytes, compressed {} bytes",
        payload.len(),
        output.len()
    );
    Ok(output)
}

pub fn payload_to_hud_message(payload: &[u8]) -> Result<HudMessage, bincode::Error> {
    let decompressed = lz4::block::decompress(payload, None)?;
    bincode::options().deserialize(&decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::DriftParams;
    use bevy::ecs::system::RunSystemOnce;

    fn telemetry_world(tick: u64) -> World {
        let mut world = World::new();
        world.insert_resource(SimulationTick(tick));
        world.insert_resource(BubbleCenter(Vec2::new(3.0, -7.0)));
        world.init_resource::<RaftStructureState>();
        world.init_resource::<RaftTelemetry>();
        world.init_resource::<Events<HudMessage>>();
        world
    }

    fn drain(world: &mut World) -> Vec<HudMessage> {
        world.resource_mut::<Events<HudMessage>>().drain().collect()
    }

    #[test]
    fn test_minimap_sent_every_five_ticks() {
        let mut world = telemetry_world(10);
        world.insert_resource(DriftState::new(&DriftParams::default(), 1));
        world.run_system_once(update_telemetry).unwrap();

        let telemetry = *world.resource::<RaftTelemetry>();
        assert_eq!(telemetry.centre, Vec2::new(3.0, -7.0));
        assert_eq!(telemetry.heading, Vec2::NEG_Y);
        assert_eq!(telemetry.beams, 0);
        assert_eq!(
            drain(&mut world),
            vec![HudMessage::Minimap {
                centre: Vec2::new(3.0, -7.0),
                heading: Vec2::NEG_Y,
                beams: 0,
            }]
        );

        world.insert_resource(SimulationTick(11));
        world.run_system_once(update_telemetry).unwrap();
        assert!(drain(&mut world).is_empty());
    }

    #[test]
    fn test_beam_count_tracks_spawned_raft() {
        let mut world = telemetry_world(1);
        world
            .resource_mut::<RaftStructureState>()
            .entities
            .master = Some(Entity::from_raw(9));
        world.run_system_once(update_telemetry).unwrap();
        assert_eq!(world.resource::<RaftTelemetry>().beams, 5);
        assert_eq!(world.resource::<RaftTelemetry>().drift_speed, 0.0);
    }

    #[test]
    fn test_hud_payload_decodes() {
        let message = HudMessage::SwimEnergy {
            value: 0.42,
            in_water: true,
        };
        let payload = hud_message_to_payload(&message).unwrap();
        assert_eq!(payload_to_hud_message(&payload).unwrap(), message);
    }
}
