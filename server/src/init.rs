use std::time::Duration;

use bevy::prelude::*;
use bevy::transform::TransformPlugin;
use bevy_app::ScheduleRunnerPlugin;
use bevy_log::{debug, info};
use log::warn as log_warn;
use shared::sets::{RaftTickSet, SimulationTick};
use shared::telemetry::{hud_message_to_payload, HudMessage};
use shared::{RaftSessionPlugin, TICKS_PER_SECOND};

use crate::autopilot::AutopilotPlugin;
use crate::config::SessionTuning;
use crate::reef::ReefPlugin;
use crate::shark::SharkPlugin;

/// Everything needed to start a headless session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub seed: u64,
    /// Stop after this many fixed ticks
    pub tick_limit: Option<u64>,
    pub tuning: SessionTuning,
    pub shark: bool,
    pub autopilot: bool,
    pub reefs: usize,
    pub log: bool,
}

#[derive(Resource, Debug, Clone, Copy)]
pub struct TickLimit(pub u64);

fn stop_at_tick_limit(
    tick: Res<SimulationTick>,
    limit: Res<TickLimit>,
    mut exit: EventWriter<AppExit>,
) {
    if tick.0 >= limit.0 {
        info!("Tick limit {} reached, stopping", limit.0);
        exit.write(AppExit::Success);
    }
}

/// Stand-in for the HUD transport: encode every message and report its size.
fn relay_hud_messages(mut messages: EventReader<HudMessage>) {
    for message in messages.read() {
        match hud_message_to_payload(message) {
            Ok(payload) => debug!("HUD {:?} ({} bytes)", message, payload.len()),
            Err(err) => log_warn!("Could not encode HUD message {:?}: {}", message, err),
        }
    }
}

pub fn build_app(config: SessionConfig) -> App {
    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / TICKS_PER_SECOND as f64,
        ))),
    );
    app.add_plugins(TransformPlugin);
    if config.log {
        let level = if config.tuning.raft.debug {
            bevy::log::Level::DEBUG
        } else {
            bevy::log::Level::INFO
        };
        app.add_plugins(bevy::log::LogPlugin {
            level,
            ..default()
        });
    }
    app.insert_resource(Time::<Fixed>::from_hz(TICKS_PER_SECOND as f64));

    config.tuning.insert_into(&mut app);
    app.add_plugins(RaftSessionPlugin {
        seed: config.seed,
        with_physics: true,
    });

    if config.reefs > 0 {
        app.add_plugins(ReefPlugin {
            count: config.reefs,
            seed: config.seed,
        });
    }
    if config.shark {
        app.add_plugins(SharkPlugin {
            seed: config.seed.wrapping_add(1),
        });
    }
    if config.autopilot {
        app.add_plugins(AutopilotPlugin);
    }

    app.add_systems(
        FixedUpdate,
        relay_hud_messages.in_set(RaftTickSet::Collaborators),
    );
    if let Some(limit) = config.tick_limit {
        app.insert_resource(TickLimit(limit));
        app.add_systems(
            FixedUpdate,
            stop_at_tick_limit.in_set(RaftTickSet::Collaborators),
        );
    }

    info!(
        "Session ready: seed={} shark={} autopilot={} reefs={}",
        config.seed, config.shark, config.autopilot, config.reefs
    );
    app
}

pub fn init(config: SessionConfig) -> AppExit {
    build_app(config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::drift::DriftState;
    use shared::player::TerrainQuery;

    #[test]
    fn test_build_app_applies_tuning() {
        let mut tuning = SessionTuning::default();
        tuning.drift.speed = 0.5;
        tuning.raft.mass = 300.0;
        let app = build_app(SessionConfig {
            seed: 4,
            tick_limit: Some(10),
            tuning,
            shark: true,
            autopilot: true,
            reefs: 2,
            log: false,
        });
        let world = app.world();
        assert_eq!(world.resource::<DriftState>().speed(), 0.5);
        assert_eq!(world.resource::<shared::raft::RaftParams>().mass, 300.0);
        assert_eq!(world.resource::<TickLimit>().0, 10);
        assert_eq!(world.resource::<crate::reef::ReefField>().reefs.len(), 2);
        assert!(world.contains_resource::<TerrainQuery>());
    }
}
