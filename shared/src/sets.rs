use bevy::prelude::*;

/// Ordering of one fixed simulation tick.
///
/// Structural intents queued by last tick's collision events are drained first so the
/// physics snapshot never sees a half-applied layout change.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum RaftTickSet {
    Structure,
    Drift,
    Coupling,
    RaftPhysics,
    LandingBoost,
    Movement,
    Survival,
    Collaborators,
}

/// Number of fixed ticks simulated so far.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationTick(pub u64);

fn advance_tick(mut tick: ResMut<SimulationTick>) {
    tick.0 += 1;
}

pub fn configure_raft_tick_sets(app: &mut App) {
    app.init_resource::<SimulationTick>();
    app.configure_sets(
        FixedUpdate,
        (
            RaftTickSet::Structure,
            RaftTickSet::Drift,
            RaftTickSet::Coupling,
            RaftTickSet::RaftPhysics,
            RaftTickSet::LandingBoost,
            RaftTickSet::Movement,
            RaftTickSet::Survival,
            RaftTickSet::Collaborators,
        )
            .chain(),
    );
    app.add_systems(FixedUpdate, advance_tick.in_set(RaftTickSet::Structure));
}
