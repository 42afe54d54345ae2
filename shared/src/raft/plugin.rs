use bevy::prelude::*;
use bevy_log::{debug, info};
use bevy_rapier3d::prelude::*;
use log::warn as log_warn;

use super::buoyancy::{compute_debris_impulse, compute_raft_impulse, visual_wiggle, DriftInput};
use super::config::{constants::MAX_BEAMS, RaftParams};
use super::structure::{RaftEntities, RaftStructureState, StructureIntent};
use super::{
    BeamCollectionResult, BeamSensor, CollectBeamRequest, Debris, FloatingBeam, RaftBodySnapshot,
    RaftDeck, RaftMaster, RaftPassenger, RaftShove, RaftVisibility, RaftVisual,
};
use crate::constants::{RAFT_SPAWN_HEIGHT, TICK_DELTA, WATER_LEVEL};
use crate::drift::DriftState;
use crate::math::impulse_at_point;
use crate::physics::{
    BeamSensorBundle, DebrisBundle, RaftDeckBundle, RaftMasterBundle, TerrainCollider,
};
use crate::sets::{RaftTickSet, SimulationTick};

pub struct RaftPlugin;

impl Plugin for RaftPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RaftParams>()
            .init_resource::<RaftStructureState>()
            .init_resource::<RaftPassenger>()
            .add_event::<CollectBeamRequest>()
            .add_event::<BeamCollectionResult>()
            .add_event::<RaftShove>()
            .add_systems(
                FixedUpdate,
                (
                    queue_structure_intents,
                    apply_structure_intents,
                    handle_collect_requests,
                    tick_debris,
                    sync_raft_geometry,
                    animate_raft_visuals,
                )
                    .chain()
                    .in_set(RaftTickSet::Structure),
            )
            .add_systems(
                FixedUpdate,
                (apply_raft_buoyancy, apply_debris_buoyancy).in_set(RaftTickSet::RaftPhysics),
            );
    }
}

pub fn raft_snapshot(
    transform: &Transform,
    velocity: &Velocity,
    mass: &ReadMassProperties,
) -> RaftBodySnapshot {
    RaftBodySnapshot {
        position: transform.translation,
        rotation: transform.rotation,
        linvel: velocity.linvel,
        angvel: velocity.angvel,
        mass: mass.get().mass,
    }
}

type MasterQuery<'w, 's> = Query<
    'w,
    's,
    (&'static Transform, &'static Velocity, &'static ReadMassProperties),
    With<RaftMaster>,
>;

fn read_master(masters: &MasterQuery) -> Option<RaftBodySnapshot> {
    masters
        .single()
        .ok()
        .map(|(transform, velocity, mass)| raft_snapshot(transform, velocity, mass))
}

/// Spawn a fresh raft centred on `centre`, despawning whatever was left of the last one.
pub fn spawn_raft(
    commands: &mut Commands,
    state: &mut RaftStructureState,
    params: &RaftParams,
    centre: Vec2,
) -> Entity {
    for entity in state.reset_for_spawn() {
        if let Ok(mut entity) = commands.get_entity(entity) {
            entity.try_despawn();
        }
    }

    let position = Vec3::new(centre.x, WATER_LEVEL + RAFT_SPAWN_HEIGHT, centre.y);
    let master = commands
        .spawn((
            RaftMasterBundle::new(position, params),
            RaftVisibility::default(),
        ))
        .id();

    let geometry = state.layout.geometry();
    let deck = commands
        .spawn((
            RaftDeckBundle::new(geometry.origin_x, geometry.half_x),
            ChildOf(master),
        ))
        .id();
    let sensors = (0..MAX_BEAMS)
        .map(|slot| {
            let x = state.layout.slots().get(slot).copied().unwrap_or(0.0);
            commands
                .spawn((BeamSensorBundle::new(slot, x), ChildOf(master)))
                .id()
        })
        .collect();

    state.entities = RaftEntities {
        master: Some(master),
        deck: Some(deck),
        sensors,
        visuals: Vec::new(),
    };

    info!(
        "Spawned raft with {} beams at ({:.1}, {:.1})",
        state.layout.len(),
        centre.x,
        centre.y
    );
    master
}

/// Turn collision events into structural intents; nothing is mutated until the next drain.
fn queue_structure_intents(
    mut events: EventReader<CollisionEvent>,
    sensors: Query<&BeamSensor>,
    terrain: Query<(), With<TerrainCollider>>,
    decks: Query<(), With<RaftDeck>>,
    debris: Query<(), With<Debris>>,
    mut state: ResMut<RaftStructureState>,
) {
    for event in events.read() {
        let CollisionEvent::Started(a, b, _) = *event else {
            continue;
        };
        for (this, other) in [(a, b), (b, a)] {
            if let Ok(sensor) = sensors.get(this) {
                if terrain.contains(other) && sensor.slot < state.layout.len() {
                    state.enqueue(StructureIntent::BreakBeam { slot: sensor.slot });
                }
            }
            if debris.contains(this) && decks.contains(other) {
                state.enqueue(StructureIntent::ReattachDebris { debris: this });
            }
        }
    }
}

fn apply_structure_intents(
    mut commands: Commands,
    mut state: ResMut<RaftStructureState>,
    masters: MasterQuery,
    debris: Query<&Transform, With<Debris>>,
) {
    if !state.has_pending() {
        return;
    }
    let intents = state.drain_intents();
    let Some(body) = read_master(&masters) else {
        log_warn!("Dropping {} structure intents, raft master missing", intents.len());
        return;
    };

    // Highest slot first so earlier removals do not shift the indices still queued.
    let mut breaks: Vec<usize> = intents
        .iter()
        .filter_map(|intent| match intent {
            StructureIntent::BreakBeam { slot } => Some(*slot),
            _ => None,
        })
        .collect();
    breaks.sort_unstable_by(|a, b| b.cmp(a));
    breaks.dedup();

    for slot in breaks {
        let Some(broken) = state.break_beam(slot, &body) else {
            continue;
        };
        let entity = commands.spawn(DebrisBundle::from_broken(&broken)).id();
        state.register_debris(entity);
        info!("Beam {} broke off, {} left", slot, state.layout.len());
    }

    for intent in intents {
        let StructureIntent::ReattachDebris { debris: entity } = intent else {
            continue;
        };
        let Ok(transform) = debris.get(entity) else {
            state.forget_debris(entity);
            continue;
        };
        if state.try_reattach_debris(entity, transform.translation, &body) {
            commands.entity(entity).despawn();
            info!("Debris reattached, {} beams", state.layout.len());
        }
    }
}

fn handle_collect_requests(
    mut commands: Commands,
    mut requests: EventReader<CollectBeamRequest>,
    mut results: EventWriter<BeamCollectionResult>,
    mut state: ResMut<RaftStructureState>,
    masters: MasterQuery,
    beams: Query<&Transform, (With<FloatingBeam>, Without<RaftMaster>)>,
) {
    for request in requests.read() {
        let accepted = match (read_master(&masters), beams.get(request.beam)) {
            (Some(body), Ok(beam)) => {
                state.collect_floating_beam(beam.translation, request.local_offset_hint, &body)
            }
            _ => false,
        };
        if accepted {
            commands.entity(request.beam).despawn();
            state.forget_debris(request.beam);
            debug!("Collected floating beam, {} beams", state.layout.len());
        }
        results.write(BeamCollectionResult {
            beam: request.beam,
            accepted,
        });
    }
}

fn tick_debris(mut state: ResMut<RaftStructureState>, debris: Query<(), With<Debris>>) {
    state.tick_cooldowns();
    state.retain_debris(|entity| debris.contains(entity));
}

/// Rebuild sensors, deck and visuals whenever the layout or the raft itself changed.
fn sync_raft_geometry(
    mut commands: Commands,
    mut state: ResMut<RaftStructureState>,
    mut synced: Local<Option<(u64, Entity)>>,
    mut sensors: Query<(&BeamSensor, &mut Transform), Without<RaftDeck>>,
    mut decks: Query<(&mut Collider, &mut Transform), (With<RaftDeck>, Without<BeamSensor>)>,
    mut visibility: Query<&mut RaftVisibility>,
) {
    let Some(master) = state.master() else {
        return;
    };
    let key = (state.layout.revision(), master);
    if *synced == Some(key) {
        return;
    }
    *synced = Some(key);

    let slots = state.layout.slots().to_vec();
    let geometry = state.layout.geometry();

    for &entity in &state.entities.sensors {
        let Ok((sensor, mut transform)) = sensors.get_mut(entity) else {
            continue;
        };
        match slots.get(sensor.slot) {
            Some(&x) => {
                transform.translation.x = x;
                commands.entity(entity).remove::<ColliderDisabled>();
            }
            None => {
                commands.entity(entity).insert(ColliderDisabled);
            }
        }
    }

    if let Some(deck) = state.entities.deck {
        if let Ok((mut collider, mut transform)) = decks.get_mut(deck) {
            *collider = Collider::cuboid(geometry.half_x, 0.5, geometry.half_z);
            transform.translation.x = geometry.origin_x;
        }
    }

    for entity in state.entities.visuals.drain(..) {
        if let Ok(mut entity) = commands.get_entity(entity) {
            entity.try_despawn();
        }
    }
    let centre = state.layout.centre_slot();
    let visuals = slots
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != centre)
        .map(|(index, &offset_x)| {
            commands
                .spawn((
                    RaftVisual { index, offset_x },
                    Transform::from_xyz(offset_x, 0.0, 0.0),
                    ChildOf(master),
                ))
                .id()
        })
        .collect();
    state.entities.visuals = visuals;

    if let Ok(mut visibility) = visibility.get_mut(master) {
        *visibility = if centre.is_some() {
            RaftVisibility::CentreBeamVisible
        } else {
            RaftVisibility::CentreBeamHidden
        };
    }
}

fn animate_raft_visuals(
    tick: Res<SimulationTick>,
    mut visuals: Query<(&RaftVisual, &mut Transform)>,
) {
    for (visual, mut transform) in visuals.iter_mut() {
        transform.translation =
            Vec3::new(visual.offset_x, visual_wiggle(tick.0, visual.index), 0.0);
    }
}

fn current_drift(drift: Option<Res<DriftState>>) -> DriftInput {
    drift.map(|d| d.input()).unwrap_or(DriftInput {
        direction: Vec2::NEG_Y,
        speed: 0.0,
    })
}

/// Drain this tick's shoves, keeping those aimed at the master.
fn master_shoves(shoves: &mut EventReader<RaftShove>, master: Entity) -> Vec<RaftShove> {
    shoves
        .read()
        .filter(|shove| shove.body == master)
        .copied()
        .collect()
}

fn apply_raft_buoyancy(
    params: Res<RaftParams>,
    state: Res<RaftStructureState>,
    passenger: Res<RaftPassenger>,
    tick: Res<SimulationTick>,
    drift: Option<Res<DriftState>>,
    mut shoves: EventReader<RaftShove>,
    mut masters: Query<
        (Entity, &Transform, &Velocity, &ReadMassProperties, &mut ExternalImpulse),
        With<RaftMaster>,
    >,
) {
    let Ok((entity, transform, velocity, mass, mut external)) = masters.single_mut() else {
        shoves.clear();
        return;
    };
    let shoves = master_shoves(&mut shoves, entity);
    let body = raft_snapshot(transform, velocity, mass);
    if body.mass <= 0.0 {
        return;
    }

    let (impulse, report) = compute_raft_impulse(
        &body,
        &state.layout,
        &params,
        passenger.load,
        current_drift(drift),
        TICK_DELTA,
    );
    external.impulse = impulse.linear;
    external.torque_impulse = impulse.torque;
    for shove in shoves {
        let (linear, torque) = impulse_at_point(shove.impulse, body.position, shove.point);
        external.impulse += linear;
        external.torque_impulse += torque;
    }

    if params.debug && params.debug_interval > 0 && tick.0 % params.debug_interval as u64 == 0 {
        let geometry = state.layout.geometry();
        debug!(
            "raft pos={:?} vel={:?} omega={:?} avg_depth={:.3} wet={} impulse={:?} torque={:?} \
             origin_x={:.2} deck_half_x={:.2} control_half_x={:.2} slots={:?}",
            body.position,
            body.linvel,
            body.angvel,
            report.average_depth,
            report.wet_points,
            impulse.linear,
            impulse.torque,
            geometry.origin_x,
            geometry.half_x,
            geometry.control_half_x,
            state.layout.slots()
        );
    }
}

fn apply_debris_buoyancy(
    drift: Option<Res<DriftState>>,
    mut shoves: EventReader<RaftShove>,
    mut debris: Query<
        (&Transform, &Velocity, &ReadMassProperties, &mut ExternalImpulse),
        (With<Debris>, Without<RaftMaster>),
    >,
) {
    let drift = current_drift(drift);
    for (transform, velocity, mass, mut external) in debris.iter_mut() {
        let mass = mass.get().mass;
        if mass <= 0.0 {
            continue;
        }
        external.impulse =
            compute_debris_impulse(transform.translation, velocity.linvel, mass, drift, TICK_DELTA);
    }
    for shove in shoves.read() {
        if let Ok((_, _, _, mut external)) = debris.get_mut(shove.body) {
            external.impulse += shove.impulse;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use bevy_rapier3d::rapier::geometry::CollisionEventFlags;

    fn spawn_test_raft(world: &mut World) -> Entity {
        world.init_resource::<RaftStructureState>();
        world.init_resource::<Events<CollisionEvent>>();
        world.init_resource::<Events<CollectBeamRequest>>();
        world.init_resource::<Events<BeamCollectionResult>>();
        world
            .run_system_once(
                |mut commands: Commands, mut state: ResMut<RaftStructureState>| {
                    spawn_raft(&mut commands, &mut state, &RaftParams::default(), Vec2::ZERO)
                },
            )
            .unwrap()
    }

    #[test]
    fn test_spawn_raft_creates_children() {
        let mut world = World::new();
        let master = spawn_test_raft(&mut world);
        let state = world.resource::<RaftStructureState>();
        assert_eq!(state.master(), Some(master));
        assert_eq!(state.entities.sensors.len(), MAX_BEAMS);
        let position = world.get::<Transform>(master).unwrap().translation;
        assert!((position.y - (WATER_LEVEL + RAFT_SPAWN_HEIGHT)).abs() < 1e-5);
    }

    #[test]
    fn test_geometry_sync_spawns_visuals_for_non_centre_beams() {
        let mut world = World::new();
        world.init_resource::<SimulationTick>();
        let master = spawn_test_raft(&mut world);
        world.run_system_once(sync_raft_geometry).unwrap();

        let state = world.resource::<RaftStructureState>();
        assert_eq!(state.entities.visuals.len(), MAX_BEAMS - 1);
        assert_eq!(
            world.get::<RaftVisibility>(master),
            Some(&RaftVisibility::CentreBeamVisible)
        );
    }

    #[test]
    fn test_terrain_contact_breaks_beam_next_drain() {
        let mut world = World::new();
        spawn_test_raft(&mut world);
        let sensor = world.resource::<RaftStructureState>().entities.sensors[4];
        let rock = world.spawn(TerrainCollider).id();
        world.send_event(CollisionEvent::Started(
            sensor,
            rock,
            CollisionEventFlags::SENSOR,
        ));

        world.run_system_once(queue_structure_intents).unwrap();
        assert_eq!(world.resource::<RaftStructureState>().layout.len(), MAX_BEAMS);
        assert!(world.resource::<RaftStructureState>().has_pending());

        world.run_system_once(apply_structure_intents).unwrap();
        let state = world.resource::<RaftStructureState>();
        assert_eq!(state.layout.len(), MAX_BEAMS - 1);
        assert_eq!(state.debris().len(), 1);
        let debris = state.debris()[0].entity;
        assert!(world.get::<Debris>(debris).is_some());
    }

    #[test]
    fn test_liquid_contact_does_not_break() {
        let mut world = World::new();
        spawn_test_raft(&mut world);
        let sensor = world.resource::<RaftStructureState>().entities.sensors[0];
        // Water volumes carry no terrain marker.
        let water = world.spawn_empty().id();
        world.send_event(CollisionEvent::Started(
            sensor,
            water,
            CollisionEventFlags::SENSOR,
        ));
        world.run_system_once(queue_structure_intents).unwrap();
        assert!(!world.resource::<RaftStructureState>().has_pending());
    }

    #[test]
    fn test_collect_request_answered() {
        let mut world = World::new();
        spawn_test_raft(&mut world);
        let beam = world
            .spawn((FloatingBeam, Transform::from_xyz(3.0, 6.0, 0.0)))
            .id();
        world.send_event(CollectBeamRequest {
            beam,
            local_offset_hint: None,
        });
        world.run_system_once(handle_collect_requests).unwrap();

        // Full hull refuses and keeps the beam alive.
        assert!(world.get_entity(beam).is_ok());
        let results: Vec<BeamCollectionResult> = world
            .resource_mut::<Events<BeamCollectionResult>>()
            .drain()
            .collect();
        assert_eq!(
            results,
            vec![BeamCollectionResult {
                beam,
                accepted: false
            }]
        );
    }

    #[test]
    fn test_master_shoves_drain_every_shove() {
        let mut world = World::new();
        world.init_resource::<Events<RaftShove>>();
        let master = world.spawn(RaftMaster).id();
        let log = world.spawn_empty().id();
        for body in [master, log, master] {
            world.send_event(RaftShove {
                body,
                point: Vec3::ZERO,
                impulse: Vec3::X,
            });
        }

        let (taken, drained) = world
            .run_system_once(move |mut reader: EventReader<RaftShove>| {
                let taken = master_shoves(&mut reader, master);
                (taken, reader.is_empty())
            })
            .unwrap();
        assert_eq!(taken.len(), 2);
        assert!(taken.iter().all(|shove| shove.body == master));
        assert!(drained);
    }

    #[test]
    fn test_only_floating_beams_are_collected() {
        let mut world = World::new();
        spawn_test_raft(&mut world);
        world.resource_mut::<RaftStructureState>().layout.remove(0);
        let crate_box = world.spawn(Transform::from_xyz(3.0, 6.0, 0.0)).id();
        world.send_event(CollectBeamRequest {
            beam: crate_box,
            local_offset_hint: None,
        });
        world.run_system_once(handle_collect_requests).unwrap();

        assert!(world.get_entity(crate_box).is_ok());
        assert_eq!(world.resource::<RaftStructureState>().layout.len(), MAX_BEAMS - 1);
    }

    #[test]
    fn test_beam_loss_and_recovery() {
        let mut app = App::new();
        app.init_resource::<RaftStructureState>()
            .add_event::<CollisionEvent>()
            .add_event::<CollectBeamRequest>()
            .add_event::<BeamCollectionResult>()
            .add_systems(
                Update,
                (
                    queue_structure_intents,
                    apply_structure_intents,
                    handle_collect_requests,
                    tick_debris,
                )
                    .chain(),
            );
        app.world_mut()
            .run_system_once(
                |mut commands: Commands, mut state: ResMut<RaftStructureState>| {
                    spawn_raft(&mut commands, &mut state, &RaftParams::default(), Vec2::ZERO)
                },
            )
            .unwrap();
        let sensor = app.world().resource::<RaftStructureState>().entities.sensors[4];
        let rock = app.world_mut().spawn(TerrainCollider).id();
        app.world_mut().send_event(CollisionEvent::Started(
            sensor,
            rock,
            CollisionEventFlags::SENSOR,
        ));
        app.update();

        let state = app.world().resource::<RaftStructureState>();
        assert_eq!(state.layout.len(), MAX_BEAMS - 1);
        assert_eq!(state.debris().len(), 1);
        let debris = state.debris()[0].entity;
        assert!(app.world().get::<FloatingBeam>(debris).is_some());

        app.world_mut().send_event(CollectBeamRequest {
            beam: debris,
            local_offset_hint: Some(Vec3::new(-1.5, 1.0, 0.0)),
        });
        app.update();

        let state = app.world().resource::<RaftStructureState>();
        assert_eq!(state.layout.len(), MAX_BEAMS);
        assert!(state.layout.slots()[0] < -2.0);
        assert!(state.debris().is_empty());
        assert!(app.world().get_entity(debris).is_err());
        let results: Vec<BeamCollectionResult> = app
            .world_mut()
            .resource_mut::<Events<BeamCollectionResult>>()
            .drain()
            .collect();
        assert_eq!(
            results,
            vec![BeamCollectionResult {
                beam: debris,
                accepted: true
            }]
        );
    }
}
