use bevy::prelude::*;
use bevy_log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::constants::{HALF_BLOCK, WATER_LEVEL};
use shared::drift::DriftParams;
use shared::physics::TerrainColliderBundle;
use shared::player::{IslandMask, TerrainQuery};

/// Rocks rise from this depth below the water level
const REEF_BASE_DEPTH: i32 = 2;
/// Rocks reach this height above the water level
const REEF_TOP_HEIGHT: i32 = 2;
const FIRST_REEF_DISTANCE: f32 = 25.0;
const REEF_SPACING: f32 = 30.0;
const MAX_LATERAL_JITTER: f32 = 4.0;

/// Round rock outcrop sticking out of the water.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reef {
    pub centre: Vec2,
    pub radius: i32,
}

impl Reef {
    /// Block columns covering the reef, relative to [`Reef::origin`].
    pub fn blocks(&self) -> Vec<IVec3> {
        let r = self.radius;
        let mut blocks = Vec::new();
        for x in -r..=r {
            for z in -r..=r {
                if x * x + z * z > r * r {
                    continue;
                }
                for y in 0..(REEF_BASE_DEPTH + REEF_TOP_HEIGHT) {
                    blocks.push(IVec3::new(x, y, z));
                }
            }
        }
        blocks
    }

    /// Corner of block `(0, 0, 0)`, placed so the column at the origin is centred on `centre`.
    pub fn origin(&self) -> Vec3 {
        Vec3::new(
            self.centre.x - HALF_BLOCK.x,
            WATER_LEVEL - REEF_BASE_DEPTH as f32,
            self.centre.y - HALF_BLOCK.z,
        )
    }

    fn contains(&self, x: f32, z: f32) -> bool {
        let r = self.radius as f32 + 0.5;
        Vec2::new(x, z).distance_squared(self.centre) <= r * r
    }
}

/// Reefs laid along the initial drift heading so the raft eventually hits them.
#[derive(Resource, Debug, Clone, Default)]
pub struct ReefField {
    pub reefs: Vec<Reef>,
}

impl ReefField {
    pub fn along_heading(heading: Vec2, count: usize, seed: u64) -> Self {
        let forward = heading.try_normalize().unwrap_or(Vec2::NEG_Y);
        let perp = Vec2::new(-forward.y, forward.x);
        let mut rng = StdRng::seed_from_u64(seed);
        let reefs = (0..count)
            .map(|i| {
                let along = FIRST_REEF_DISTANCE + i as f32 * REEF_SPACING;
                let lateral = rng.gen_range(-MAX_LATERAL_JITTER..=MAX_LATERAL_JITTER);
                Reef {
                    centre: forward * along + perp * lateral,
                    radius: rng.gen_range(1..=3),
                }
            })
            .collect();
        Self { reefs }
    }
}

impl IslandMask for ReefField {
    fn is_island_base(&self, x: f32, z: f32) -> bool {
        self.reefs.iter().any(|reef| reef.contains(x, z))
    }
}

pub struct ReefPlugin {
    pub count: usize,
    pub seed: u64,
}

impl Plugin for ReefPlugin {
    fn build(&self, app: &mut App) {
        let heading = app
            .world()
            .get_resource::<DriftParams>()
            .map(|params| params.initial_heading)
            .unwrap_or(Vec2::NEG_Y);
        let field = ReefField::along_heading(heading, self.count, self.seed);
        app.insert_resource(TerrainQuery(Box::new(field.clone())))
            .insert_resource(field)
            .add_systems(Startup, spawn_reefs);
    }
}

fn spawn_reefs(mut commands: Commands, field: Res<ReefField>) {
    for reef in &field.reefs {
        let bundle = TerrainColliderBundle::from_solid_blocks(reef.origin(), &reef.blocks());
        if let Some(bundle) = bundle {
            commands.spawn(bundle);
        }
    }
    info!("Spawned {} reefs", field.reefs.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reefs_lie_ahead() {
        let field = ReefField::along_heading(Vec2::NEG_Y, 3, 11);
        assert_eq!(field.reefs.len(), 3);
        for (i, reef) in field.reefs.iter().enumerate() {
            let along = -reef.centre.y;
            assert!((along - (FIRST_REEF_DISTANCE + i as f32 * REEF_SPACING)).abs() < 1e-3);
            assert!(reef.centre.x.abs() <= MAX_LATERAL_JITTER + 1e-3);
        }
    }

    #[test]
    fn test_island_mask_covers_reef() {
        let field = ReefField {
            reefs: vec![Reef {
                centre: Vec2::new(10.0, 10.0),
                radius: 2,
            }],
        };
        assert!(field.is_island_base(11.0, 10.5));
        assert!(!field.is_island_base(0.0, 0.0));
    }

    #[test]
    fn test_reef_blocks_form_disc() {
        let reef = Reef {
            centre: Vec2::ZERO,
            radius: 1,
        };
        let height = (REEF_BASE_DEPTH + REEF_TOP_HEIGHT) as usize;
        assert_eq!(reef.blocks().len(), 5 * height);
    }

    #[test]
    fn test_reef_columns_line_up_with_island_mask() {
        let reef = Reef {
            centre: Vec2::new(10.7, -3.2),
            radius: 2,
        };
        let field = ReefField { reefs: vec![reef] };
        let origin = reef.origin();
        let mut sum = Vec2::ZERO;
        let blocks = reef.blocks();
        for block in &blocks {
            let column = origin + block.as_vec3() + HALF_BLOCK;
            assert!(field.is_island_base(column.x, column.z));
            sum += Vec2::new(column.x, column.z);
        }
        let mean = sum / blocks.len() as f32;
        assert!(mean.distance(reef.centre) < 1e-4);
    }
}
