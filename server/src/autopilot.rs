use bevy::prelude::*;
use bevy_log::debug;
use shared::player::{Player, PlayerControl};
use shared::sets::RaftTickSet;

/// One scripted input held for a number of ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutopilotStep {
    pub ticks: u32,
    pub movement: Vec2,
    pub jump: bool,
}

impl AutopilotStep {
    const fn new(ticks: u32, x: f32, z: f32, jump: bool) -> Self {
        Self {
            ticks,
            movement: Vec2::new(x, z),
            jump,
        }
    }
}

/// Looping input script standing in for a human player in headless sessions.
#[derive(Resource, Debug, Clone)]
pub struct Autopilot {
    steps: Vec<AutopilotStep>,
    cursor: usize,
    elapsed: u32,
}

impl Default for Autopilot {
    /// Settle, pace across the deck, hop near an edge and land back on it.
    fn default() -> Self {
        Self::new(vec![
            AutopilotStep::new(60, 0.0, 0.0, false),
            AutopilotStep::new(20, 1.0, 0.0, false),
            AutopilotStep::new(40, 0.0, 0.0, false),
            AutopilotStep::new(30, -1.0, 0.0, false),
            AutopilotStep::new(1, 0.0, 0.0, true),
            AutopilotStep::new(40, 0.0, 0.0, false),
            AutopilotStep::new(25, 1.0, 0.0, false),
            AutopilotStep::new(1, 0.0, 0.0, true),
            AutopilotStep::new(30, -0.5, 0.0, false),
        ])
    }
}

impl Autopilot {
    pub fn new(steps: Vec<AutopilotStep>) -> Self {
        Self {
            steps,
            cursor: 0,
            elapsed: 0,
        }
    }

    /// Input for the current tick, then advance the script.
    pub fn next_control(&mut self) -> PlayerControl {
        let Some(step) = self.steps.get(self.cursor).copied() else {
            return PlayerControl::default();
        };
        self.elapsed += 1;
        if self.elapsed >= step.ticks {
            self.elapsed = 0;
            self.cursor = (self.cursor + 1) % self.steps.len();
            debug!("Autopilot step {}", self.cursor);
        }
        PlayerControl {
            movement: step.movement,
            jump_pressed: step.jump,
        }
    }
}

pub struct AutopilotPlugin;

impl Plugin for AutopilotPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Autopilot>()
            .add_systems(FixedUpdate, drive_player.in_set(RaftTickSet::Drift));
    }
}

fn drive_player(
    mut autopilot: ResMut<Autopilot>,
    mut players: Query<&mut PlayerControl, With<Player>>,
) {
    let control = autopilot.next_control();
    for mut player in players.iter_mut() {
        *player = control;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_holds_and_loops() {
        let mut autopilot = Autopilot::new(vec![
            AutopilotStep::new(2, 1.0, 0.0, false),
            AutopilotStep::new(1, 0.0, 0.0, true),
        ]);
        let controls: Vec<PlayerControl> = (0..4).map(|_| autopilot.next_control()).collect();
        assert_eq!(controls[0].movement, Vec2::X);
        assert_eq!(controls[1].movement, Vec2::X);
        assert!(controls[2].jump_pressed);
        assert_eq!(controls[3].movement, Vec2::X);
    }

    #[test]
    fn test_empty_script_idles() {
        let mut autopilot = Autopilot::new(Vec::new());
        assert_eq!(autopilot.next_control(), PlayerControl::default());
    }
}
