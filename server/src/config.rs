use std::fs;
use std::path::Path;

use bevy::prelude::*;
use bevy_log::info;
use ron::de::from_str;
use serde::{Deserialize, Serialize};
use shared::drift::DriftParams;
use shared::player::CouplingParams;
use shared::raft::RaftParams;

/// Every tunable of a session, as stored in a RON tuning file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    pub raft: RaftParams,
    pub coupling: CouplingParams,
    pub drift: DriftParams,
}

impl SessionTuning {
    /// Insert the tuning resources. Must run before the session plugin is added.
    pub fn insert_into(self, app: &mut App) {
        app.insert_resource(self.raft)
            .insert_resource(self.coupling)
            .insert_resource(self.drift);
    }
}

pub fn load_tuning(path: &Path) -> Result<SessionTuning, Box<dyn std::error::Error>> {
    let contents: String = fs::read_to_string(path)?;
    let tuning: SessionTuning = from_str(&contents)?;
    info!("Loaded session tuning from {}", path.display());
    Ok(tuning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_tuning_keeps_defaults() {
        let tuning: SessionTuning =
            from_str("(raft: (mass: 320.0, debug: true), drift: (follow_channel: true))").unwrap();
        assert_eq!(tuning.raft.mass, 320.0);
        assert!(tuning.raft.debug);
        assert_eq!(
            tuning.raft.buoyancy_stiffness,
            RaftParams::default().buoyancy_stiffness
        );
        assert!(tuning.drift.follow_channel);
        assert_eq!(tuning.drift.steer_interval, 220);
        assert_eq!(tuning.coupling.player_weight, 85.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_tuning(Path::new("/nonexistent/tuning.ron")).is_err());
    }
}
