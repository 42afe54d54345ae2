pub mod constants;
pub mod drift;
pub mod math;
pub mod physics;
pub mod player;
pub mod raft;
pub mod session;
pub mod sets;
pub mod telemetry;

pub use constants::*;
pub use session::{BubbleCenter, RaftSessionPlugin, RespawnReason, RespawnRequest};
pub use sets::{RaftTickSet, SimulationTick};
