pub mod autopilot;
pub mod config;
pub mod init;
pub mod reef;
pub mod shark;
