pub mod activation;
pub mod config;
pub mod daemon;
pub mod daemon_control;
pub mod error;
pub mod event;
pub mod gesture;
pub mod ipc;
pub mod platform;
pub mod service;

#[cfg(test)]
mod testing;

pub use activation::{ActivationController, ActivationState};
pub use daemon::Daemon;
pub use error::CoreError;
pub use event::{DaemonEvent, DisplayState, ProximityReading};
pub use gesture::{Gesture, GestureClassifier, GestureConfig, GestureSet, WakeSignal};
pub use service::{GestureService, ServiceStatus};
