//! Session lifecycle management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Audio capture into the live buffer
//! - Periodic chunk scheduling and dispatch
//! - The stop-time drain pass over the unprocessed tail
//! - Session statistics and state transitions

mod config;
mod controller;
mod stats;

pub use config::SessionConfig;
pub use controller::{SessionController, StartError, StopError};
pub use stats::{SessionState, SessionStats};
