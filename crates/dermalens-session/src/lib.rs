//! dermalens-session — One live camera session: detection loop, countdown,
//! capture hand-off and deterministic teardown.

pub mod config;
pub mod engine;

pub use config::RuntimeConfig;
pub use engine::{spawn_session, spawn_session_with, Feedback, SessionError, SessionHandle};
