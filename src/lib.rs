//! Multi-voice sound-effect engine.
//!
//! Assets are decoded once into memory and played on a small pool of voices
//! so rapid retriggers overlap instead of cutting each other off. Hosts drive
//! the engine either directly through [`Engine`] or by action name through
//! [`messaging::CommandExecutor`].

pub mod audio_system;
pub mod config;
pub mod engine;
pub mod error;
pub mod messaging;

pub use config::{EngineConfig, EngineOptions};
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, EngineResult, ErrorKind};
