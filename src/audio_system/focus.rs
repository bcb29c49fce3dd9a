/// Audio focus negotiation
///
/// The engine asks for focus once when it starts and again on every play or
/// loop request. Failures are logged and never block playback. Focus changes
/// coming back from the platform are only logged.
use std::fmt;

use crate::error::EngineResult;

/// Focus change reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    LossTransient,
    Loss,
}

impl fmt::Display for FocusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusChange::Gain => write!(f, "gain"),
            FocusChange::LossTransient => write!(f, "transient loss"),
            FocusChange::Loss => write!(f, "loss"),
        }
    }
}

/// Platform audio focus primitive
pub trait AudioFocus: Send + Sync {
    fn acquire(&self) -> EngineResult<()>;

    fn release(&self) {}

    /// Hook for focus changes; playback is left untouched
    fn on_focus_change(&self, change: FocusChange) {
        tracing::debug!("Audio focus change: {}", change);
    }
}

/// Focus implementation for platforms without focus negotiation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFocus;

impl AudioFocus for NoFocus {
    fn acquire(&self) -> EngineResult<()> {
        tracing::trace!("Audio focus requested (no-op)");
        Ok(())
    }
}
