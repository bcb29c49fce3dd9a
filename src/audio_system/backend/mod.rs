/// Playback backends
///
/// A backend turns a decoded [`Clip`] into voice handles that can actually be
/// heard. The engine only talks to the traits in this module:
///
/// ```text
/// PlaybackBackend
///   └── open_voice(clip, slot) -> Box<dyn VoiceHandle>
///         ├── start(PlayRequest)   // from the beginning, optionally looping
///         ├── pause() / resume()
///         ├── stop()
///         └── set_volume(f32)
/// ```
///
/// End-of-clip is reported by firing the [`EndSignal`] handed over in the
/// [`PlayRequest`]; backends may do that from their own audio thread.
use std::fmt;
use std::sync::Arc;

use super::clip::Clip;
use super::voice::EndSignal;
use crate::error::EngineResult;

pub mod device;
pub mod manual;

pub use self::manual::{ManualBackend, ManualStatus, StartRecord};
pub use self::device::RodioBackend;

/// Which voice of an asset a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceSlot {
    /// Round-robin pool voice at the given index
    Pool(usize),

    /// Dedicated loop voice
    Loop,
}

impl fmt::Display for VoiceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceSlot::Pool(index) => write!(f, "voice {}", index),
            VoiceSlot::Loop => write!(f, "loop voice"),
        }
    }
}

/// Parameters for a single start of a voice
pub struct PlayRequest {
    /// Repeat the clip until stopped
    pub looping: bool,

    /// Volume (0.0-1.0)
    pub volume: f32,

    /// Fired once if the clip reaches its end naturally
    pub on_end: Option<EndSignal>,
}

/// Low-level playback resource owned by a single voice
pub trait VoiceHandle: Send {
    /// Start the clip from the beginning, cutting whatever was playing
    fn start(&mut self, request: PlayRequest);

    fn stop(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn set_volume(&mut self, volume: f32);
}

/// Platform audio primitive that opens playable handles for decoded clips
pub trait PlaybackBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn open_voice(&self, clip: &Arc<Clip>, slot: VoiceSlot) -> EngineResult<Box<dyn VoiceHandle>>;
}
