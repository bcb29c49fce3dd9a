pub mod asset;
pub mod backend;
pub mod clip;
pub mod focus;
/// Audio system module
///
/// Provides the in-memory sound-effect layer:
/// - Clips decoded once and shared by every voice
/// - Per-asset voice pools so overlapping triggers don't cut each other
/// - A dedicated loop voice per asset
/// - Pluggable playback backends (rodio output, headless)
///
/// ## Architecture
///
/// ```text
/// AssetRegistry
///   ├── Asset ("shot")   ── Clip (shared samples)
///   │     ├── Voice 0   ─┐
///   │     ├── Voice 1   ─┤ Round-robin
///   │     ├── Voice 2   ─┘
///   │     └── Loop voice (lazy)
///   └── Asset ("music")
///         └── ...
///
/// Each Voice has:
///   └── Box<dyn VoiceHandle>  (from the PlaybackBackend)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use audio_system::{Asset, Clip, ManualBackend};
///
/// let backend = Arc::new(ManualBackend::new());
/// let clip = Clip::open(Path::new("shot.wav"))?;
///
/// let mut asset = Asset::new("shot", clip, 3, 0.8, backend)?;
/// asset.play(None)?;   // voice 0
/// asset.play(None)?;   // voice 1, voice 0 keeps playing
/// ```
pub mod registry;
pub mod voice;

// Re-export commonly used types
pub use asset::{Asset, MAX_VOICES};
pub use backend::{
    ManualBackend, ManualStatus, PlaybackBackend, RodioBackend, StartRecord, VoiceSlot,
};
pub use clip::{resolve_path, Clip};
pub use focus::{AudioFocus, FocusChange, NoFocus};
pub use registry::{AssetRegistry, ResumeSet, SharedAsset};
pub use voice::{CompletionRoute, EndSignal, Voice, VoiceState};
