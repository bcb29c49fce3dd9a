/// Sound-effect engine
///
/// Owns the asset registry, the resume set and the completion notifier, and
/// exposes the operations hosts call by asset id.
///
/// Locking: the registry and resume set share one lock, held for the whole
/// of each compound operation. Each asset has its own lock. The registry lock
/// may be held while taking an asset lock, never the other way round.
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::audio_system::{
    resolve_path, Asset, AssetRegistry, AudioFocus, Clip, CompletionRoute, NoFocus,
    PlaybackBackend, ResumeSet, SharedAsset, VoiceState,
};
use crate::config::{EngineConfig, EngineOptions};
use crate::error::{EngineError, EngineResult};
use crate::messaging::{CompletionEvent, CompletionListener, CompletionNotifier};

/// Id reported when a blanket operation finds nothing to act on
const ALL_ASSETS: &str = "<all>";

#[derive(Default)]
struct EngineState {
    registry: AssetRegistry,
    resume: ResumeSet,
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    backend: Arc<dyn PlaybackBackend>,
    focus: Arc<dyn AudioFocus>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            backend,
            focus: Arc::new(NoFocus),
            config: EngineConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a platform audio focus implementation
    pub fn with_focus(mut self, focus: Arc<dyn AudioFocus>) -> Self {
        self.focus = focus;
        self
    }

    pub fn build(self) -> Engine {
        let engine = Engine {
            backend: self.backend,
            focus: self.focus,
            options: RwLock::new(self.config.initial_options()),
            config: self.config,
            state: Mutex::new(EngineState::default()),
            notifier: CompletionNotifier::new(),
        };

        tracing::info!("Sound engine ready on {} backend", engine.backend.name());
        engine.request_focus("init");
        engine
    }
}

/// Multi-voice sound-effect engine
pub struct Engine {
    backend: Arc<dyn PlaybackBackend>,
    focus: Arc<dyn AudioFocus>,
    config: EngineConfig,
    options: RwLock<EngineOptions>,
    state: Mutex<EngineState>,
    notifier: CompletionNotifier,
}

impl Engine {
    /// Create an engine with default configuration
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        EngineBuilder::new(backend).build()
    }

    pub fn builder(backend: Arc<dyn PlaybackBackend>) -> EngineBuilder {
        EngineBuilder::new(backend)
    }

    fn request_focus(&self, reason: &str) {
        match self.focus.acquire() {
            Ok(()) => tracing::trace!("[{}] audio focus granted", reason),
            Err(e) => tracing::warn!("[{}] audio focus request failed: {}", reason, e),
        }
    }

    fn lookup(&self, id: &str) -> EngineResult<SharedAsset> {
        self.state.lock().registry.lookup(id)
    }

    /// Decode a file and register it under `id`.
    ///
    /// `path` may carry a `file://` prefix. Missing volume and voice count
    /// fall back to the configured defaults.
    pub fn preload(
        &self,
        id: &str,
        path: &str,
        volume: Option<f32>,
        voices: Option<usize>,
    ) -> EngineResult<()> {
        // Cheap early rejection before decoding
        if self.contains(id) {
            return Err(EngineError::DuplicateId(id.to_string()));
        }

        let full_path = resolve_path(path);
        tracing::info!("preload - {}: {}", id, full_path.display());

        let clip = Clip::open(&full_path)?;
        self.register_clip(id, clip, volume, voices)
    }

    /// Register an already-encoded buffer under `id`
    pub fn preload_from_memory(
        &self,
        id: &str,
        label: &str,
        bytes: Vec<u8>,
        volume: Option<f32>,
        voices: Option<usize>,
    ) -> EngineResult<()> {
        if self.contains(id) {
            return Err(EngineError::DuplicateId(id.to_string()));
        }

        tracing::info!("preload - {}: {} ({} bytes)", id, label, bytes.len());
        let clip = Clip::from_bytes(label, bytes)?;
        self.register_clip(id, clip, volume, voices)
    }

    fn register_clip(
        &self,
        id: &str,
        clip: Arc<Clip>,
        volume: Option<f32>,
        voices: Option<usize>,
    ) -> EngineResult<()> {
        let asset = Asset::new(
            id,
            clip,
            voices.unwrap_or(self.config.default_voices),
            volume.unwrap_or(self.config.default_volume),
            Arc::clone(&self.backend),
        )?;

        // A concurrent preload may have won while we were decoding
        self.state.lock().registry.register(id, asset)?;
        Ok(())
    }

    /// Play the asset once on its next voice
    pub fn play(&self, id: &str) -> EngineResult<()> {
        self.request_focus("play");

        let asset = self.lookup(id)?;
        let route = CompletionRoute::new(id, self.notifier.sender());
        asset.lock().play(Some(route))?;
        Ok(())
    }

    /// Start the asset's dedicated loop voice
    #[doc(alias = "loop")]
    pub fn loop_asset(&self, id: &str) -> EngineResult<()> {
        self.request_focus("loop");

        let asset = self.lookup(id)?;
        asset.lock().start_loop()?;
        Ok(())
    }

    pub fn stop(&self, id: &str) -> EngineResult<()> {
        let asset = self.lookup(id)?;
        let mut asset = asset.lock();
        if !asset.is_loaded() {
            return Err(EngineError::NotFound(id.to_string()));
        }
        asset.stop();
        Ok(())
    }

    /// Pause one asset, or every asset when `id` is `None`.
    ///
    /// Assets that were playing are remembered for a blanket resume. Returns
    /// whether anything was playing.
    pub fn pause(&self, id: Option<&str>) -> EngineResult<bool> {
        let mut state = self.state.lock();
        let EngineState { registry, resume } = &mut *state;

        match id {
            Some(id) => {
                tracing::debug!("pause - {}", id);
                let asset = registry.lookup(id)?;
                let was_playing = asset.lock().pause();
                if was_playing {
                    resume.push(id, &asset);
                }
                Ok(was_playing)
            }
            None if !registry.is_empty() => {
                tracing::debug!("pause - all");
                let mut any_playing = false;
                for (id, asset) in registry.iter() {
                    if asset.lock().pause() {
                        resume.push(id, asset);
                        any_playing = true;
                    }
                }
                Ok(any_playing)
            }
            None => Err(EngineError::NotFound(ALL_ASSETS.to_string())),
        }
    }

    /// Resume one asset directly, or everything recorded by earlier pauses
    /// (oldest first) when `id` is `None`.
    pub fn resume(&self, id: Option<&str>) -> EngineResult<()> {
        let mut state = self.state.lock();

        match id {
            Some(id) => {
                tracing::debug!("resume - {}", id);
                let asset = state.registry.lookup(id)?;
                asset.lock().resume();
                Ok(())
            }
            None if !state.resume.is_empty() => {
                tracing::debug!("resume - all ({} queued)", state.resume.len());
                for (_, asset) in state.resume.drain() {
                    asset.lock().resume();
                }
                Ok(())
            }
            None => {
                tracing::debug!("resume - nothing to resume");
                Err(EngineError::NotFound(ALL_ASSETS.to_string()))
            }
        }
    }

    /// Stop and release an asset, freeing its id
    pub fn unload(&self, id: &str) -> EngineResult<()> {
        let asset = {
            let mut state = self.state.lock();
            let asset = state.registry.remove(id)?;
            state.resume.remove(&asset);
            asset
        };

        // Waits for any in-flight operation on this asset
        asset.lock().unload();
        tracing::info!("unload - {}", id);
        Ok(())
    }

    pub fn set_volume(&self, id: &str, volume: f32) -> EngineResult<()> {
        tracing::debug!("setVolume - {}: {}", id, volume);
        let asset = self.lookup(id)?;
        asset.lock().set_volume(volume)?;
        Ok(())
    }

    /// Merge recognized option keys; anything else is ignored
    pub fn set_options(&self, options: &Value) {
        let mut current = self.options.write();
        current.merge(options);
        tracing::debug!("Options now {:?}", *current);
    }

    pub fn options(&self) -> EngineOptions {
        *self.options.read()
    }

    /// Register the completion callback for an id, replacing any previous
    /// one. The asset does not need to exist yet.
    pub fn add_completion_listener<F>(&self, id: &str, listener: F)
    where
        F: Fn(&CompletionEvent) + Send + Sync + 'static,
    {
        let listener: CompletionListener = Arc::new(listener);
        self.notifier.register(id, listener);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().registry.contains(id)
    }

    /// Get number of loaded assets
    pub fn asset_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Ids waiting for a blanket resume, oldest first
    pub fn resume_queue(&self) -> Vec<String> {
        self.state.lock().resume.ids()
    }

    pub fn asset_state(&self, id: &str) -> EngineResult<VoiceState> {
        let asset = self.lookup(id)?;
        let state = asset.lock().state();
        Ok(state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn PlaybackBackend> {
        &self.backend
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        for (_, asset) in state.registry.iter() {
            asset.lock().unload();
        }
        state.resume.drain();
        drop(state);

        self.focus.release();
        tracing::debug!("Sound engine shut down");
    }
}
