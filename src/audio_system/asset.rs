/// Sound asset with its voice pool
///
/// Handles playback of a single decoded clip across a fixed pool of voices.
use std::sync::Arc;

use super::backend::{PlaybackBackend, VoiceSlot};
use super::clip::Clip;
use super::voice::{CompletionRoute, Voice, VoiceState};
use crate::error::{EngineError, EngineResult};

/// Upper bound on the voice pool of a single asset
pub const MAX_VOICES: usize = 32;

/// Registered sound resource
pub struct Asset {
    id: String,
    source: String,
    clip: Option<Arc<Clip>>,
    volume: f32,
    voices: Vec<Voice>,
    next_voice: usize,
    loop_voice: Option<Voice>,
    backend: Arc<dyn PlaybackBackend>,
}

impl Asset {
    /// Create an asset with `voice_count` voices sharing `clip`.
    ///
    /// The count is clamped to `1..=MAX_VOICES`.
    pub fn new(
        id: impl Into<String>,
        clip: Arc<Clip>,
        voice_count: usize,
        volume: f32,
        backend: Arc<dyn PlaybackBackend>,
    ) -> EngineResult<Self> {
        let id = id.into();
        let voice_count = voice_count.clamp(1, MAX_VOICES);
        let volume = volume.clamp(0.0, 1.0);

        let voices = (0..voice_count)
            .map(|index| {
                let slot = VoiceSlot::Pool(index);
                let mut voice = Voice::new(slot, backend.open_voice(&clip, slot)?);
                voice.set_volume(volume);
                Ok(voice)
            })
            .collect::<EngineResult<Vec<_>>>()?;

        tracing::debug!(
            "Created asset {} with {} voice(s) on {} backend, volume={}",
            id,
            voice_count,
            backend.name(),
            volume
        );

        Ok(Self {
            id,
            source: clip.source().to_string(),
            clip: Some(clip),
            volume,
            voices,
            next_voice: 0,
            loop_voice: None,
            backend,
        })
    }

    fn ensure_loaded(&self) -> EngineResult<()> {
        if self.clip.is_none() {
            return Err(EngineError::NotFound(self.id.clone()));
        }
        Ok(())
    }

    /// Play on the next voice in round-robin order, retriggering it if busy.
    ///
    /// Returns the index of the voice used.
    pub fn play(&mut self, completion: Option<CompletionRoute>) -> EngineResult<usize> {
        self.ensure_loaded()?;

        let index = self.next_voice;
        self.voices[index].start(self.volume, completion);
        self.next_voice = (index + 1) % self.voices.len();

        tracing::debug!("Playing {} on voice {}", self.id, index);
        Ok(index)
    }

    /// Start the dedicated loop voice, allocating it on first use.
    ///
    /// Does nothing if the loop voice is playing or paused; a paused loop
    /// is picked up again by `resume`.
    pub fn start_loop(&mut self) -> EngineResult<()> {
        self.ensure_loaded()?;

        if let Some(voice) = &self.loop_voice {
            if voice.state() != VoiceState::Idle {
                tracing::debug!(
                    "{} is already looping ({})",
                    self.id,
                    voice.state().description()
                );
                return Ok(());
            }
        }

        let voice = match self.loop_voice.take() {
            Some(voice) => voice,
            None => self.open_loop_voice()?,
        };
        let voice = self.loop_voice.insert(voice);
        voice.set_loop(true);
        voice.start(self.volume, None);

        tracing::debug!("Looping {}", self.id);
        Ok(())
    }

    fn open_loop_voice(&self) -> EngineResult<Voice> {
        let clip = self
            .clip
            .as_ref()
            .ok_or_else(|| EngineError::NotFound(self.id.clone()))?;
        let handle = self.backend.open_voice(clip, VoiceSlot::Loop)?;
        Ok(Voice::new(VoiceSlot::Loop, handle))
    }

    /// Stop every voice and drop the loop designation
    pub fn stop(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
        if let Some(voice) = &mut self.loop_voice {
            voice.stop();
            voice.set_loop(false);
        }
        tracing::debug!("Stopped {}", self.id);
    }

    /// Pause every playing voice; returns whether anything was playing
    pub fn pause(&mut self) -> bool {
        let mut was_playing = false;
        for voice in self.voices.iter_mut().chain(self.loop_voice.iter_mut()) {
            was_playing |= voice.pause();
        }
        was_playing
    }

    /// Resume every paused voice
    pub fn resume(&mut self) {
        for voice in self.voices.iter_mut().chain(self.loop_voice.iter_mut()) {
            voice.resume();
        }
    }

    /// Set volume (0.0-1.0) for every voice, now and for later starts
    pub fn set_volume(&mut self, volume: f32) -> EngineResult<()> {
        self.ensure_loaded()?;

        self.volume = volume.clamp(0.0, 1.0);
        for voice in self.voices.iter_mut().chain(self.loop_voice.iter_mut()) {
            voice.set_volume(self.volume);
        }
        Ok(())
    }

    /// Stop playback and release voices and decoded data
    pub fn unload(&mut self) {
        self.stop();
        self.voices.clear();
        self.loop_voice = None;
        self.clip = None;
        tracing::debug!("Released {}", self.id);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn next_voice_index(&self) -> usize {
        self.next_voice
    }

    pub fn is_looping(&self) -> bool {
        self.loop_voice
            .as_ref()
            .is_some_and(|v| v.is_looping() && v.state() != VoiceState::Idle)
    }

    pub fn is_loaded(&self) -> bool {
        self.clip.is_some()
    }

    /// Playing if any voice plays, else Paused if any is paused, else Idle
    pub fn state(&self) -> VoiceState {
        let mut state = VoiceState::Idle;
        for voice in self.voices.iter().chain(self.loop_voice.iter()) {
            match voice.state() {
                VoiceState::Playing => return VoiceState::Playing,
                VoiceState::Paused => state = VoiceState::Paused,
                VoiceState::Idle => {}
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::{ManualBackend, ManualStatus};
    use crate::messaging::CompletionEvent;
    use crossbeam_channel::unbounded;

    fn asset(backend: &ManualBackend, label: &str, voices: usize) -> Asset {
        let clip = Clip::from_samples(label, 1, 8_000, vec![0; 32]);
        Asset::new(label, clip, voices, 0.8, Arc::new(backend.clone())).unwrap()
    }

    #[test]
    fn test_asset_creation() {
        let backend = ManualBackend::new();
        let asset = asset(&backend, "shot", 3);

        assert_eq!(asset.id(), "shot");
        assert_eq!(asset.voice_count(), 3);
        assert_eq!(asset.volume(), 0.8);
        assert_eq!(asset.state(), VoiceState::Idle);
        assert_eq!(backend.opened("shot"), 3);
    }

    #[test]
    fn test_zero_voices_means_one() {
        let backend = ManualBackend::new();
        let asset = asset(&backend, "one", 0);
        assert_eq!(asset.voice_count(), 1);
    }

    #[test]
    fn test_voice_count_is_capped() {
        let backend = ManualBackend::new();
        let asset = asset(&backend, "many", usize::MAX);
        assert_eq!(asset.voice_count(), MAX_VOICES);
        assert_eq!(backend.opened("many"), MAX_VOICES);
    }

    #[test]
    fn test_round_robin_retriggers() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "rr", 2);

        assert_eq!(asset.play(None).unwrap(), 0);
        assert_eq!(asset.play(None).unwrap(), 1);
        assert_eq!(asset.play(None).unwrap(), 0);
        assert_eq!(asset.next_voice_index(), 1);

        let slots: Vec<_> = backend.starts("rr").iter().map(|s| s.slot).collect();
        assert_eq!(
            slots,
            vec![VoiceSlot::Pool(0), VoiceSlot::Pool(1), VoiceSlot::Pool(0)]
        );
    }

    #[test]
    fn test_retriggered_voice_reports_only_latest_start() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "gun", 1);
        let (tx, rx) = unbounded();

        asset.play(Some(CompletionRoute::new("gun", tx.clone()))).unwrap();
        asset.play(Some(CompletionRoute::new("gun", tx))).unwrap();
        assert!(backend.finish("gun", VoiceSlot::Pool(0)));

        assert_eq!(rx.try_recv().unwrap(), CompletionEvent::new("gun"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_loop_uses_dedicated_voice() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "engine", 2);

        asset.start_loop().unwrap();
        asset.start_loop().unwrap();

        assert!(asset.is_looping());
        assert_eq!(asset.next_voice_index(), 0);
        assert_eq!(backend.opened("engine"), 3);
        assert_eq!(backend.starts("engine").len(), 1);
        assert_eq!(backend.status("engine", VoiceSlot::Loop), Some(ManualStatus::Playing));

        // Loop voice is reused after a stop
        asset.stop();
        assert!(!asset.is_looping());
        asset.start_loop().unwrap();
        assert_eq!(backend.opened("engine"), 3);
        assert!(backend.starts("engine").iter().all(|s| s.looping));
    }

    #[test]
    fn test_pause_and_resume() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "amb", 2);

        assert!(!asset.pause());

        asset.play(None).unwrap();
        asset.start_loop().unwrap();
        assert!(asset.pause());
        assert_eq!(asset.state(), VoiceState::Paused);
        assert_eq!(backend.status("amb", VoiceSlot::Loop), Some(ManualStatus::Paused));
        assert!(!asset.pause());

        asset.resume();
        assert_eq!(asset.state(), VoiceState::Playing);
        assert_eq!(backend.status("amb", VoiceSlot::Pool(0)), Some(ManualStatus::Playing));
        assert_eq!(backend.status("amb", VoiceSlot::Pool(1)), Some(ManualStatus::Idle));
    }

    #[test]
    fn test_volume_applies_to_all_voices() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "vol", 2);

        asset.set_volume(1.7).unwrap();
        assert_eq!(asset.volume(), 1.0); // Clamped

        asset.set_volume(0.3).unwrap();
        assert_eq!(backend.volume("vol", VoiceSlot::Pool(0)), Some(0.3));
        assert_eq!(backend.volume("vol", VoiceSlot::Pool(1)), Some(0.3));

        // Later starts pick up the asset volume too
        asset.start_loop().unwrap();
        assert_eq!(backend.volume("vol", VoiceSlot::Loop), Some(0.3));
    }

    #[test]
    fn test_unload_releases_voices() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "gone", 2);
        asset.play(None).unwrap();
        asset.start_loop().unwrap();

        asset.unload();

        assert!(!asset.is_loaded());
        assert_eq!(asset.voice_count(), 0);
        assert_eq!(backend.live_voices("gone"), 0);
        assert!(matches!(asset.play(None), Err(EngineError::NotFound(_))));
        assert!(matches!(asset.start_loop(), Err(EngineError::NotFound(_))));
        assert!(matches!(asset.set_volume(0.5), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_loop_while_paused_keeps_position() {
        let backend = ManualBackend::new();
        let mut asset = asset(&backend, "wind", 1);

        asset.start_loop().unwrap();
        assert!(asset.pause());
        asset.start_loop().unwrap();

        // Not restarted; resume picks it up
        assert_eq!(backend.starts("wind").len(), 1);
        assert_eq!(asset.state(), VoiceState::Paused);
        asset.resume();
        assert_eq!(backend.status("wind", VoiceSlot::Loop), Some(ManualStatus::Playing));
    }
}
