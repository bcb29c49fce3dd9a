/// Headless backend
///
/// Voices produce no sound and never finish on their own: a clip ends only
/// when [`ManualBackend::finish`] is called for it. Useful for tests and for
/// hosts that run without an output device.
use std::sync::Arc;

use parking_lot::Mutex;

use super::{PlayRequest, PlaybackBackend, VoiceHandle, VoiceSlot};
use crate::audio_system::clip::Clip;
use crate::audio_system::voice::EndSignal;
use crate::error::EngineResult;

/// What a headless voice is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualStatus {
    Idle,
    Playing,
    Paused,
}

/// A voice start, as seen by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct StartRecord {
    pub source: String,
    pub slot: VoiceSlot,
    pub looping: bool,
    pub volume: f32,
}

struct ChannelState {
    source: String,
    slot: VoiceSlot,
    status: ManualStatus,
    looping: bool,
    volume: f32,
    released: bool,
    on_end: Option<EndSignal>,
}

#[derive(Default)]
struct Shared {
    channels: Vec<Arc<Mutex<ChannelState>>>,
    starts: Vec<StartRecord>,
}

/// Backend whose voices are driven explicitly
#[derive(Clone, Default)]
pub struct ManualBackend {
    shared: Arc<Mutex<Shared>>,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, source: &str, slot: VoiceSlot) -> Option<Arc<Mutex<ChannelState>>> {
        let shared = self.shared.lock();
        shared
            .channels
            .iter()
            .rev()
            .find(|c| {
                let c = c.lock();
                !c.released && c.source == source && c.slot == slot
            })
            .cloned()
    }

    /// Let the clip currently playing on a voice reach its natural end.
    ///
    /// Returns whether a completion was reported.
    pub fn finish(&self, source: &str, slot: VoiceSlot) -> bool {
        let Some(channel) = self.channel(source, slot) else {
            return false;
        };

        let signal = {
            let mut channel = channel.lock();
            if channel.status != ManualStatus::Playing || channel.looping {
                return false;
            }
            channel.status = ManualStatus::Idle;
            channel.on_end.take()
        };

        signal.map(EndSignal::fire).unwrap_or(false)
    }

    /// Status of a live voice
    pub fn status(&self, source: &str, slot: VoiceSlot) -> Option<ManualStatus> {
        self.channel(source, slot).map(|c| c.lock().status)
    }

    /// Volume last applied to a live voice
    pub fn volume(&self, source: &str, slot: VoiceSlot) -> Option<f32> {
        self.channel(source, slot).map(|c| c.lock().volume)
    }

    /// Every voice start for a source, in order
    pub fn starts(&self, source: &str) -> Vec<StartRecord> {
        self.shared
            .lock()
            .starts
            .iter()
            .filter(|s| s.source == source)
            .cloned()
            .collect()
    }

    /// Number of voices ever opened for a source
    pub fn opened(&self, source: &str) -> usize {
        self.shared
            .lock()
            .channels
            .iter()
            .filter(|c| c.lock().source == source)
            .count()
    }

    /// Number of voices for a source that have not been released
    pub fn live_voices(&self, source: &str) -> usize {
        self.shared
            .lock()
            .channels
            .iter()
            .filter(|c| {
                let c = c.lock();
                !c.released && c.source == source
            })
            .count()
    }
}

impl PlaybackBackend for ManualBackend {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn open_voice(&self, clip: &Arc<Clip>, slot: VoiceSlot) -> EngineResult<Box<dyn VoiceHandle>> {
        let channel = Arc::new(Mutex::new(ChannelState {
            source: clip.source().to_string(),
            slot,
            status: ManualStatus::Idle,
            looping: false,
            volume: 1.0,
            released: false,
            on_end: None,
        }));
        self.shared.lock().channels.push(Arc::clone(&channel));

        Ok(Box::new(ManualVoice {
            channel,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ManualVoice {
    channel: Arc<Mutex<ChannelState>>,
    shared: Arc<Mutex<Shared>>,
}

impl VoiceHandle for ManualVoice {
    fn start(&mut self, request: PlayRequest) {
        let record = {
            let mut channel = self.channel.lock();
            channel.status = ManualStatus::Playing;
            channel.looping = request.looping;
            channel.volume = request.volume;
            channel.on_end = request.on_end;

            StartRecord {
                source: channel.source.clone(),
                slot: channel.slot,
                looping: request.looping,
                volume: request.volume,
            }
        };
        self.shared.lock().starts.push(record);
    }

    fn stop(&mut self) {
        let mut channel = self.channel.lock();
        channel.status = ManualStatus::Idle;
        channel.on_end = None;
    }

    fn pause(&mut self) {
        let mut channel = self.channel.lock();
        if channel.status == ManualStatus::Playing {
            channel.status = ManualStatus::Paused;
        }
    }

    fn resume(&mut self) {
        let mut channel = self.channel.lock();
        if channel.status == ManualStatus::Paused {
            channel.status = ManualStatus::Playing;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.channel.lock().volume = volume;
    }
}

impl Drop for ManualVoice {
    fn drop(&mut self) {
        let mut channel = self.channel.lock();
        channel.released = true;
        channel.status = ManualStatus::Idle;
        channel.on_end = None;
    }
}
