/// Single playback slot of an asset
///
/// Every start of a voice gets a new generation number. The backend is given
/// an [`EndSignal`] for that generation; the signal only counts if the voice
/// is still on the same generation when the clip ends, which is how stopped or
/// retriggered playbacks are kept from reporting completion.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use super::backend::{PlayRequest, VoiceHandle, VoiceSlot};
use crate::messaging::CompletionEvent;

/// No live playback
const IDLE_GENERATION: u64 = 0;

/// Playback state of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Playing,
    Paused,
}

impl VoiceState {
    pub fn description(&self) -> &'static str {
        match self {
            VoiceState::Idle => "Idle",
            VoiceState::Playing => "Playing",
            VoiceState::Paused => "Paused",
        }
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState::Idle
    }
}

/// Where completion of a playback is reported
#[derive(Debug, Clone)]
pub struct CompletionRoute {
    id: Arc<str>,
    sender: Sender<CompletionEvent>,
}

impl CompletionRoute {
    pub fn new(id: impl Into<Arc<str>>, sender: Sender<CompletionEvent>) -> Self {
        Self {
            id: id.into(),
            sender,
        }
    }
}

/// One-shot notification that a specific start of a voice reached its end
#[derive(Debug)]
pub struct EndSignal {
    live: Arc<AtomicU64>,
    generation: u64,
    route: CompletionRoute,
}

impl EndSignal {
    pub(crate) fn new(live: Arc<AtomicU64>, generation: u64, route: CompletionRoute) -> Self {
        Self {
            live,
            generation,
            route,
        }
    }

    /// Report natural completion.
    ///
    /// Never blocks. Returns false if the playback was stopped or retriggered
    /// in the meantime, in which case nothing is reported.
    pub fn fire(self) -> bool {
        if self
            .live
            .compare_exchange(
                self.generation,
                IDLE_GENERATION,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        // Receiver gone means the engine is shutting down
        let _ = self.route.sender.try_send(CompletionEvent::new(&*self.route.id));
        true
    }
}

/// A voice: backend handle plus the state the engine tracks for it
pub struct Voice {
    slot: VoiceSlot,
    handle: Box<dyn VoiceHandle>,
    state: VoiceState,
    looping: bool,
    last_generation: u64,
    live: Arc<AtomicU64>,
}

impl Voice {
    pub fn new(slot: VoiceSlot, handle: Box<dyn VoiceHandle>) -> Self {
        Self {
            slot,
            handle,
            state: VoiceState::Idle,
            looping: false,
            last_generation: IDLE_GENERATION,
            live: Arc::new(AtomicU64::new(IDLE_GENERATION)),
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Current state, accounting for a natural end reported by the backend
    pub fn state(&self) -> VoiceState {
        let live = self.live.load(Ordering::Acquire);
        if self.state != VoiceState::Idle && live != self.last_generation {
            VoiceState::Idle
        } else {
            self.state
        }
    }

    /// Repeat the clip on the next start
    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Start from the beginning; a voice that is busy is retriggered.
    ///
    /// Completion is only routed for non-looping starts.
    pub fn start(&mut self, volume: f32, completion: Option<CompletionRoute>) {
        self.last_generation += 1;
        // Publish the new generation before the backend can see the new
        // source, so a late signal from the previous start is discarded
        self.live.store(self.last_generation, Ordering::Release);

        let on_end = if self.looping {
            None
        } else {
            completion.map(|route| {
                EndSignal::new(Arc::clone(&self.live), self.last_generation, route)
            })
        };

        self.handle.start(PlayRequest {
            looping: self.looping,
            volume,
            on_end,
        });
        self.state = VoiceState::Playing;
        tracing::trace!("Started {} (generation {})", self.slot, self.last_generation);
    }

    pub fn stop(&mut self) {
        self.live.store(IDLE_GENERATION, Ordering::Release);
        if self.state != VoiceState::Idle {
            self.handle.stop();
        }
        self.state = VoiceState::Idle;
    }

    /// Pause if playing; returns whether the voice was playing
    pub fn pause(&mut self) -> bool {
        if self.state() != VoiceState::Playing {
            return false;
        }
        self.handle.pause();
        self.state = VoiceState::Paused;
        true
    }

    /// Resume if paused; otherwise a no-op
    pub fn resume(&mut self) {
        if self.state() != VoiceState::Paused {
            return;
        }
        self.handle.resume();
        self.state = VoiceState::Playing;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.handle.set_volume(volume);
    }
}
