/// rodio output backend
///
/// Each voice owns its own `Sink` on a shared output stream. Clips are played
/// straight from the shared decoded samples, so starting a voice never
/// decodes or copies audio data.
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use super::{PlayRequest, PlaybackBackend, VoiceHandle, VoiceSlot};
use crate::audio_system::clip::Clip;
use crate::audio_system::voice::EndSignal;
use crate::error::{EngineError, EngineResult};

/// Backend playing through the default output device
pub struct RodioBackend {
    stream_handle: OutputStreamHandle,
    // Dropping this lets the output thread release the stream
    _shutdown: Sender<()>,
}

impl RodioBackend {
    /// Open the default output device
    pub fn try_default() -> EngineResult<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        // `OutputStream` is not `Send`, so it lives on its own thread
        thread::Builder::new()
            .name("sfx-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    tracing::debug!("Output stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| EngineError::Backend(format!("Failed to spawn output thread: {}", e)))?;

        let stream_handle = ready_rx
            .recv()
            .map_err(|_| EngineError::Backend("Output thread exited".to_string()))?
            .map_err(|e| EngineError::Backend(format!("Failed to open output stream: {}", e)))?;

        tracing::info!("Audio output stream initialized");

        Ok(Self {
            stream_handle,
            _shutdown: shutdown_tx,
        })
    }
}

impl PlaybackBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn open_voice(&self, clip: &Arc<Clip>, slot: VoiceSlot) -> EngineResult<Box<dyn VoiceHandle>> {
        let sink = new_sink(&self.stream_handle)?;
        tracing::debug!("Opened {} for {}", slot, clip.source());

        Ok(Box::new(RodioVoice {
            clip: Arc::clone(clip),
            stream_handle: self.stream_handle.clone(),
            sink,
            volume: 1.0,
        }))
    }
}

fn new_sink(stream_handle: &OutputStreamHandle) -> EngineResult<Sink> {
    Sink::try_new(stream_handle)
        .map_err(|e| EngineError::Backend(format!("Failed to create audio sink: {}", e)))
}

struct RodioVoice {
    clip: Arc<Clip>,
    stream_handle: OutputStreamHandle,
    sink: Sink,
    volume: f32,
}

impl RodioVoice {
    /// Stop the current sink and swap in a fresh one.
    /// A stopped sink would block on the next append.
    fn reset_sink(&mut self) {
        self.sink.stop();
        match new_sink(&self.stream_handle) {
            Ok(sink) => self.sink = sink,
            Err(e) => tracing::warn!("Keeping stopped sink for {}: {}", self.clip.source(), e),
        }
    }
}

impl VoiceHandle for RodioVoice {
    fn start(&mut self, request: PlayRequest) {
        self.reset_sink();
        self.volume = request.volume;

        let source = ClipSource {
            clip: Arc::clone(&self.clip),
            position: 0,
            looping: request.looping,
            on_end: request.on_end,
        };

        self.sink.set_volume(self.volume);
        self.sink.append(source);
        self.sink.play();
    }

    fn stop(&mut self) {
        self.reset_sink();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }
}

/// Source reading from shared clip samples
struct ClipSource {
    clip: Arc<Clip>,
    position: usize,
    looping: bool,
    on_end: Option<EndSignal>,
}

impl Iterator for ClipSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        let samples = self.clip.samples();

        if self.position >= samples.len() {
            if self.looping && !samples.is_empty() {
                self.position = 0;
            } else {
                // Runs on the audio thread: only an atomic swap and a channel send
                if let Some(signal) = self.on_end.take() {
                    signal.fire();
                }
                return None;
            }
        }

        let sample = samples[self.position];
        self.position += 1;
        Some(sample)
    }
}

impl Source for ClipSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.clip.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.clip.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        if self.looping {
            None
        } else {
            Some(self.clip.duration())
        }
    }
}
