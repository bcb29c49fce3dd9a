/// Decoded clip data
///
/// A clip is decoded once at preload time and then shared read-only by every
/// voice of an asset.
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{EngineError, EngineResult};

const FILE_SCHEME: &str = "file://";

/// Strip a `file://` locator prefix, leaving a plain filesystem path
pub fn resolve_path(locator: &str) -> PathBuf {
    PathBuf::from(locator.strip_prefix(FILE_SCHEME).unwrap_or(locator))
}

/// Interleaved 16-bit PCM decoded from a single source
#[derive(Debug)]
pub struct Clip {
    source: String,
    channels: u16,
    sample_rate: u32,
    samples: Vec<i16>,
}

impl Clip {
    /// Decode a clip from a file on disk
    pub fn open(path: &Path) -> EngineResult<Arc<Self>> {
        let label = path.display().to_string();
        let file = File::open(path).map_err(|e| EngineError::decode(label.clone(), e))?;

        let extension = path.extension().and_then(|ext| ext.to_str());
        let clip = decode(label, Box::new(file), extension)?;

        tracing::info!(
            "Decoded {} ({} ch, {} Hz, {:.2}s)",
            path.display(),
            clip.channels,
            clip.sample_rate,
            clip.duration().as_secs_f32()
        );
        Ok(Arc::new(clip))
    }

    /// Decode a clip from an in-memory buffer
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> EngineResult<Arc<Self>> {
        let clip = decode(label.into(), Box::new(Cursor::new(bytes)), None)?;
        tracing::debug!("Decoded {} from memory", clip.source);
        Ok(Arc::new(clip))
    }

    /// Build a clip from raw interleaved samples
    pub fn from_samples(
        label: impl Into<String>,
        channels: u16,
        sample_rate: u32,
        samples: Vec<i16>,
    ) -> Arc<Self> {
        Arc::new(Self {
            source: label.into(),
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
            samples,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.frames() as u64 * 1_000_000_000 / self.sample_rate as u64)
    }
}

fn decode(
    label: String,
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
) -> EngineResult<Clip> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| EngineError::decode(label.clone(), e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::decode(label.clone(), "No supported audio tracks found"))?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| EngineError::decode(label.clone(), e))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            // Track list changed mid-stream; keep what was decoded so far
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(EngineError::decode(label, err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);

                let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(EngineError::decode(label, err)),
        }
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        return Err(EngineError::decode(label, "Unknown sample rate or channel layout"));
    };
    if samples.is_empty() {
        return Err(EngineError::decode(label, "Source contains no audio frames"));
    }

    Ok(Clip {
        source: label,
        channels: channels.max(1),
        sample_rate,
        samples,
    })
}
