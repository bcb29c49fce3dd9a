use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::audio_system::MAX_VOICES;

/// Option key accepted by `setOptions`
pub const OPT_FADE_MUSIC: &str = "fadeMusic";

/// Runtime options changed through `setOptions`.
///
/// `fade_music` is stored and readable but has no effect on playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub fade_music: bool,
}

impl EngineOptions {
    /// Merge recognized keys from a JSON object, ignoring everything else
    pub fn merge(&mut self, options: &Value) {
        let Some(map) = options.as_object() else {
            return;
        };

        if let Some(fade) = map.get(OPT_FADE_MUSIC) {
            // Mirrors a lenient boolean read: anything that isn't `true` is false
            self.fade_music = fade.as_bool().unwrap_or(false);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial value of the `fadeMusic` option
    pub fade_music: bool,

    /// Volume used when a preload does not specify one (0.0-1.0)
    pub default_volume: f32,

    /// Voice count used when a preload does not specify one (1-`MAX_VOICES`)
    pub default_voices: usize,

    /// Number of command executor worker threads
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_music: false,
            default_volume: 1.0,
            default_voices: 1,
            worker_threads: 4,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    /// Falls back to defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        tracing::info!("Loaded config from: {}", path.display());
        Ok(config.normalized())
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        Ok(())
    }

    /// Options the engine starts with
    pub fn initial_options(&self) -> EngineOptions {
        EngineOptions {
            fade_music: self.fade_music,
        }
    }

    fn normalized(mut self) -> Self {
        self.default_volume = self.default_volume.clamp(0.0, 1.0);
        self.default_voices = self.default_voices.clamp(1, MAX_VOICES);
        self.worker_threads = self.worker_threads.max(1);
        self
    }
}
