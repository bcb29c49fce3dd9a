/// Command types for the engine
///
/// Commands represent requests to perform actions (imperative). Hosts send
/// an action name plus a JSON argument array; [`Command::parse`] turns that
/// into a typed command that the executor runs against the engine.
use serde::Serialize;
use serde_json::Value;

use crate::audio_system::MAX_VOICES;
use crate::error::{EngineError, EngineResult};

pub const SET_OPTIONS: &str = "setOptions";
pub const PRELOAD_SIMPLE: &str = "preloadSimple";
pub const PRELOAD_COMPLEX: &str = "preloadComplex";
pub const PLAY: &str = "play";
pub const STOP: &str = "stop";
pub const LOOP: &str = "loop";
pub const UNLOAD: &str = "unload";
pub const PAUSE: &str = "pause";
pub const RESUME: &str = "resume";
pub const ADD_COMPLETE_LISTENER: &str = "addCompleteListener";
pub const SET_VOLUME_FOR_COMPLEX_ASSET: &str = "setVolumeForComplexAsset";

/// Engine commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Merge engine options
    SetOptions { options: Value },

    /// Decode a file and register it
    Preload {
        id: String,
        path: String,
        volume: Option<f32>,
        voices: Option<usize>,
    },

    Play { id: String },

    Loop { id: String },

    Stop { id: String },

    /// Pause one asset, or all of them without an id
    Pause { id: Option<String> },

    /// Resume one asset, or the recorded ones without an id
    Resume { id: Option<String> },

    Unload { id: String },

    SetVolume { id: String, volume: f32 },

    /// Register the sender's reply channel as completion listener
    AddCompleteListener { id: String },
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResult {
    /// Command executed successfully, possibly with a payload
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },

    /// Command failed with an error
    Error { kind: String, message: String },
}

impl CommandResult {
    pub fn success() -> Self {
        CommandResult::Ok { value: None }
    }

    pub fn with_value(value: Value) -> Self {
        CommandResult::Ok { value: Some(value) }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CommandResult::Ok { .. })
    }

    /// Error kind name, if this is an error
    pub fn error_kind(&self) -> Option<&str> {
        match self {
            CommandResult::Error { kind, .. } => Some(kind.as_str()),
            CommandResult::Ok { .. } => None,
        }
    }
}

impl From<EngineError> for CommandResult {
    fn from(err: EngineError) -> Self {
        CommandResult::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<EngineResult<()>> for CommandResult {
    fn from(result: EngineResult<()>) -> Self {
        match result {
            Ok(()) => CommandResult::success(),
            Err(err) => err.into(),
        }
    }
}

impl Command {
    /// Parse an action and its arguments.
    ///
    /// Unknown actions yield `Ok(None)`; hosts acknowledge them without effect.
    pub fn parse(action: &str, args: &Value) -> EngineResult<Option<Self>> {
        let args = Args::new(action, args)?;

        let command = match action {
            SET_OPTIONS => Command::SetOptions {
                options: args.get(0).cloned().unwrap_or(Value::Null),
            },
            PRELOAD_SIMPLE | PRELOAD_COMPLEX => Command::Preload {
                id: args.string(0, "id")?,
                path: args.string(1, "path")?,
                volume: args.opt_f32(2, "volume")?,
                voices: args.opt_voices(3)?,
            },
            PLAY => Command::Play {
                id: args.string(0, "id")?,
            },
            LOOP => Command::Loop {
                id: args.string(0, "id")?,
            },
            STOP => Command::Stop {
                id: args.string(0, "id")?,
            },
            PAUSE => Command::Pause {
                id: args.opt_id(0)?,
            },
            RESUME => Command::Resume {
                id: args.opt_id(0)?,
            },
            UNLOAD => Command::Unload {
                id: args.string(0, "id")?,
            },
            SET_VOLUME_FOR_COMPLEX_ASSET => Command::SetVolume {
                id: args.string(0, "id")?,
                volume: args
                    .opt_f32(1, "volume")?
                    .ok_or_else(|| args.missing("volume"))?,
            },
            ADD_COMPLETE_LISTENER => Command::AddCompleteListener {
                id: args.string(0, "id")?,
            },
            _ => return Ok(None),
        };

        Ok(Some(command))
    }

    /// Action name this command was parsed from
    pub fn action(&self) -> &'static str {
        match self {
            Command::SetOptions { .. } => SET_OPTIONS,
            Command::Preload { .. } => PRELOAD_COMPLEX,
            Command::Play { .. } => PLAY,
            Command::Loop { .. } => LOOP,
            Command::Stop { .. } => STOP,
            Command::Pause { .. } => PAUSE,
            Command::Resume { .. } => RESUME,
            Command::Unload { .. } => UNLOAD,
            Command::SetVolume { .. } => SET_VOLUME_FOR_COMPLEX_ASSET,
            Command::AddCompleteListener { .. } => ADD_COMPLETE_LISTENER,
        }
    }

    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::SetOptions { options } => format!("Set options: {}", options),
            Command::Preload { id, path, .. } => format!("Preload {}: {}", id, path),
            Command::Play { id } => format!("Play {}", id),
            Command::Loop { id } => format!("Loop {}", id),
            Command::Stop { id } => format!("Stop {}", id),
            Command::Pause { id: Some(id) } => format!("Pause {}", id),
            Command::Pause { id: None } => "Pause all".to_string(),
            Command::Resume { id: Some(id) } => format!("Resume {}", id),
            Command::Resume { id: None } => "Resume all".to_string(),
            Command::Unload { id } => format!("Unload {}", id),
            Command::SetVolume { id, volume } => format!("Set volume of {} to {}", id, volume),
            Command::AddCompleteListener { id } => format!("Listen for completion of {}", id),
        }
    }
}

/// Positional argument accessor with boundary validation
struct Args<'a> {
    action: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(action: &'a str, args: &'a Value) -> EngineResult<Self> {
        let values: &[Value] = match args {
            Value::Array(values) => values.as_slice(),
            Value::Null => &[],
            other => {
                return Err(EngineError::InvalidArgument(format!(
                    "{}: expected an argument array, got {}",
                    action, other
                )))
            }
        };
        Ok(Self { action, values })
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    fn missing(&self, name: &str) -> EngineError {
        EngineError::InvalidArgument(format!("{}: missing {}", self.action, name))
    }

    fn invalid(&self, name: &str, value: &Value) -> EngineError {
        EngineError::InvalidArgument(format!("{}: invalid {}: {}", self.action, name, value))
    }

    fn string(&self, index: usize, name: &str) -> EngineResult<String> {
        match self.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.invalid(name, other)),
            None => Err(self.missing(name)),
        }
    }

    /// Optional asset id; an empty string means "no id"
    fn opt_id(&self, index: usize) -> EngineResult<Option<String>> {
        match self.get(index) {
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid("id", other)),
            None => Ok(None),
        }
    }

    fn opt_f32(&self, index: usize, name: &str) -> EngineResult<Option<f32>> {
        match self.get(index) {
            Some(value) => value
                .as_f64()
                .map(|v| Some(v as f32))
                .ok_or_else(|| self.invalid(name, value)),
            None => Ok(None),
        }
    }

    /// Optional voice count, limited to `MAX_VOICES`
    fn opt_voices(&self, index: usize) -> EngineResult<Option<usize>> {
        match self.get(index) {
            Some(value) => value
                .as_u64()
                .filter(|&v| v <= MAX_VOICES as u64)
                .map(|v| Some(v as usize))
                .ok_or_else(|| self.invalid("voices", value)),
            None => Ok(None),
        }
    }
}
