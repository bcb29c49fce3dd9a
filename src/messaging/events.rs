/// Event types for the engine
///
/// Events represent things that have happened (past tense).
use serde::Serialize;
use serde_json::Value;

/// A non-looping playback reached its natural end
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEvent {
    pub id: String,
}

impl CompletionEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Payload delivered to listeners: `{"id": ...}`
    pub fn payload(&self) -> Value {
        serde_json::json!({ "id": self.id })
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        format!("Playback finished: {}", self.id)
    }
}
