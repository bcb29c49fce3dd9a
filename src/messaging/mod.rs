/// Messaging module for the command boundary
///
/// This module separates what hosts ask for from what the engine reports:
/// - **Commands**: named requests with JSON arguments (imperative, targeted)
/// - **Events**: completion notifications (past tense, delivered per id)
///
/// ## Architecture
///
/// ```text
/// ┌─────────┐  action + args   ┌──────────┐   Engine calls   ┌──────────┐
/// │  Host   │ ───────────────> │ Executor │ ───────────────> │  Engine  │
/// │ bridge  │ <─────────────── │ (workers)│                  │          │
/// └─────────┘  CommandResult   └──────────┘                  └──────────┘
///      ▲                                                           │
///      │                CompletionEvent {id}                       │ voices end
///      └─────────────── CompletionNotifier (dispatcher) <──────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let engine = Arc::new(Engine::new(backend));
/// let executor = CommandExecutor::new(engine);
///
/// let (responder, replies) = Responder::channel();
/// executor.submit("preloadComplex", &json!(["shot", "file:///sfx/shot.wav", 1.0, 4]), responder);
///
/// let (listener, completions) = Responder::channel();
/// executor.submit("addCompleteListener", &json!(["shot"]), listener);
/// ```

pub mod commands;
pub mod events;
pub mod executor;
pub mod notifier;

// Re-export commonly used types
pub use commands::{Command, CommandResult};
pub use events::CompletionEvent;
pub use executor::{CommandExecutor, Responder};
pub use notifier::{CompletionListener, CompletionNotifier};
