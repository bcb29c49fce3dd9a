/// Completion notifier
///
/// Keeps one listener per asset id and delivers completion events to it from
/// a dedicated dispatcher thread, so the audio backend never runs listener
/// code or waits on engine locks.
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use super::events::CompletionEvent;

/// Callback invoked on natural completion of a playback
pub type CompletionListener = Arc<dyn Fn(&CompletionEvent) + Send + Sync>;

type ListenerMap = Arc<RwLock<HashMap<String, CompletionListener>>>;

/// Routes completion events to the listener registered for their id
pub struct CompletionNotifier {
    listeners: ListenerMap,
    sender: Sender<CompletionEvent>,
}

impl CompletionNotifier {
    /// Create a notifier and start its dispatcher thread.
    ///
    /// The thread exits once every sender (including those held by pending
    /// playbacks) is gone.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        let listeners: ListenerMap = Arc::new(RwLock::new(HashMap::new()));

        let dispatch_listeners = Arc::clone(&listeners);
        let spawned = thread::Builder::new()
            .name("sfx-completion".to_string())
            .spawn(move || dispatch(rx, dispatch_listeners));
        if let Err(e) = spawned {
            tracing::error!("Failed to start completion dispatcher: {}", e);
        }

        Self {
            listeners,
            sender: tx,
        }
    }

    /// Sender handed to voices for reporting completion
    pub fn sender(&self) -> Sender<CompletionEvent> {
        self.sender.clone()
    }

    /// Register a listener for an id, replacing any previous one
    pub fn register(&self, id: &str, listener: CompletionListener) {
        let replaced = self
            .listeners
            .write()
            .insert(id.to_string(), listener)
            .is_some();
        tracing::debug!(
            "Completion listener for {} {}",
            id,
            if replaced { "replaced" } else { "registered" }
        );
    }

    pub fn has_listener(&self, id: &str) -> bool {
        self.listeners.read().contains_key(id)
    }

    /// Get number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Default for CompletionNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(rx: Receiver<CompletionEvent>, listeners: ListenerMap) {
    tracing::debug!("Completion dispatcher started");

    while let Ok(event) = rx.recv() {
        // Clone out so the listener runs without holding the map lock
        let listener = listeners.read().get(&event.id).cloned();
        match listener {
            Some(listener) => {
                tracing::debug!("{}", event.description());
                listener(&event);
            }
            None => tracing::trace!("No listener for {}", event.id),
        }
    }

    tracing::debug!("Completion dispatcher stopped");
}
