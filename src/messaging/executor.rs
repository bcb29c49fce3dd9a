/// Command executor
///
/// Runs commands against the engine on a pool of worker threads and answers
/// each one through its [`Responder`].

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::commands::{Command, CommandResult};
use crate::engine::Engine;
use crate::error::EngineError;

/// Reply target for one request.
///
/// For `addCompleteListener` the responder is kept and answers once per
/// completed playback instead.
#[derive(Clone)]
pub struct Responder {
    reply: Arc<dyn Fn(CommandResult) + Send + Sync>,
}

impl Responder {
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(CommandResult) + Send + Sync + 'static,
    {
        Self {
            reply: Arc::new(reply),
        }
    }

    /// Responder backed by a channel
    pub fn channel() -> (Self, Receiver<CommandResult>) {
        let (tx, rx) = unbounded();
        let responder = Self::new(move |result| {
            // Receiver gone means nobody is waiting for the answer
            let _ = tx.send(result);
        });
        (responder, rx)
    }

    pub fn send(&self, result: CommandResult) {
        (self.reply)(result)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder").finish_non_exhaustive()
    }
}

struct Job {
    command: Command,
    responder: Responder,
}

/// Command executor that processes commands on worker threads
pub struct CommandExecutor {
    engine: Arc<Engine>,
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl CommandExecutor {
    /// Create an executor with the engine's configured worker count
    pub fn new(engine: Arc<Engine>) -> Self {
        let worker_threads = engine.config().worker_threads;
        Self::with_workers(engine, worker_threads)
    }

    pub fn with_workers(engine: Arc<Engine>, worker_threads: usize) -> Self {
        let (tx, rx) = unbounded::<Job>();

        let workers = (0..worker_threads.max(1))
            .filter_map(|index| {
                let rx = rx.clone();
                let engine = Arc::clone(&engine);
                thread::Builder::new()
                    .name(format!("sfx-worker-{}", index))
                    .spawn(move || {
                        tracing::debug!("Command worker {} started", index);
                        while let Ok(job) = rx.recv() {
                            if let Some(result) = run(&engine, job.command, &job.responder) {
                                job.responder.send(result);
                            }
                        }
                        tracing::debug!("Command worker {} stopped", index);
                    })
                    .map_err(|e| tracing::error!("Failed to start command worker {}: {}", index, e))
                    .ok()
            })
            .collect();

        Self {
            engine,
            job_tx: Some(tx),
            workers,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Parse and queue a request; the answer goes to `responder`.
    ///
    /// `setOptions` and `addCompleteListener` are handled on the calling
    /// thread.
    pub fn submit(&self, action: &str, args: &Value, responder: Responder) {
        tracing::debug!("Plugin called: {}", action);

        let command = match Command::parse(action, args) {
            Ok(Some(command)) => command,
            Ok(None) => {
                tracing::warn!("Ignoring unknown action: {}", action);
                responder.send(CommandResult::success());
                return;
            }
            Err(e) => {
                responder.send(e.into());
                return;
            }
        };

        match command {
            Command::SetOptions { .. } | Command::AddCompleteListener { .. } => {
                if let Some(result) = run(&self.engine, command, &responder) {
                    responder.send(result);
                }
            }
            command => self.execute(command, responder),
        }
    }

    /// Queue a parsed command for a worker
    pub fn execute(&self, command: Command, responder: Responder) {
        let Some(tx) = &self.job_tx else {
            responder.send(shut_down());
            return;
        };

        if let Err(err) = tx.send(Job { command, responder }) {
            err.into_inner().responder.send(shut_down());
        }
    }

    /// Execute a command on the calling thread (blocking).
    ///
    /// Returns `None` for listener registration, which has no direct answer.
    pub fn execute_sync(&self, command: Command, responder: &Responder) -> Option<CommandResult> {
        run(&self.engine, command, responder)
    }

    /// Stop accepting commands and wait for queued ones to finish
    pub fn shutdown(&mut self) {
        if self.job_tx.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        tracing::info!("Command executor stopped");
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn shut_down() -> CommandResult {
    EngineError::Backend("command executor is shut down".to_string()).into()
}

fn run(engine: &Engine, command: Command, responder: &Responder) -> Option<CommandResult> {
    tracing::debug!("Executing command: {}", command.description());

    let result = match command {
        Command::SetOptions { options } => {
            engine.set_options(&options);
            Ok(())
        }
        Command::Preload {
            id,
            path,
            volume,
            voices,
        } => engine.preload(&id, &path, volume, voices),
        Command::Play { id } => engine.play(&id),
        Command::Loop { id } => engine.loop_asset(&id),
        Command::Stop { id } => engine.stop(&id),
        Command::Pause { id } => engine.pause(id.as_deref()).map(|_| ()),
        Command::Resume { id } => engine.resume(id.as_deref()),
        Command::Unload { id } => engine.unload(&id),
        Command::SetVolume { id, volume } => engine.set_volume(&id, volume),
        Command::AddCompleteListener { id } => {
            let listener = responder.clone();
            engine.add_completion_listener(&id, move |event| {
                listener.send(CommandResult::with_value(event.payload()));
            });
            return None;
        }
    };

    if let Err(e) = &result {
        tracing::debug!("Command failed: {}", e);
    }
    Some(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::ManualBackend;
    use serde_json::json;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    fn executor() -> CommandExecutor {
        let engine = Arc::new(Engine::new(Arc::new(ManualBackend::new())));
        CommandExecutor::with_workers(engine, 2)
    }

    #[test]
    fn test_command_executor_creation() {
        let executor = executor();
        assert_eq!(executor.workers.len(), 2);
        assert_eq!(executor.engine().asset_count(), 0);
    }

    #[test]
    fn test_command_executor_sync() {
        let executor = executor();
        let (responder, _rx) = Responder::channel();

        let result = executor
            .execute_sync(Command::Stop { id: "nope".to_string() }, &responder)
            .unwrap();
        assert_eq!(result.error_kind(), Some("NotFound"));
    }

    #[test]
    fn test_submit_replies_asynchronously() {
        let executor = executor();
        let (responder, rx) = Responder::channel();

        executor.submit("play", &json!(["missing"]), responder);

        let result = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(result.error_kind(), Some("NotFound"));
    }

    #[test]
    fn test_submit_invalid_and_unknown() {
        let executor = executor();

        let (responder, rx) = Responder::channel();
        executor.submit("stop", &json!([]), responder);
        assert_eq!(rx.recv_timeout(WAIT).unwrap().error_kind(), Some("InvalidArgument"));

        let (responder, rx) = Responder::channel();
        executor.submit("vibrate", &json!([]), responder);
        assert!(rx.recv_timeout(WAIT).unwrap().is_ok());
    }

    #[test]
    fn test_set_options_inline() {
        let executor = executor();
        let (responder, rx) = Responder::channel();

        executor.submit("setOptions", &json!([{ "fadeMusic": true }]), responder);

        // Answered before submit returns
        assert!(rx.try_recv().unwrap().is_ok());
        assert!(executor.engine().options().fade_music);
    }

    #[test]
    fn test_listener_registration_has_no_direct_reply() {
        let executor = executor();
        let (responder, rx) = Responder::channel();

        executor.submit("addCompleteListener", &json!(["a"]), responder);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_shutdown_rejects_new_commands() {
        let mut executor = executor();
        executor.shutdown();
        assert!(executor.workers.is_empty());

        let (responder, rx) = Responder::channel();
        executor.execute(Command::Resume { id: None }, responder);
        assert_eq!(rx.try_recv().unwrap().error_kind(), Some("Backend"));
    }
}
