//! `sfx-host`: drives the engine over a JSON-lines protocol.
//!
//! Each stdin line is a request `{"action": "...", "args": [...], "callbackId": ...}`.
//! Every answer is written to stdout as one JSON line echoing `callbackId`.
//! Completion listeners answer once per finished playback on the callback id
//! they were registered with.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use crossbeam_channel::{unbounded, Sender};
use serde::Deserialize;
use serde_json::Value;
use sysinfo::System;

use sfx_voices::audio_system::{ManualBackend, PlaybackBackend, RodioBackend};
use sfx_voices::error::AppResult;
use sfx_voices::messaging::{CommandExecutor, CommandResult, Responder};
use sfx_voices::{Engine, EngineConfig};

const LOG_TARGET_STARTUP: &str = "sfx_voices::startup";
const APP_DIR: &str = "sfx-voices";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    action: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    callback_id: Option<Value>,
}

/// Initialize tracing with file rotation
///
/// Logs go to `<config dir>/sfx-voices/logs/sfx-host.YYYY-MM-DD.log`.
/// Debug builds also log to stderr; stdout carries the protocol.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "sfx-host.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting sfx-host v{} on {} ({})",
        env!("CARGO_PKG_VERSION"),
        os_name,
        std::env::consts::ARCH
    );
}

fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json")))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

fn open_backend() -> Arc<dyn PlaybackBackend> {
    match RodioBackend::try_default() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!("No audio output available ({}), running headless", e);
            Arc::new(ManualBackend::new())
        }
    }
}

/// Wrap a result with the request's callback id
fn envelope(callback_id: Option<&Value>, result: &CommandResult) -> Value {
    let mut reply = serde_json::to_value(result).unwrap_or(Value::Null);
    if let (Some(id), Value::Object(map)) = (callback_id, &mut reply) {
        map.insert("callbackId".to_string(), id.clone());
    }
    reply
}

fn responder(out: &Sender<Value>, callback_id: Option<Value>) -> Responder {
    let out = out.clone();
    Responder::new(move |result| {
        let _ = out.send(envelope(callback_id.as_ref(), &result));
    })
}

fn spawn_writer() -> AppResult<(Sender<Value>, thread::JoinHandle<()>)> {
    let (tx, rx) = unbounded::<Value>();
    let handle = thread::Builder::new()
        .name("sfx-stdout".to_string())
        .spawn(move || {
            let stdout = io::stdout();
            for reply in rx {
                let mut out = stdout.lock();
                if writeln!(out, "{}", reply).and_then(|_| out.flush()).is_err() {
                    tracing::warn!("stdout closed, dropping replies");
                    break;
                }
            }
        })
        .context("Failed to start output writer")?;
    Ok((tx, handle))
}

fn main() -> AppResult<()> {
    initialize_tracing();
    log_runtime_environment();

    let path = config_path();
    let config = EngineConfig::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?;

    let engine = Arc::new(Engine::builder(open_backend()).with_config(config).build());
    let executor = CommandExecutor::new(Arc::clone(&engine));
    let (out, writer) = spawn_writer()?;

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let responder = responder(&out, request.callback_id);
                executor.submit(&request.action, &request.args, responder);
            }
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                let result = CommandResult::Error {
                    kind: "InvalidArgument".to_string(),
                    message: format!("Malformed request: {}", e),
                };
                let _ = out.send(envelope(None, &result));
            }
        }
    }

    tracing::info!("stdin closed, shutting down");
    drop(executor);
    drop(engine);
    drop(out);
    let _ = writer.join();
    Ok(())
}
