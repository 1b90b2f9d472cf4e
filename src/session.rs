//! Host-facing session API
//!
//! A session runs the detection loop on its own worker thread. The host keeps
//! a [`SessionHandle`]: it flips the shared [`SessionControls`] flags and
//! reads [`StatusEvent`]s from the channel.

use crate::config::EngineConfig;
use crate::detection_loop::DetectionLoop;
use crate::perception::{Perception, ScreenPerception};
use crate::providers::Providers;
use crate::status::{SessionOutcome, StatusEvent, StatusSink};
use crate::Result;
use anyhow::Context;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Cooperative flags shared by the host and the worker
#[derive(Debug, Default)]
pub struct SessionControls {
    paused: AtomicBool,
    stopped: AtomicBool,
    refocus: AtomicBool,
}

impl SessionControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Stopping also lifts a pause so the worker can wind down
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn request_refocus(&self) {
        self.refocus.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Consume a pending refocus request
    pub fn take_refocus(&self) -> bool {
        self.refocus.swap(false, Ordering::SeqCst)
    }
}

/// A running session. Dropping the handle stops the worker without waiting.
pub struct SessionHandle {
    controls: Arc<SessionControls>,
    events: Receiver<StatusEvent>,
    worker: Option<JoinHandle<SessionOutcome>>,
}

impl SessionHandle {
    pub fn controls(&self) -> &Arc<SessionControls> {
        &self.controls
    }

    pub fn pause(&self) {
        self.controls.pause();
    }

    pub fn resume(&self) {
        self.controls.resume();
    }

    pub fn stop(&self) {
        self.controls.stop();
    }

    pub fn request_refocus(&self) {
        self.controls.request_refocus();
    }

    /// Status stream; ends with a single `Finished` event
    pub fn events(&self) -> &Receiver<StatusEvent> {
        &self.events
    }

    /// Wait for the worker to exit
    pub fn join(mut self) -> SessionOutcome {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .unwrap_or_else(|_| SessionOutcome::Failed("worker thread panicked".to_string())),
            None => SessionOutcome::Stopped,
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.controls.stop();
        }
    }
}

/// Validate `config` and start a session that perceives the real screen.
///
/// Templates are decoded on the worker; a decode failure ends the session
/// with `SessionOutcome::InitFailed`.
pub fn start_session(config: EngineConfig, providers: Providers) -> Result<SessionHandle> {
    config.validate()?;
    spawn(config, providers, |config, providers| {
        let perception = ScreenPerception::new(config.detection.clone(), providers.capture.clone())?;
        Ok(Box::new(perception) as Box<dyn Perception>)
    })
}

/// Start a session over a ready-made perception
pub fn start_session_with(
    config: EngineConfig,
    providers: Providers,
    perception: Box<dyn Perception>,
) -> Result<SessionHandle> {
    config.validate()?;
    spawn(config, providers, move |_, _| Ok(perception))
}

fn spawn<F>(config: EngineConfig, providers: Providers, build: F) -> Result<SessionHandle>
where
    F: FnOnce(&EngineConfig, &Providers) -> Result<Box<dyn Perception>> + Send + 'static,
{
    let config = Arc::new(config);
    let controls = Arc::new(SessionControls::new());
    let (tx, events) = crossbeam_channel::unbounded();

    let worker_controls = controls.clone();
    let worker = std::thread::Builder::new()
        .name("trailblazer-worker".to_string())
        .spawn(move || {
            let status = StatusSink::new(tx);
            let perception = match build(&config, &providers) {
                Ok(p) => p,
                Err(e) => {
                    let reason = format!("{e:#}");
                    status.warn(format!("Initialization failed: {reason}"));
                    let outcome = SessionOutcome::InitFailed(reason);
                    status.finish(outcome.clone());
                    return outcome;
                }
            };

            let arrange = config.window.arrange_on_start;
            let mut detection = DetectionLoop::new(config, perception, providers, worker_controls, status.clone());
            if arrange {
                detection.arrange_window();
            }
            let outcome = detection.run();
            status.finish(outcome.clone());
            outcome
        })
        .context("Failed to spawn worker thread")?;

    Ok(SessionHandle {
        controls,
        events,
        worker: Some(worker),
    })
}
