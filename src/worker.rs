//! Off-thread extraction.
//!
//! [`spawn_extraction`] runs the whole pipeline on a dedicated worker
//! thread and returns immediately with an [`ExtractionHandle`]. Everything
//! the run has to say (progress, saved keyframes, and one terminal message)
//! arrives through the handle as [`ExtractionEvent`]s, in order.
//!
//! # Example
//!
//! ```no_run
//! use sceneshot::{ExtractionConfig, ExtractionEvent, spawn_extraction};
//!
//! let handle = spawn_extraction("talk.mp4", ExtractionConfig::new())?;
//! for event in handle.events() {
//!     match event {
//!         ExtractionEvent::Progress(info) => {
//!             println!("{:.0}%", info.percentage.unwrap_or(0.0));
//!         }
//!         ExtractionEvent::KeyframeSaved(info) => println!("{}", info.path.display()),
//!         ExtractionEvent::Completed { stats, .. } => println!("{stats}"),
//!         ExtractionEvent::Cancelled { .. } => println!("cancelled"),
//!         ExtractionEvent::Failed(error) => eprintln!("{error}"),
//!     }
//! }
//! # Ok::<(), sceneshot::ExtractionError>(())
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::pipeline::{self, ExtractionOutcome, KeyframeExtractor, RunStatus};
use crate::progress::{CancellationToken, ChannelReporter, ExtractionEvent, ProgressCallback};
use crate::source::FrameSource;
use crate::writer::KeyframeWriter;

const WORKER_THREAD_NAME: &str = "keyframe-extraction";

/// Host-side handle to an extraction running on a worker thread.
///
/// Dropping the handle does not stop the worker; call
/// [`cancel`](ExtractionHandle::cancel) first if the result is no longer
/// wanted.
#[derive(Debug)]
pub struct ExtractionHandle {
    receiver: Receiver<ExtractionEvent>,
    cancellation: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl ExtractionHandle {
    /// Blocking iterator over the run's events.
    ///
    /// Ends after the terminal event, once the worker has exited.
    pub fn events(&self) -> impl Iterator<Item = ExtractionEvent> + '_ {
        self.receiver.iter()
    }

    /// The next event if one is already queued.
    pub fn try_next(&self) -> Option<ExtractionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ExtractionEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Ask the worker to stop at the next frame boundary.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// A clone of the run's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the run ends, discarding non-terminal events.
    ///
    /// # Errors
    ///
    /// The error the run failed with, or [`ExtractionError::Worker`] if the
    /// worker exited without reporting a result.
    pub fn wait(mut self) -> Result<ExtractionOutcome, ExtractionError> {
        let mut result = None;
        for event in self.receiver.iter() {
            if let Some(terminal) = outcome_from_event(event) {
                result = Some(terminal);
                break;
            }
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Extraction worker panicked");
            }
        }

        result.unwrap_or_else(|| {
            Err(ExtractionError::Worker(
                "worker exited without reporting a result".to_string(),
            ))
        })
    }
}

/// Extract keyframes from the video at `path` on a worker thread.
///
/// Open and configuration errors are reported through the handle as
/// [`ExtractionEvent::Failed`], not returned here.
///
/// # Errors
///
/// Returns [`ExtractionError::Worker`] if the thread cannot be spawned.
pub fn spawn_extraction<P: Into<PathBuf>>(
    path: P,
    config: ExtractionConfig,
) -> Result<ExtractionHandle, ExtractionError> {
    let path = path.into();
    spawn_worker(move |reporter, token| {
        pipeline::extract_keyframes_with(&path, &config, reporter, Some(token))
    })
}

/// Run the pipeline over an already-open `source` on a worker thread.
///
/// # Errors
///
/// Returns [`ExtractionError::Worker`] if the thread cannot be spawned.
pub fn spawn_extraction_from<S: FrameSource + Send + 'static>(
    mut source: S,
    writer: KeyframeWriter,
    config: ExtractionConfig,
) -> Result<ExtractionHandle, ExtractionError> {
    spawn_worker(move |reporter, token| {
        KeyframeExtractor::new(config)
            .with_cancellation(token)
            .run(&mut source, &writer, reporter)
    })
}

fn spawn_worker<F>(job: F) -> Result<ExtractionHandle, ExtractionError>
where
    F: FnOnce(&dyn ProgressCallback, CancellationToken) -> Result<ExtractionOutcome, ExtractionError>
        + Send
        + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let cancellation = CancellationToken::new();
    let token = cancellation.clone();

    let thread = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let reporter = ChannelReporter::new(sender.clone());
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(&reporter, token)))
                .unwrap_or_else(|payload| {
                    Err(ExtractionError::Worker(panic_message(payload.as_ref())))
                });
            // The host may have hung up already.
            let _ = sender.send(terminal_event(result));
        })
        .map_err(|error| ExtractionError::Worker(format!("failed to spawn worker: {error}")))?;

    Ok(ExtractionHandle {
        receiver,
        cancellation,
        thread: Some(thread),
    })
}

/// The terminal event describing a finished run.
pub(crate) fn terminal_event(result: Result<ExtractionOutcome, ExtractionError>) -> ExtractionEvent {
    match result {
        Ok(outcome) => match outcome.status {
            RunStatus::Completed => ExtractionEvent::Completed {
                stats: outcome.stats,
                output_dir: outcome.output_dir,
                stream_end: outcome.stream_end,
            },
            RunStatus::Cancelled => ExtractionEvent::Cancelled {
                stats: outcome.stats,
                output_dir: outcome.output_dir,
            },
        },
        Err(error) => {
            log::debug!("Extraction failed: {error}");
            ExtractionEvent::Failed(error)
        }
    }
}

/// Inverse of [`terminal_event`]; `None` for non-terminal events.
pub(crate) fn outcome_from_event(
    event: ExtractionEvent,
) -> Option<Result<ExtractionOutcome, ExtractionError>> {
    match event {
        ExtractionEvent::Completed {
            stats,
            output_dir,
            stream_end,
        } => Some(Ok(ExtractionOutcome {
            status: RunStatus::Completed,
            stats,
            output_dir,
            stream_end,
        })),
        ExtractionEvent::Cancelled { stats, output_dir } => Some(Ok(ExtractionOutcome {
            status: RunStatus::Cancelled,
            stats,
            output_dir,
            stream_end: None,
        })),
        ExtractionEvent::Failed(error) => Some(Err(error)),
        ExtractionEvent::Progress(_) | ExtractionEvent::KeyframeSaved(_) => None,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".to_string()
    }
}
