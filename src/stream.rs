//! Async delivery of extraction events.
//!
//! [`ExtractionStream`] runs the pipeline on a Tokio blocking thread and
//! yields its [`ExtractionEvent`]s as a [`tokio_stream::Stream`]. Decoding
//! and scoring are CPU-heavy, so they stay off the runtime's cooperative
//! workers and results come back through a bounded channel.
//!
//! This module is available when the `async` feature is enabled.
//!
//! # Example
//!
//! ```no_run
//! use tokio_stream::StreamExt;
//!
//! use sceneshot::{ExtractionConfig, ExtractionEvent, extraction_stream};
//!
//! # async fn example() {
//! let mut events = extraction_stream("input.mp4", ExtractionConfig::new());
//! while let Some(event) = events.next().await {
//!     if let ExtractionEvent::Completed { stats, .. } = event {
//!         println!("{stats}");
//!     }
//! }
//! # }
//! ```

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_stream::Stream;

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::pipeline::{self, ExtractionOutcome, KeyframeExtractor};
use crate::progress::{
    CancellationToken, ExtractionEvent, KeyframeInfo, ProgressCallback, ProgressInfo,
};
use crate::source::FrameSource;
use crate::worker;
use crate::writer::KeyframeWriter;

/// Bounded-channel capacity between the blocking thread and the stream.
const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// A stream of events from an extraction running on a blocking thread.
///
/// The last item is always the run's terminal event. Dropping the stream
/// closes the channel, which cancels the run at the next frame boundary.
pub struct ExtractionStream {
    receiver: Receiver<ExtractionEvent>,
    cancellation: CancellationToken,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl ExtractionStream {
    /// Ask the run to stop at the next frame boundary.
    ///
    /// The stream still yields an [`ExtractionEvent::Cancelled`] afterwards.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

impl Stream for ExtractionStream {
    type Item = ExtractionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Forwards notifications into the bounded channel, cancelling the run if
/// the stream has been dropped.
struct StreamReporter {
    sender: Sender<ExtractionEvent>,
    cancellation: CancellationToken,
}

impl StreamReporter {
    fn send(&self, event: ExtractionEvent) {
        if self.sender.blocking_send(event).is_err() {
            self.cancellation.cancel();
        }
    }
}

impl ProgressCallback for StreamReporter {
    fn on_progress(&self, info: &ProgressInfo) {
        self.send(ExtractionEvent::Progress(info.clone()));
    }

    fn on_keyframe(&self, info: &KeyframeInfo) {
        self.send(ExtractionEvent::KeyframeSaved(info.clone()));
    }
}

/// Extract keyframes from the video at `path` as a stream of events.
///
/// Must be called from within a Tokio runtime.
pub fn extraction_stream<P: Into<PathBuf>>(path: P, config: ExtractionConfig) -> ExtractionStream {
    let path = path.into();
    spawn_stream(move |reporter, token| {
        pipeline::extract_keyframes_with(&path, &config, reporter, Some(token))
    })
}

/// Run the pipeline over `source` as a stream of events.
///
/// Must be called from within a Tokio runtime.
pub fn extraction_stream_from<S: FrameSource + Send + 'static>(
    mut source: S,
    writer: KeyframeWriter,
    config: ExtractionConfig,
) -> ExtractionStream {
    spawn_stream(move |reporter, token| {
        KeyframeExtractor::new(config)
            .with_cancellation(token)
            .run(&mut source, &writer, reporter)
    })
}

fn spawn_stream<F>(job: F) -> ExtractionStream
where
    F: FnOnce(&dyn ProgressCallback, CancellationToken) -> Result<ExtractionOutcome, ExtractionError>
        + Send
        + 'static,
{
    let (sender, receiver) = tokio::sync::mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let cancellation = CancellationToken::new();
    let token = cancellation.clone();

    let handle = tokio::task::spawn_blocking(move || {
        let reporter = StreamReporter {
            sender: sender.clone(),
            cancellation: token.clone(),
        };
        let result = job(&reporter, token);
        // The receiver may have been dropped.
        let _ = sender.blocking_send(worker::terminal_event(result));
    });

    ExtractionStream {
        receiver,
        cancellation,
        handle,
    }
}
