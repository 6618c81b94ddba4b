//! Progress reporting for downloads
//!
//! The library only emits events; rendering them (log lines, bars) is up to the caller.

/// Events emitted while datasets are downloaded
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Streaming of one archive started
    DownloadStarted {
        /// Dataset key
        dataset_key: String,
        /// Declared content length, if the server sent one
        total: Option<u64>,
    },
    /// One chunk was written to disk
    ChunkWritten {
        /// Dataset key
        dataset_key: String,
        /// Bytes written so far
        written: u64,
        /// Declared content length, if known
        total: Option<u64>,
    },
    /// The archive is complete on disk
    DownloadFinished {
        /// Dataset key
        dataset_key: String,
        /// Final size in bytes
        bytes: u64,
    },
    /// One record of the batch has been processed (whatever the outcome)
    DatasetCompleted {
        /// 1-based position in the batch
        index: usize,
        /// Batch size
        total: usize,
    },
}

/// Receiver of progress events
pub trait ProgressReporter: Send + Sync {
    /// Handle one event
    fn report(&self, _event: ProgressEvent) {}
}

/// Reporter that ignores every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}
