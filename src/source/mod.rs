//! Source adapters
//!
//! A source produces immutable snapshots of its data on demand and may offer a
//! change stream of newer snapshots.
//!
//! # Contract
//!
//! - `read` returns a complete snapshot; a newer snapshot replaces the older
//!   one wholesale, there is no partial merge
//! - `watcher` returns `None` when the source does not support live updates
//! - `name` identifies the source for `backend=NAME` pinning

mod env;
mod errors;
mod file;
mod kv;
mod poll;

pub use env::EnvSource;
pub use errors::{SourceError, SourceResult};
pub use file::FileSource;
pub use kv::{KvPair, KvSource, KvStore, MemoryKvStore};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::codec::{Codec, Data, JsonCodec, RawValue};

/// Default polling period for watched sources
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Snapshots a change stream can hold before the producer waits
const CHANGE_BUFFER: usize = 1;

/// One immutable point-in-time read of a source
#[derive(Debug, Clone)]
pub struct Snapshot {
    data: Data,
    codec: Arc<dyn Codec>,
    source: String,
    timestamp: DateTime<Utc>,
}

impl Snapshot {
    /// Creates a snapshot stamped with the current time
    pub fn new(source: impl Into<String>, codec: Arc<dyn Codec>, data: Data) -> Self {
        Self {
            data,
            codec,
            source: source.into(),
            timestamp: Utc::now(),
        }
    }

    /// Replaces the timestamp, e.g. with a file's modification time
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns the flat key -> raw value mapping
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Returns the raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.data.get(key)
    }

    /// Returns the codec that interprets this snapshot's raw values
    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Returns the name of the source that produced this snapshot
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns when the data was produced
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Capability every source adapter implements
pub trait Source: Send + Sync + fmt::Debug {
    /// Identifier used for `backend=NAME` pinning
    fn name(&self) -> &str;

    /// Reads the current content
    fn read(&self) -> SourceResult<Snapshot>;

    /// Starts watching for changes. `None` means no live updates.
    fn watcher(&self) -> SourceResult<Option<ChangeStream>>;
}

/// Options shared by the built-in sources
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Source identifier, defaults to the adapter type name
    pub name: String,
    /// Codec for the source's raw values
    pub codec: Arc<dyn Codec>,
    /// Whether `watcher` should start a change stream
    pub watch: bool,
    /// Polling period for adapters that poll
    pub watch_interval: Duration,
}

impl SourceOptions {
    /// Default options for an adapter named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            codec: Arc::new(JsonCodec),
            watch: false,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

/// Generates the option builder methods for a source holding `options`
macro_rules! impl_source_options {
    ($source:ty) => {
        impl $source {
            /// Overrides the source name used for pinning
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.options.name = name.into();
                self
            }

            /// Sets the codec used to interpret the source's data
            pub fn with_codec(mut self, codec: std::sync::Arc<dyn $crate::codec::Codec>) -> Self {
                self.options.codec = codec;
                self
            }

            /// Enables or disables live updates
            pub fn with_watch(mut self, watch: bool) -> Self {
                self.options.watch = watch;
                self
            }

            /// Sets the polling period used while watching
            pub fn with_watch_interval(mut self, interval: std::time::Duration) -> Self {
                self.options.watch_interval = interval;
                self
            }

            /// Returns the source options
            pub fn options(&self) -> &$crate::source::SourceOptions {
                &self.options
            }
        }
    };
}
pub(crate) use impl_source_options;

/// Receiving half of a source's change notifications
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::Receiver<Snapshot>,
    stop: CancellationToken,
}

/// Producing half of a change stream, held by the adapter's watch task
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: mpsc::Sender<Snapshot>,
    stop: CancellationToken,
}

impl ChangeStream {
    /// Creates a connected sender/stream pair
    pub fn channel(capacity: usize) -> (ChangeSender, ChangeStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stop = CancellationToken::new();
        (
            ChangeSender {
                tx,
                stop: stop.clone(),
            },
            ChangeStream { rx, stop },
        )
    }

    pub(crate) fn default_channel() -> (ChangeSender, ChangeStream) {
        Self::channel(CHANGE_BUFFER)
    }

    /// Waits for the next snapshot. `None` once stopped or the producer is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            snapshot = self.rx.recv() => snapshot,
        }
    }

    /// Stops the stream and releases the producer. Idempotent.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Returns true once `stop` was called
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl ChangeSender {
    /// Delivers a snapshot, giving up if the stream is stopped first.
    ///
    /// Returns false when the stream is gone; the producer should exit.
    pub async fn send(&self, snapshot: Snapshot) -> bool {
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => false,
            sent = self.tx.send(snapshot) => sent.is_ok(),
        }
    }

    /// Resolves once the stream is stopped or dropped
    pub async fn stopped(&self) {
        tokio::select! {
            _ = self.stop.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }

    /// Returns true once the stream is stopped or dropped
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled() || self.tx.is_closed()
    }
}

/// Spawns `task` on the current tokio runtime
pub(crate) fn spawn_watch<F>(name: &str, task: F) -> SourceResult<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|_| SourceError::NoRuntime(name.to_string()))?;
    handle.spawn(task);
    Ok(())
}
