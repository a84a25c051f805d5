//! Change detection by polling a file
//!
//! Every tick the file's fingerprint (modification time, length, CRC-32 of the
//! contents) is compared with the previous one. Only on a change is the source
//! re-read and the new snapshot emitted. A failed re-read is logged and
//! skipped; nothing is emitted until the next change.
//!
//! Fingerprinting and re-reading block, so both run on the blocking pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{spawn_watch, ChangeStream, Snapshot, SourceError, SourceResult};
use crate::observability::Event;

/// Identity of a file's content at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
    checksum: u32,
}

impl Fingerprint {
    /// Fingerprints `path`. A missing file has no fingerprint.
    pub(crate) fn of(path: &Path) -> io::Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let modified = fs::metadata(path)?.modified().ok();
        Ok(Some(Self {
            modified,
            len: bytes.len() as u64,
            checksum: crc32fast::hash(&bytes),
        }))
    }
}

/// Starts a poller for `path` that emits `read()` whenever the file changes
pub(crate) fn watch_file<R>(
    name: &str,
    path: PathBuf,
    interval: Duration,
    read: R,
) -> SourceResult<ChangeStream>
where
    R: Fn() -> SourceResult<Snapshot> + Send + Sync + 'static,
{
    let mut last = Fingerprint::of(&path).map_err(|e| SourceError::io(&path, e))?;
    let read = Arc::new(read);
    let (tx, stream) = ChangeStream::default_channel();
    let source = name.to_string();

    spawn_watch(name, async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = tx.stopped() => break,
                _ = ticker.tick() => {}
            }

            let target = path.clone();
            let current = match tokio::task::spawn_blocking(move || Fingerprint::of(&target)).await {
                Ok(Ok(current)) => current,
                Ok(Err(e)) => {
                    warn!(event = %Event::WatchReadFailed, source = %source, error = %e, "fingerprint failed");
                    continue;
                }
                Err(e) => {
                    warn!(event = %Event::WatchReadFailed, source = %source, error = %e, "fingerprint task failed");
                    continue;
                }
            };
            if current == last {
                continue;
            }
            last = current;

            let reader = Arc::clone(&read);
            match tokio::task::spawn_blocking(move || reader()).await {
                Ok(Ok(snapshot)) => {
                    if !tx.send(snapshot).await {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    warn!(event = %Event::WatchReadFailed, source = %source, error = %e, "re-read skipped");
                }
                Err(e) => {
                    warn!(event = %Event::WatchReadFailed, source = %source, error = %e, "re-read task failed");
                }
            }
        }
        debug!(event = %Event::WatchStopped, source = %source, "poller exited");
    })?;

    Ok(stream)
}
