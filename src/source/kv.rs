//! Key-value store source
//!
//! Keys under a prefix are split on `/` into a nested tree, which is encoded
//! with the source's codec and decoded back into a snapshot. So the entries
//!
//! ```text
//! app/db/host = localhost
//! app/db/port = 5432
//! ```
//!
//! listed with strip prefix `app/` publish a single key `db` holding a
//! mapping with `host` and `port`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{
    impl_source_options, spawn_watch, ChangeStream, Snapshot, Source, SourceError, SourceOptions,
    SourceResult,
};
use crate::codec::{CodecError, RawValue};
use crate::observability::Event;

/// One entry of a key-value store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

/// Client capability of a remote key-value store
pub trait KvStore: Send + Sync + fmt::Debug {
    /// Lists every entry whose key starts with `prefix`
    fn list(&self, prefix: &str) -> SourceResult<Vec<KvPair>>;

    /// Returns a receiver that changes whenever entries under `prefix` may
    /// have changed, or `None` if the store cannot notify
    fn watch(&self, prefix: &str) -> Option<watch::Receiver<u64>>;
}

/// In-process key-value store
#[derive(Debug, Clone)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    /// Creates an empty store
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            revision: Arc::new(revision),
        }
    }

    /// Sets `key` to `value` and notifies watchers
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> SourceResult<()> {
        self.write()?.insert(key.into(), value.into());
        self.bump();
        Ok(())
    }

    /// Removes `key` and notifies watchers
    pub fn delete(&self, key: &str) -> SourceResult<()> {
        self.write()?.remove(key);
        self.bump();
        Ok(())
    }

    /// Returns the number of writes so far
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn write(&self) -> SourceResult<RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> SourceError {
    SourceError::Other("kv store lock poisoned".into())
}

impl KvStore for MemoryKvStore {
    fn list(&self, prefix: &str) -> SourceResult<Vec<KvPair>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KvPair {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn watch(&self, _prefix: &str) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}

/// Entries of a key-value store under one prefix
#[derive(Debug, Clone)]
pub struct KvSource {
    store: Arc<dyn KvStore>,
    prefix: String,
    strip_prefix: String,
    options: SourceOptions,
}

impl KvSource {
    /// Creates a source listing `prefix`, named "kv"
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            strip_prefix: String::new(),
            options: SourceOptions::new("kv"),
        }
    }

    /// Removes `prefix` from keys before splitting them into a tree
    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = prefix.into();
        self
    }

    fn snapshot(&self, pairs: Vec<KvPair>) -> SourceResult<Snapshot> {
        let strip = self.strip_prefix.trim_start_matches('/');
        let codec = self.options.codec.clone();
        let mut tree = Map::new();

        for pair in pairs {
            let path = pair.key.strip_prefix(strip).unwrap_or(&pair.key);
            let path = path.trim_start_matches('/');
            if path.is_empty() {
                continue;
            }
            let value = String::from_utf8(pair.value).map_err(|e| {
                let message = format!("value of '{}' is not UTF-8: {e}", pair.key);
                SourceError::codec(self.name(), CodecError::parse(codec.name(), message))
            })?;
            insert_path(&mut tree, path, Value::String(value));
        }

        let encoded = codec
            .encode(&Value::Object(tree))
            .map_err(|e| SourceError::codec(self.name(), e))?;
        let data = codec
            .decode_data(&RawValue::Bytes(encoded))
            .map_err(|e| SourceError::codec(self.name(), e))?;
        Ok(Snapshot::new(self.name(), codec, data))
    }
}

impl_source_options!(KvSource);

/// Inserts `value` at the `/`-separated `path`, creating intermediate
/// mappings. A scalar in the way is replaced by a mapping.
fn insert_path(tree: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut target = tree;
    for dir in segments {
        let entry = target
            .entry(dir.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        target = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    // a directory entry already holding children keeps them
    if target.get(leaf).map_or(false, Value::is_object) {
        return;
    }
    target.insert(leaf.to_string(), value);
}

impl Source for KvSource {
    fn name(&self) -> &str {
        &self.options.name
    }

    fn read(&self) -> SourceResult<Snapshot> {
        let pairs = self.store.list(&self.prefix)?;
        if pairs.is_empty() {
            return Err(SourceError::NotFound(self.prefix.clone()));
        }
        self.snapshot(pairs)
    }

    fn watcher(&self) -> SourceResult<Option<ChangeStream>> {
        if !self.options.watch {
            return Ok(None);
        }
        let Some(mut changes) = self.store.watch(&self.prefix) else {
            return Ok(None);
        };

        let (tx, stream) = ChangeStream::default_channel();
        let source = self.clone();
        spawn_watch(self.name(), async move {
            loop {
                tokio::select! {
                    _ = tx.stopped() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                match source.read() {
                    Ok(snapshot) => {
                        if !tx.send(snapshot).await {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(event = %Event::WatchReadFailed, source = %source.name(), error = %e, "re-read skipped");
                    }
                }
            }
            debug!(event = %Event::WatchStopped, source = %source.name(), "kv watch exited");
        })?;
        Ok(Some(stream))
    }
}
