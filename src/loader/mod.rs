//! Loader
//!
//! Owns the registered sources' snapshots and the bound targets, and
//! re-resolves every target whenever a watched source emits a new snapshot.
//!
//! # Lifecycle per source
//!
//! `read` -> snapshot stored -> watch task started (if the source offers a
//! change stream) -> every change replaces the snapshot and re-runs each
//! bound target's pass, in bind order.
//!
//! Cancelling the token given to [`Loader::new`], calling
//! [`Loader::shutdown`] or dropping the loader stops the loader task and every
//! watch task.

mod actor;
mod config;
mod errors;
mod target;

pub use actor::SourceInfo;
pub use config::LoaderConfig;
pub use errors::{LoaderError, LoaderResult};
pub use target::{ConfigCell, Revision, Target};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::actor::{Command, LoaderActor};
use crate::observability::Event;
use crate::source::{ChangeStream, Source};

/// Handle to a running loader
#[derive(Debug)]
pub struct Loader {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    config: LoaderConfig,
}

impl Loader {
    /// Starts a loader task on the current runtime. The loader stops when
    /// `cancel` is cancelled.
    pub fn new(cancel: &CancellationToken, config: LoaderConfig) -> LoaderResult<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| LoaderError::NoRuntime)?;
        let cancel = cancel.child_token();
        let (commands, mailbox) = mpsc::channel(config.mailbox_capacity.max(1));

        handle.spawn(LoaderActor::new(config.strict_directives).run(mailbox, cancel.clone()));
        Ok(Self {
            commands,
            cancel,
            config,
        })
    }

    /// Starts a loader and registers `sources` in order, failing on the first
    /// source that cannot be registered
    pub async fn with_sources(
        cancel: &CancellationToken,
        config: LoaderConfig,
        sources: &[&dyn Source],
    ) -> LoaderResult<Self> {
        let loader = Self::new(cancel, config)?;
        for source in sources {
            loader.register_source(*source).await?;
        }
        Ok(loader)
    }

    /// Returns the loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Reads `source` and adds its snapshot after those already registered.
    ///
    /// Read and watcher errors are returned unchanged and leave the loader
    /// untouched. Targets already bound are not re-resolved.
    pub async fn register_source(&self, source: &dyn Source) -> LoaderResult<()> {
        let name = source.name().to_string();
        let prepared = source.read().and_then(|snapshot| Ok((snapshot, source.watcher()?)));
        let (snapshot, stream) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(event = %Event::SourceRejected, source = %name, code = e.code(), error = %e, "source rejected");
                return Err(e.into());
            }
        };
        let keys = snapshot.data().len();

        let (reply, slot) = oneshot::channel();
        self.send(Command::Register { snapshot, reply }).await?;
        let slot = slot.await.map_err(|_| LoaderError::Closed)?;
        info!(event = %Event::SourceRegistered, source = %name, keys, watched = stream.is_some(), "source registered");

        if let Some(stream) = stream {
            self.watch(slot, name, stream);
        }
        Ok(())
    }

    /// Registers every source, keeping the ones that succeed. Failures are
    /// reported together.
    pub async fn add_sources(&self, sources: &[&dyn Source]) -> LoaderResult<()> {
        let mut failures = Vec::new();
        for source in sources {
            match self.register_source(*source).await {
                Ok(()) => {}
                Err(LoaderError::Source(e)) => failures.push(e),
                Err(e) => return Err(e),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::Sources(failures))
        }
    }

    /// Records `target` for re-resolution and runs its first pass.
    ///
    /// The pass result goes to the target's `set_snapshot`; this only fails
    /// when the loader is closed.
    pub async fn bind<T: Target>(&self, target: T) -> LoaderResult<()> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Bind {
            target: Box::new(target),
            reply,
        })
        .await?;
        done.await.map_err(|_| LoaderError::Closed)
    }

    /// Describes the registered sources in registration order
    pub async fn sources(&self) -> LoaderResult<Vec<SourceInfo>> {
        let (reply, info) = oneshot::channel();
        self.send(Command::Describe(reply)).await?;
        info.await.map_err(|_| LoaderError::Closed)
    }

    /// Stops the loader task and every watch task. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the loader stopped accepting commands
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> LoaderResult<()> {
        if self.cancel.is_cancelled() {
            return Err(LoaderError::Closed);
        }
        self.commands.send(command).await.map_err(|_| LoaderError::Closed)
    }

    /// Forwards the stream's snapshots to the loader task until either side
    /// stops
    fn watch(&self, slot: usize, name: String, mut stream: ChangeStream) {
        let commands = self.commands.clone();
        let cancel = self.cancel.clone();
        debug!(event = %Event::WatchStarted, source = %name, "watch started");

        tokio::spawn(async move {
            loop {
                let snapshot = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    next = stream.next() => match next {
                        Some(snapshot) => snapshot,
                        None => break,
                    },
                };
                let delivered = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    sent = commands.send(Command::Changed { slot, snapshot }) => sent.is_ok(),
                };
                if !delivered {
                    break;
                }
            }
            stream.stop();
            debug!(event = %Event::WatchStopped, source = %name, "watch stopped");
        });
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, Data, JsonCodec, RawValue};
    use crate::source::{ChangeSender, Snapshot, SourceError, SourceResult};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Source fed by the test through a change sender
    #[derive(Debug)]
    struct Scripted {
        name: String,
        initial: Value,
        stream: Mutex<Option<ChangeStream>>,
    }

    impl Scripted {
        fn new(name: &str, initial: Value) -> Self {
            Self {
                name: name.into(),
                initial,
                stream: Mutex::new(None),
            }
        }

        fn watched(name: &str, initial: Value) -> (Self, ChangeSender) {
            let (tx, stream) = ChangeStream::channel(1);
            let source = Self::new(name, initial);
            *source.stream.lock().unwrap() = Some(stream);
            (source, tx)
        }
    }

    fn snapshot(name: &str, value: Value) -> Snapshot {
        let codec: Arc<dyn Codec> = Arc::new(JsonCodec);
        let data: Data = codec.decode_data(&RawValue::Tree(value)).unwrap();
        Snapshot::new(name, codec, data)
    }

    impl Source for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn read(&self) -> SourceResult<Snapshot> {
            Ok(snapshot(&self.name, self.initial.clone()))
        }

        fn watcher(&self) -> SourceResult<Option<ChangeStream>> {
            Ok(self.stream.lock().unwrap().take())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Source for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn read(&self) -> SourceResult<Snapshot> {
            Err(SourceError::NotFound("broken/".into()))
        }

        fn watcher(&self) -> SourceResult<Option<ChangeStream>> {
            Ok(None)
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        name: String,
        age: i64,
    }
    crate::impl_bindable!(Person {
        leaf name = "name,required",
        leaf age = "age",
    });

    async fn next_revision(cell: &ConfigCell<Person>, after: u64) -> Revision<Person> {
        let mut revisions = cell.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if revisions.borrow_and_update().number > after {
                    return revisions.borrow().clone();
                }
                revisions.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_bind_runs_first_pass() {
        let cancel = CancellationToken::new();
        let source = Scripted::new("file", json!({"name": "x", "age": 10}));
        let loader = Loader::with_sources(&cancel, LoaderConfig::default(), &[&source])
            .await
            .unwrap();

        let cell = Arc::new(ConfigCell::<Person>::default());
        loader.bind(cell.clone()).await.unwrap();
        let revision = cell.current();
        assert_eq!(revision.number, 1);
        assert_eq!(revision.config.name, "x");
        assert_eq!(revision.config.age, 10);
        assert!(revision.error.is_none());
    }

    #[tokio::test]
    async fn test_change_re_resolves_bound_targets() {
        let cancel = CancellationToken::new();
        let (source, tx) = Scripted::watched("file", json!({"name": "x", "age": 10}));
        let loader = Loader::new(&cancel, LoaderConfig::default()).unwrap();
        loader.register_source(&source).await.unwrap();

        let first = Arc::new(ConfigCell::<Person>::default());
        let second = Arc::new(ConfigCell::<Person>::default());
        loader.bind(first.clone()).await.unwrap();
        loader.bind(second.clone()).await.unwrap();

        assert!(tx.send(snapshot("file", json!({"age": 11}))).await);
        for cell in [&first, &second] {
            let revision = next_revision(cell, 1).await;
            assert_eq!(revision.config.age, 11);
            assert_eq!(revision.config.name, "x");
            assert_eq!(
                revision.error.map(|e| e.to_string()).as_deref(),
                Some("required key 'name' for field 'name' not found")
            );
        }
    }

    #[tokio::test]
    async fn test_registration_error_surfaced_unchanged() {
        let cancel = CancellationToken::new();
        let loader = Loader::new(&cancel, LoaderConfig::default()).unwrap();
        let err = loader.register_source(&Broken).await.unwrap_err();
        assert_eq!(err.to_string(), "source not found: broken/");
        assert!(loader.sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_sources_keeps_successes() {
        let cancel = CancellationToken::new();
        let loader = Loader::new(&cancel, LoaderConfig::default()).unwrap();
        let good = Scripted::new("file", json!({"name": "x"}));
        let err = loader.add_sources(&[&Broken, &good]).await.unwrap_err();
        assert_eq!(err.code(), "LOADER_SOURCES_FAILED");

        let sources = loader.sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "file");
        assert_eq!(sources[0].codec, "json");
        assert_eq!(sources[0].keys, 1);
    }

    #[tokio::test]
    async fn test_registration_order_decides_precedence() {
        let cancel = CancellationToken::new();
        let a = Scripted::new("a", json!({"name": "from-a"}));
        let b = Scripted::new("b", json!({"name": "from-b", "age": 7}));
        let loader = Loader::with_sources(&cancel, LoaderConfig::default(), &[&a, &b])
            .await
            .unwrap();

        let cell = Arc::new(ConfigCell::<Person>::default());
        loader.bind(cell.clone()).await.unwrap();
        assert_eq!(
            cell.config(),
            Person {
                name: "from-a".into(),
                age: 7
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_closes_loader_and_stops_watch() {
        let cancel = CancellationToken::new();
        let (source, tx) = Scripted::watched("file", json!({"name": "x"}));
        let loader = Loader::new(&cancel, LoaderConfig::default()).unwrap();
        loader.register_source(&source).await.unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), tx.stopped())
            .await
            .unwrap();
        assert!(loader.is_closed());
        let err = loader.bind(Arc::new(ConfigCell::<Person>::default())).await.unwrap_err();
        assert_eq!(err.code(), "LOADER_CLOSED");
    }

    #[test]
    fn test_new_requires_runtime() {
        let err = Loader::new(&CancellationToken::new(), LoaderConfig::default()).unwrap_err();
        assert_eq!(err.code(), "LOADER_NO_RUNTIME");
    }
}
