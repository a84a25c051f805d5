//! Loader task
//!
//! A single task owns the snapshot table and the bound targets. Registration,
//! binding and change notifications arrive as commands and are handled one
//! at a time, so two sources changing together produce two sequential passes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::target::DynTarget;
use crate::binding::Resolver;
use crate::observability::Event;
use crate::source::Snapshot;

/// Description of a registered source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub codec: &'static str,
    /// When the current snapshot was produced
    pub timestamp: DateTime<Utc>,
    /// Number of top-level keys in the current snapshot
    pub keys: usize,
}

impl SourceInfo {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            name: snapshot.source().to_string(),
            codec: snapshot.codec().name(),
            timestamp: snapshot.timestamp(),
            keys: snapshot.data().len(),
        }
    }
}

pub(crate) enum Command {
    /// Adds a snapshot; replies with its slot
    Register {
        snapshot: Snapshot,
        reply: oneshot::Sender<usize>,
    },
    /// Records a target and runs its first pass
    Bind {
        target: Box<dyn DynTarget>,
        reply: oneshot::Sender<()>,
    },
    /// Replaces the snapshot in `slot` and re-resolves every target
    Changed { slot: usize, snapshot: Snapshot },
    Describe(oneshot::Sender<Vec<SourceInfo>>),
}

pub(crate) struct LoaderActor {
    snapshots: Vec<Snapshot>,
    targets: Vec<Box<dyn DynTarget>>,
    strict: bool,
}

impl LoaderActor {
    pub(crate) fn new(strict: bool) -> Self {
        Self {
            snapshots: Vec::new(),
            targets: Vec::new(),
            strict,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            self.handle(command);
        }
        info!(event = %Event::LoaderShutdown, targets = self.targets.len(), "loader stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { snapshot, reply } => {
                self.snapshots.push(snapshot);
                let _ = reply.send(self.snapshots.len() - 1);
            }
            Command::Bind { target, reply } => {
                info!(event = %Event::TargetBound, targets = self.targets.len() + 1, "target bound");
                self.run_pass(target.as_ref());
                self.targets.push(target);
                let _ = reply.send(());
            }
            Command::Changed { slot, snapshot } => {
                let Some(current) = self.snapshots.get_mut(slot) else {
                    warn!(slot, "change for unknown source slot dropped");
                    return;
                };
                debug!(event = %Event::SnapshotReplaced, source = %snapshot.source(), keys = snapshot.data().len(), "snapshot replaced");
                *current = snapshot;
                for target in &self.targets {
                    self.run_pass(target.as_ref());
                }
            }
            Command::Describe(reply) => {
                let _ = reply.send(self.snapshots.iter().map(SourceInfo::of).collect());
            }
        }
    }

    fn run_pass(&self, target: &dyn DynTarget) {
        let resolver = Resolver::new(&self.snapshots).strict(self.strict);
        match target.pass(&resolver) {
            Ok(()) => debug!(event = %Event::ResolvePassComplete, "resolution pass complete"),
            Err(e) => warn!(event = %Event::ResolvePassFailed, code = e.code(), error = %e, "resolution pass failed"),
        }
    }
}
