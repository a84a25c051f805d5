//! Resolution pass
//!
//! For every top-level field the snapshots are tried in registration order.
//! The first snapshot holding the field's key wins; a decode failure is
//! recorded and the next snapshot is tried. Nested structures, optional
//! structures and lists resolve their children against the nested mapping of
//! the winning snapshot only.
//!
//! Values are written into the target as soon as they decode, so a pass that
//! fails still commits every field it could resolve.
//!
//! A nested structure absent from every source still has its required
//! fields checked.

use tracing::warn;

use super::errors::{FieldError, ResolveError, ResolveResult};
use super::schema::{walk, Bindable, FieldKind, FieldNode};
use crate::codec::{CodecResult, Data, RawValue};
use crate::observability::Event;
use crate::source::Snapshot;

/// Resolves field trees against an ordered set of snapshots
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s> {
    snapshots: &'s [Snapshot],
    strict: bool,
}

/// Errors collected during one pass
#[derive(Debug, Default)]
struct Pass {
    fatal: Option<ResolveError>,
    errors: Vec<FieldError>,
}

impl Pass {
    fn fatal(&mut self, error: ResolveError) {
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    fn decode_failed(&mut self, node: &FieldNode<'_>, path: &str, origin: &str, message: String) {
        self.errors.push(FieldError {
            field: path.to_string(),
            key: node.spec().key.clone(),
            origin: origin.to_string(),
            message,
        });
    }

    /// Checks `node` and, when it is a nested structure that was not found,
    /// every required field beneath it. Optional structures and lists stay
    /// unset without data, so their children are not checked.
    fn required(&mut self, node: &FieldNode<'_>, path: &str) {
        if node.found {
            return;
        }
        if node.spec().required {
            self.fatal(ResolveError::RequiredMissing {
                key: node.spec().key.clone(),
                field: path.to_string(),
            });
        }
        if let FieldKind::Struct(children) = node.kind() {
            for child in children {
                self.required(child, &join(path, child.name()));
            }
        }
    }

    fn finish(self) -> ResolveResult<()> {
        if let Some(fatal) = self.fatal {
            return Err(fatal);
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::Aggregate(self.errors))
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

impl<'s> Resolver<'s> {
    /// Creates a resolver over `snapshots`, tried in slice order
    pub fn new(snapshots: &'s [Snapshot]) -> Self {
        Self {
            snapshots,
            strict: false,
        }
    }

    /// Makes malformed directive options fatal instead of logged
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Walks `target` and resolves it in place
    pub fn resolve_target<B: Bindable + ?Sized>(&self, target: &mut B) -> ResolveResult<()> {
        let mut nodes = walk(target);
        self.resolve(&mut nodes)
    }

    /// Resolves an already walked field tree
    pub fn resolve(&self, nodes: &mut [FieldNode<'_>]) -> ResolveResult<()> {
        let mut pass = Pass::default();
        for node in nodes.iter_mut() {
            self.resolve_top(node, &mut pass);
        }
        pass.finish()
    }

    fn is_registered(&self, backend: &str) -> bool {
        self.snapshots.iter().any(|s| s.source() == backend)
    }

    /// Returns false when the node must not be resolved
    fn check_directive(&self, node: &FieldNode<'_>, path: &str, pass: &mut Pass) -> bool {
        let spec = node.spec();
        if spec.unrecognized.is_empty() {
            return true;
        }
        if self.strict {
            if let Err(error) = spec.ensure_recognized() {
                pass.fatal(ResolveError::InvalidDirective {
                    field: path.to_string(),
                    error,
                });
            }
            return false;
        }
        for option in &spec.unrecognized {
            warn!(event = %Event::DirectiveOptionIgnored, field = %path, option = %option, "ignoring directive option");
        }
        true
    }

    fn resolve_top(&self, node: &mut FieldNode<'_>, pass: &mut Pass) {
        let path = node.name().to_string();
        if !self.check_directive(node, &path, pass) {
            return;
        }

        let mut pin_matched = false;
        for snapshot in self.snapshots {
            let pinned_elsewhere = node
                .spec()
                .backend
                .as_deref()
                .map_or(false, |backend| backend != snapshot.source());
            if pinned_elsewhere {
                continue;
            }
            pin_matched = true;

            let Some(raw) = snapshot.get(&node.spec().key) else {
                continue;
            };
            match self.assign(node, &path, snapshot, raw, pass) {
                Ok(()) => {
                    node.found = true;
                    break;
                }
                Err(e) => pass.decode_failed(node, &path, snapshot.source(), e.to_string()),
            }
        }

        if let Some(backend) = &node.spec().backend {
            if !pin_matched {
                pass.fatal(ResolveError::UnknownBackend {
                    backend: backend.clone(),
                    field: path.clone(),
                });
            }
        }
        pass.required(node, &path);
    }

    /// Resolves `nodes` against one nested mapping of `snapshot`. Returns true
    /// if any of them was found.
    fn resolve_nested(
        &self,
        nodes: &mut [FieldNode<'_>],
        prefix: &str,
        snapshot: &Snapshot,
        data: &Data,
        pass: &mut Pass,
    ) -> bool {
        let mut any = false;
        for node in nodes.iter_mut() {
            let path = join(prefix, node.name());
            if !self.check_directive(node, &path, pass) {
                continue;
            }
            if let Some(backend) = node.spec().backend.clone() {
                if !self.is_registered(&backend) {
                    pass.fatal(ResolveError::UnknownBackend {
                        backend,
                        field: path,
                    });
                    continue;
                }
                if backend != snapshot.source() {
                    pass.required(node, &path);
                    continue;
                }
            }

            if let Some(raw) = data.get(&node.spec().key) {
                match self.assign(node, &path, snapshot, raw, pass) {
                    Ok(()) => node.found = true,
                    Err(e) => pass.decode_failed(node, &path, snapshot.source(), e.to_string()),
                }
            }
            pass.required(node, &path);
            any |= node.found;
        }
        any
    }

    /// Writes `raw` into the node. Errors only when `raw` itself fails to
    /// decode; failures beneath a structure are recorded in `pass`.
    fn assign(
        &self,
        node: &mut FieldNode<'_>,
        path: &str,
        snapshot: &Snapshot,
        raw: &RawValue,
        pass: &mut Pass,
    ) -> CodecResult<()> {
        let codec = snapshot.codec();
        match &mut node.kind {
            FieldKind::Leaf(slot) => slot.assign(codec, raw),
            FieldKind::Struct(children) => {
                let data = codec.decode_data(raw)?;
                self.resolve_nested(children, path, snapshot, &data, pass);
                Ok(())
            }
            FieldKind::Optional(slot) => {
                let data = codec.decode_data(raw)?;
                slot.fill(&mut |children| self.resolve_nested(children, path, snapshot, &data, pass));
                Ok(())
            }
            FieldKind::List(slot) => {
                let items = codec.decode_data_list(raw)?;
                slot.rebuild(items.len(), &mut |index, children| {
                    let prefix = format!("{path}[{index}]");
                    self.resolve_nested(children, &prefix, snapshot, &items[index], pass);
                });
                Ok(())
            }
        }
    }
}
