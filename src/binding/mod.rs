//! Binding engine
//!
//! Maps the fields of a target structure to configuration keys and fills them
//! from source snapshots.
//!
//! # Flow
//!
//! 1. The target declares its fields (`Bindable`, usually via `impl_bindable!`)
//! 2. `walk` builds a fresh field tree that borrows the live target
//! 3. `Resolver` looks every field up in the snapshots and writes decoded
//!    values through the tree
//!
//! The tree is rebuilt on every pass, so fields with no incoming data keep
//! whatever value the target already held.

mod directive;
mod errors;
mod resolver;
mod schema;

pub use directive::{BindingSpec, FLATTEN};
pub use errors::{DirectiveError, DirectiveResult, FieldError, ResolveError, ResolveResult};
pub use resolver::Resolver;
pub use schema::{walk, Bindable, FieldKind, FieldNode, FieldSet, LeafSlot, ListSlot, OptionalSlot};
