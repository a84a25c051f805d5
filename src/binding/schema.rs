//! Schema walk
//!
//! A target declares its fields through [`Bindable`]; walking it yields a
//! tree of [`FieldNode`]s that borrow the target's fields mutably, so the
//! resolver writes decoded values straight into the live structure.
//!
//! # Field kinds
//!
//! - `leaf`: any `DeserializeOwned` value. Skipped when the key is empty or `-`.
//! - `nested`: a `Bindable` structure. `-` splices its fields into the parent;
//!   an empty key binds it under the field name.
//! - `optional`: an `Option` of a structure. Expanded lazily by the resolver,
//!   which starts from `T::default()` when unset and keeps the result only if
//!   something beneath it resolved.
//! - `list`: a `Vec` of structures. Rebuilt from `T::default()` elements for
//!   every pass and replaced wholesale.

use std::fmt;

use serde::de::DeserializeOwned;

use super::directive::BindingSpec;
use crate::codec::{Codec, CodecResult, RawValue};

/// A structure whose fields can be bound to configuration keys
pub trait Bindable {
    /// Declares every bindable field of `self`
    fn bind_fields<'a>(&'a mut self, fields: &mut FieldSet<'a>);
}

/// Decodes a raw value into one leaf field
pub trait LeafSlot {
    fn assign(&mut self, codec: &dyn Codec, raw: &RawValue) -> CodecResult<()>;
}

/// Lazily expanded optional structure
pub trait OptionalSlot {
    /// Returns true when the field currently holds a value
    fn is_set(&self) -> bool;

    /// Walks the current value, or a default one when unset, and hands its
    /// fields to `resolve`. The value is stored back if it was set before or
    /// `resolve` returns true.
    fn fill(&mut self, resolve: &mut dyn FnMut(&mut [FieldNode<'_>]) -> bool);
}

/// Lazily expanded list of structures
pub trait ListSlot {
    /// Replaces the list with `len` default elements, each walked and handed
    /// to `resolve` with its index
    fn rebuild(&mut self, len: usize, resolve: &mut dyn FnMut(usize, &mut [FieldNode<'_>]));
}

struct LeafField<'a, T>(&'a mut T);

impl<T: DeserializeOwned> LeafSlot for LeafField<'_, T> {
    fn assign(&mut self, codec: &dyn Codec, raw: &RawValue) -> CodecResult<()> {
        *self.0 = codec.decode(raw)?;
        Ok(())
    }
}

struct OptionalField<'a, T>(&'a mut Option<T>);

impl<T: Bindable + Default> OptionalSlot for OptionalField<'_, T> {
    fn is_set(&self) -> bool {
        self.0.is_some()
    }

    fn fill(&mut self, resolve: &mut dyn FnMut(&mut [FieldNode<'_>]) -> bool) {
        let existed = self.0.is_some();
        let mut value = self.0.take().unwrap_or_default();
        let found = {
            let mut set = FieldSet::new();
            value.bind_fields(&mut set);
            resolve(&mut set.nodes)
        };
        if existed || found {
            *self.0 = Some(value);
        }
    }
}

struct ListField<'a, T>(&'a mut Vec<T>);

impl<T: Bindable + Default> ListSlot for ListField<'_, T> {
    fn rebuild(&mut self, len: usize, resolve: &mut dyn FnMut(usize, &mut [FieldNode<'_>])) {
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let mut item = T::default();
            {
                let mut set = FieldSet::new();
                item.bind_fields(&mut set);
                resolve(index, &mut set.nodes);
            }
            items.push(item);
        }
        *self.0 = items;
    }
}

/// What a field node binds to
pub enum FieldKind<'a> {
    Leaf(Box<dyn LeafSlot + 'a>),
    Struct(Vec<FieldNode<'a>>),
    Optional(Box<dyn OptionalSlot + 'a>),
    List(Box<dyn ListSlot + 'a>),
}

impl fmt::Debug for FieldKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(_) => f.write_str("Leaf"),
            Self::Struct(children) => f.debug_tuple("Struct").field(children).finish(),
            Self::Optional(slot) => f
                .debug_struct("Optional")
                .field("set", &slot.is_set())
                .finish(),
            Self::List(_) => f.write_str("List"),
        }
    }
}

/// One bindable field of a walked target
#[derive(Debug)]
pub struct FieldNode<'a> {
    name: &'a str,
    spec: BindingSpec,
    pub(crate) kind: FieldKind<'a>,
    pub(crate) found: bool,
}

impl<'a> FieldNode<'a> {
    /// Returns the field name
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the parsed directive
    pub fn spec(&self) -> &BindingSpec {
        &self.spec
    }

    /// Returns what the field binds to
    pub fn kind(&self) -> &FieldKind<'a> {
        &self.kind
    }

    /// Returns whether the last resolution found a value
    pub fn found(&self) -> bool {
        self.found
    }

    /// Returns the eagerly walked children of a nested structure
    pub fn children(&self) -> &[FieldNode<'a>] {
        match &self.kind {
            FieldKind::Struct(children) => children,
            _ => &[],
        }
    }
}

/// Field declarations collected from a [`Bindable`]
#[derive(Debug, Default)]
pub struct FieldSet<'a> {
    nodes: Vec<FieldNode<'a>>,
}

impl<'a> FieldSet<'a> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Declares a scalar (or any deserializable) field
    pub fn leaf<T>(&mut self, name: &'a str, directive: &str, value: &'a mut T) -> &mut Self
    where
        T: DeserializeOwned + 'a,
    {
        let spec = BindingSpec::parse(directive);
        if !spec.skips_leaf() {
            self.push(name, spec, FieldKind::Leaf(Box::new(LeafField(value))));
        }
        self
    }

    /// Declares a nested structure
    pub fn nested<T>(&mut self, name: &'a str, directive: &str, value: &'a mut T) -> &mut Self
    where
        T: Bindable + ?Sized,
    {
        let mut spec = BindingSpec::parse(directive);
        if spec.is_flatten() {
            value.bind_fields(self);
            return self;
        }
        if spec.key.is_empty() {
            spec.key = name.to_string();
        }
        let mut children = FieldSet::new();
        value.bind_fields(&mut children);
        self.push(name, spec, FieldKind::Struct(children.nodes));
        self
    }

    /// Declares an optional nested structure
    pub fn optional<T>(&mut self, name: &'a str, directive: &str, value: &'a mut Option<T>) -> &mut Self
    where
        T: Bindable + Default + 'a,
    {
        let mut spec = BindingSpec::parse(directive);
        if spec.is_flatten() {
            if let Some(inner) = value {
                inner.bind_fields(self);
            }
            return self;
        }
        if spec.key.is_empty() {
            spec.key = name.to_string();
        }
        self.push(name, spec, FieldKind::Optional(Box::new(OptionalField(value))));
        self
    }

    /// Declares a list of nested structures. `-` skips the field.
    pub fn list<T>(&mut self, name: &'a str, directive: &str, value: &'a mut Vec<T>) -> &mut Self
    where
        T: Bindable + Default + 'a,
    {
        let mut spec = BindingSpec::parse(directive);
        if spec.is_flatten() {
            return self;
        }
        if spec.key.is_empty() {
            spec.key = name.to_string();
        }
        self.push(name, spec, FieldKind::List(Box::new(ListField(value))));
        self
    }

    /// Returns the declared nodes
    pub fn nodes(&self) -> &[FieldNode<'a>] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<FieldNode<'a>> {
        self.nodes
    }

    fn push(&mut self, name: &'a str, spec: BindingSpec, kind: FieldKind<'a>) {
        self.nodes.push(FieldNode {
            name,
            spec,
            kind,
            found: false,
        });
    }
}

/// Walks `target` into its field tree
pub fn walk<B: Bindable + ?Sized>(target: &mut B) -> Vec<FieldNode<'_>> {
    let mut set = FieldSet::new();
    target.bind_fields(&mut set);
    set.into_nodes()
}

/// Implements [`Bindable`] from a field list.
///
/// ```
/// use configbind::impl_bindable;
///
/// #[derive(Default)]
/// struct Db { host: String, port: u16 }
/// impl_bindable!(Db { leaf host = "host,required", leaf port = "port" });
///
/// #[derive(Default)]
/// struct App { name: String, db: Db, replicas: Vec<Db>, cache: Option<Db> }
/// impl_bindable!(App {
///     leaf name = "name",
///     nested db = "db",
///     list replicas = "replicas",
///     optional cache = "cache",
/// });
/// ```
#[macro_export]
macro_rules! impl_bindable {
    ($ty:ty { $($kind:ident $field:ident = $directive:expr),* $(,)? }) => {
        impl $crate::binding::Bindable for $ty {
            fn bind_fields<'a>(&'a mut self, fields: &mut $crate::binding::FieldSet<'a>) {
                $( fields.$kind(stringify!($field), $directive, &mut self.$field); )*
            }
        }
    };
}
