//! configbind - bind typed configuration structures to live sources
//!
//! Sources (files, environment variables, key-value stores) publish
//! snapshots; the loader resolves every bound structure against them and
//! re-resolves whenever a watched source changes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use configbind::{impl_bindable, ConfigCell, FileSource, Loader, LoaderConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Settings { name: String, age: i64 }
//! impl_bindable!(Settings { leaf name = "name,required", leaf age = "age" });
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let file = FileSource::new("config.json").with_watch(true);
//! let loader = Loader::with_sources(&cancel, LoaderConfig::default(), &[&file]).await?;
//!
//! let settings = Arc::new(ConfigCell::<Settings>::default());
//! loader.bind(settings.clone()).await?;
//! println!("{:?}", settings.config());
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod cli;
pub mod codec;
pub mod loader;
pub mod observability;
pub mod source;

pub use binding::{Bindable, BindingSpec, FieldSet, ResolveError, Resolver};
pub use codec::{Codec, JsonCodec, RawValue, TomlCodec, YamlCodec};
pub use loader::{ConfigCell, Loader, LoaderConfig, LoaderError, Revision, Target};
pub use source::{EnvSource, FileSource, KvSource, MemoryKvStore, Snapshot, Source};
