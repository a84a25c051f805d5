//! CLI command implementations
//!
//! `get` binds the directives given on the command line as a dynamic target.
//! Each directive's key doubles as the field name and as the output key.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::binding::{Bindable, BindingSpec, FieldSet};
use crate::loader::{ConfigCell, Loader, LoaderConfig, Revision};
use crate::source::{EnvSource, FileSource, Source};

use super::args::{Command, SourceArgs};
use super::errors::CliResult;
use super::io::write_json;

/// One command-line directive and the value bound to it
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicField {
    pub name: String,
    pub directive: String,
    pub value: Value,
}

/// Target built from command-line directives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicConfig {
    pub fields: Vec<DynamicField>,
}

impl DynamicConfig {
    /// Creates one null field per directive
    pub fn new<S: AsRef<str>>(directives: &[S]) -> Self {
        let fields = directives
            .iter()
            .map(|directive| {
                let directive = directive.as_ref();
                DynamicField {
                    name: BindingSpec::parse(directive).key,
                    directive: directive.to_string(),
                    value: Value::Null,
                }
            })
            .collect();
        Self { fields }
    }

    /// Renders the bound values as a JSON object keyed by field name
    pub fn to_json(&self) -> Value {
        let values: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect();
        Value::Object(values)
    }
}

impl Bindable for DynamicConfig {
    fn bind_fields<'a>(&'a mut self, fields: &mut FieldSet<'a>) {
        for field in self.fields.iter_mut() {
            let DynamicField {
                name,
                directive,
                value,
            } = field;
            let name: &'a String = name;
            fields.leaf(name.as_str(), directive.as_str(), value);
        }
    }
}

/// Builds the sources named by the arguments, files first
pub fn build_sources(args: &SourceArgs) -> Vec<Box<dyn Source>> {
    let interval = Duration::from_millis(args.interval_ms.max(1));
    let mut sources: Vec<Box<dyn Source>> = Vec::new();

    for path in &args.files {
        sources.push(Box::new(
            FileSource::new(path)
                .with_watch(args.watch)
                .with_watch_interval(interval),
        ));
    }

    if !args.env_prefixes.is_empty() || args.env_defaults.is_some() {
        let mut env = EnvSource::new()
            .with_watch(args.watch)
            .with_watch_interval(interval);
        for prefix in &args.env_prefixes {
            env = env.with_strip_prefix(prefix.clone());
        }
        if let Some(defaults) = &args.env_defaults {
            env = env.with_defaults(defaults.clone());
        }
        sources.push(Box::new(env));
    }
    sources
}

async fn open_loader(cancel: &CancellationToken, args: &SourceArgs) -> CliResult<Loader> {
    let config = LoaderConfig {
        strict_directives: args.strict,
        ..LoaderConfig::default()
    };
    let sources = build_sources(args);
    let sources: Vec<&dyn Source> = sources.iter().map(|source| source.as_ref()).collect();
    Ok(Loader::with_sources(cancel, config, &sources).await?)
}

fn render(revision: &Revision<DynamicConfig>) -> Value {
    serde_json::json!({
        "revision": revision.number,
        "values": revision.config.to_json(),
        "error": revision.error.as_ref().map(ToString::to_string),
    })
}

/// Resolve directives and print one JSON line per pass
pub async fn get(args: &SourceArgs, keys: &[String]) -> CliResult<()> {
    let cancel = CancellationToken::new();
    let loader = open_loader(&cancel, args).await?;

    let cell = Arc::new(ConfigCell::new(DynamicConfig::new(keys)));
    let mut revisions = cell.subscribe();
    loader.bind(cell.clone()).await?;

    let first = revisions.borrow_and_update().clone();
    write_json(&render(&first))?;
    if !args.watch {
        return match first.error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        };
    }

    info!("watching for changes, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = revisions.borrow_and_update().clone();
                write_json(&render(&revision))?;
            }
        }
    }
    loader.shutdown();
    Ok(())
}

/// Print every registered source as a JSON line
pub async fn sources(args: &SourceArgs) -> CliResult<()> {
    let cancel = CancellationToken::new();
    let loader = open_loader(&cancel, args).await?;
    for info in loader.sources().await? {
        write_json(&info)?;
    }
    loader.shutdown();
    Ok(())
}

/// Run a CLI command
pub async fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Get { sources, keys } => get(&sources, &keys).await,
        Command::Sources { sources: args } => sources(&args).await,
    }
}
