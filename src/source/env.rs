//! Environment variable source
//!
//! - Keys are lower-cased and published twice: as-is and with `_` replaced
//!   by `-`, so `DB_HOST` answers both `db_host` and `db-host`
//! - `prefix` keeps only matching variables; `strip_prefix` keeps matching
//!   variables and removes the prefix from their key
//! - A dotenv defaults file supplies values the environment does not set;
//!   watching polls that file
//! - Values are published as text and bind weakly typed

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::poll::watch_file;
use super::{impl_source_options, ChangeStream, Snapshot, Source, SourceError, SourceOptions, SourceResult};
use crate::codec::{Data, RawValue};

/// Process environment (or an explicit variable set) as a source
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefixes: Vec<String>,
    strip_prefixes: Vec<String>,
    defaults: Option<PathBuf>,
    vars: Option<Vec<(String, String)>>,
    options: SourceOptions,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSource {
    /// Creates a source over the process environment, named "env"
    pub fn new() -> Self {
        Self {
            prefixes: Vec::new(),
            strip_prefixes: Vec::new(),
            defaults: None,
            vars: None,
            options: SourceOptions::new("env"),
        }
    }

    /// Creates a source over a fixed variable set instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut source = Self::new();
        source.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        source
    }

    /// Keeps variables starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Keeps variables starting with `prefix` and strips it from their key
    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefixes.push(prefix.into());
        self
    }

    /// Reads defaults from a dotenv file
    pub fn with_defaults(mut self, path: impl Into<PathBuf>) -> Self {
        self.defaults = Some(path.into());
        self
    }

    fn variables(&self) -> SourceResult<BTreeMap<String, String>> {
        let mut merged = BTreeMap::new();
        if let Some(path) = &self.defaults {
            merged.extend(parse_defaults(path)?);
        }
        match &self.vars {
            Some(vars) => merged.extend(vars.iter().cloned()),
            None => merged.extend(
                std::env::vars_os()
                    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
            ),
        }
        Ok(merged)
    }

    /// Applies the prefix filters. Returns the key to publish, if kept.
    fn select<'n>(&self, name: &'n str) -> Option<&'n str> {
        if self.prefixes.is_empty() && self.strip_prefixes.is_empty() {
            return Some(name);
        }
        let mut selected = None;
        if self.prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            selected = Some(name);
        }
        if let Some(p) = self.strip_prefixes.iter().find(|p| name.starts_with(p.as_str())) {
            selected = Some(&name[p.len()..]);
        }
        selected
    }
}

impl_source_options!(EnvSource);

impl Source for EnvSource {
    fn name(&self) -> &str {
        &self.options.name
    }

    fn read(&self) -> SourceResult<Snapshot> {
        let mut data = Data::new();
        for (name, value) in self.variables()? {
            let Some(key) = self.select(&name) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let key = key.to_lowercase();
            data.insert(key.replace('_', "-"), RawValue::Text(value.clone()));
            data.insert(key, RawValue::Text(value));
        }
        Ok(Snapshot::new(self.name(), self.options.codec.clone(), data))
    }

    fn watcher(&self) -> SourceResult<Option<ChangeStream>> {
        if !self.options.watch {
            return Ok(None);
        }
        let Some(defaults) = self.defaults.clone() else {
            return Ok(None);
        };
        let source = self.clone();
        let stream = watch_file(self.name(), defaults, self.options.watch_interval, move || {
            source.read()
        })?;
        Ok(Some(stream))
    }
}

/// Reads a dotenv defaults file without touching the process environment.
/// Quoting, escapes and `${VAR}` expansion follow dotenv rules.
fn parse_defaults(path: &Path) -> SourceResult<Vec<(String, String)>> {
    let entries = dotenvy::from_path_iter(path).map_err(|e| defaults_error(path, e))?;
    entries
        .map(|entry| entry.map_err(|e| defaults_error(path, e)))
        .collect()
}

fn defaults_error(path: &Path, error: dotenvy::Error) -> SourceError {
    match error {
        dotenvy::Error::Io(e) => SourceError::io(path, e),
        dotenvy::Error::LineParse(line, _) => SourceError::InvalidDefaults {
            path: path.to_path_buf(),
            line,
        },
        other => SourceError::Other(format!("{}: {other}", path.display())),
    }
}
