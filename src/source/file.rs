//! File source
//!
//! Reads a whole document from disk. The codec is picked from the file
//! extension unless set explicitly. Watching polls the file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::poll::watch_file;
use super::{impl_source_options, ChangeStream, Snapshot, Source, SourceError, SourceOptions, SourceResult};
use crate::codec::{codec_for_path, RawValue};

/// A configuration file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    options: SourceOptions,
}

impl FileSource {
    /// Creates a source for `path`, named "file"
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut options = SourceOptions::new("file");
        options.codec = codec_for_path(&path);
        Self { path, options }
    }

    /// Returns the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checked_path(&self) -> SourceResult<&Path> {
        if self.path.as_os_str().is_empty() {
            return Err(SourceError::PathNotSet);
        }
        Ok(&self.path)
    }
}

impl_source_options!(FileSource);

impl Source for FileSource {
    fn name(&self) -> &str {
        &self.options.name
    }

    fn read(&self) -> SourceResult<Snapshot> {
        let path = self.checked_path()?;
        let bytes = fs::read(path).map_err(|e| SourceError::io(path, e))?;
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let data = self
            .options
            .codec
            .decode_data(&RawValue::Bytes(bytes))
            .map_err(|e| SourceError::codec(self.name(), e))?;

        Ok(Snapshot::new(self.name(), self.options.codec.clone(), data).with_timestamp(modified))
    }

    fn watcher(&self) -> SourceResult<Option<ChangeStream>> {
        if !self.options.watch {
            return Ok(None);
        }
        let path = self.checked_path()?;
        fs::metadata(path).map_err(|e| SourceError::io(path, e))?;

        let source = self.clone();
        let stream = watch_file(
            self.name(),
            path.to_path_buf(),
            self.options.watch_interval,
            move || source.read(),
        )?;
        Ok(Some(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, YamlCodec};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_json() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.json", r#"{"name":"x","age":10}"#);
        let snap = FileSource::new(&path).read().unwrap();
        assert_eq!(snap.source(), "file");
        assert_eq!(snap.codec().name(), "json");
        assert_eq!(snap.get("age"), Some(&RawValue::Tree(json!(10))));
    }

    #[test]
    fn test_codec_from_extension() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.yaml", "name: x\n");
        let snap = FileSource::new(&path).read().unwrap();
        assert_eq!(snap.codec().name(), "yaml");
        assert_eq!(snap.get("name"), Some(&RawValue::Tree(json!("x"))));
    }

    #[test]
    fn test_explicit_codec_wins() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.conf", "name: x\n");
        let codec: Arc<dyn Codec> = Arc::new(YamlCodec);
        let snap = FileSource::new(&path).with_codec(codec).read().unwrap();
        assert_eq!(snap.get("name"), Some(&RawValue::Tree(json!("x"))));
    }

    #[test]
    fn test_custom_name() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.json", "{}");
        let source = FileSource::new(&path).with_name("store");
        assert_eq!(source.name(), "store");
        assert_eq!(source.read().unwrap().source(), "store");
    }

    #[test]
    fn test_empty_path() {
        let err = FileSource::new("").read().unwrap_err();
        assert_eq!(err.to_string(), "path not set");
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = FileSource::new(tmp.path().join("missing.json")).read().unwrap_err();
        assert_eq!(err.code(), "SOURCE_IO_FAILED");
    }

    #[test]
    fn test_malformed_document() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.json", "{");
        let err = FileSource::new(&path).read().unwrap_err();
        assert_eq!(err.code(), "SOURCE_DECODE_FAILED");
    }

    #[test]
    fn test_no_watcher_unless_enabled() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.json", "{}");
        assert!(FileSource::new(&path).watcher().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watcher_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        let source = FileSource::new(tmp.path().join("missing.json")).with_watch(true);
        assert!(source.watcher().is_err());
    }

    #[tokio::test]
    async fn test_watcher_emits_on_change() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.json", r#"{"name":"a"}"#);
        let source = FileSource::new(&path)
            .with_watch(true)
            .with_watch_interval(Duration::from_millis(20));
        let mut stream = source.watcher().unwrap().unwrap();

        fs::write(&path, r#"{"name":"bb"}"#).unwrap();
        let snap = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.get("name"), Some(&RawValue::Tree(json!("bb"))));
        stream.stop();
    }

    #[tokio::test]
    async fn test_watcher_skips_unreadable_content() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.json", r#"{"name":"a"}"#);
        let source = FileSource::new(&path)
            .with_watch(true)
            .with_watch_interval(Duration::from_millis(20));
        let mut stream = source.watcher().unwrap().unwrap();

        fs::write(&path, "{ broken").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, r#"{"name":"fixed"}"#).unwrap();

        let snap = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.get("name"), Some(&RawValue::Tree(json!("fixed"))));
    }
}
