//! Observable loader events
//!
//! Every log record the crate emits carries one of these as its `event`
//! field, so log pipelines can filter on a fixed vocabulary.

use std::fmt;

/// Observable events in the loader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Sources
    /// Initial read succeeded and the snapshot was stored
    SourceRegistered,
    /// Initial read or watcher setup failed; the source was not added
    SourceRejected,
    /// Background subscription to a source's change stream started
    WatchStarted,
    /// Background subscription ended (cancelled or stream closed)
    WatchStopped,
    /// A watch tick failed to re-read its source; skipped until next change
    WatchReadFailed,
    /// A source's snapshot was replaced by a newer one
    SnapshotReplaced,

    // Resolution
    /// A target was recorded and received its first pass
    TargetBound,
    /// A resolution pass completed without error
    ResolvePassComplete,
    /// A resolution pass returned an error to the target
    ResolvePassFailed,
    /// A directive carried an option that was not recognised
    DirectiveOptionIgnored,

    // Lifecycle
    /// Loader actor exited
    LoaderShutdown,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SourceRegistered => "SOURCE_REGISTERED",
            Event::SourceRejected => "SOURCE_REJECTED",
            Event::WatchStarted => "WATCH_STARTED",
            Event::WatchStopped => "WATCH_STOPPED",
            Event::WatchReadFailed => "WATCH_READ_FAILED",
            Event::SnapshotReplaced => "SNAPSHOT_REPLACED",

            Event::TargetBound => "TARGET_BOUND",
            Event::ResolvePassComplete => "RESOLVE_PASS_COMPLETE",
            Event::ResolvePassFailed => "RESOLVE_PASS_FAILED",
            Event::DirectiveOptionIgnored => "DIRECTIVE_OPTION_IGNORED",

            Event::LoaderShutdown => "LOADER_SHUTDOWN",
        }
    }

    /// Returns true if the event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::SourceRejected | Event::WatchReadFailed | Event::ResolvePassFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_strings_are_upper_snake() {
        let events = [
            Event::SourceRegistered,
            Event::SourceRejected,
            Event::WatchStarted,
            Event::WatchStopped,
            Event::WatchReadFailed,
            Event::SnapshotReplaced,
            Event::TargetBound,
            Event::ResolvePassComplete,
            Event::ResolvePassFailed,
            Event::DirectiveOptionIgnored,
            Event::LoaderShutdown,
        ];
        for event in events {
            let s = event.as_str();
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'), "{}", s);
        }
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::WatchReadFailed.is_failure());
        assert!(Event::ResolvePassFailed.is_failure());
        assert!(!Event::SnapshotReplaced.is_failure());
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Event::TargetBound.to_string(), "TARGET_BOUND");
    }
}
