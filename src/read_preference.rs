//! Read preference configuration.
//!
//! A read preference describes which cluster members are eligible to serve a
//! command. The encoder consults it twice: the modern layout injects it as a
//! `$readPreference` body field, while the legacy layout wraps the whole
//! command as `{$query: ..., $readPreference: ...}`. Both only happen when
//! the preference differs from the default (primary, no tags, no staleness
//! bound).

use bson::{doc, Bson, Document};
use std::time::Duration;

/// Read preference mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPreferenceMode {
    /// Read from the primary only
    Primary,
    /// Read from the primary if available, otherwise a secondary
    PrimaryPreferred,
    /// Read from a secondary only
    Secondary,
    /// Read from a secondary if available, otherwise the primary
    SecondaryPreferred,
    /// Read from the member with the lowest network latency
    Nearest,
}

impl ReadPreferenceMode {
    /// Wire-format name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadPreferenceMode::Primary => "primary",
            ReadPreferenceMode::PrimaryPreferred => "primaryPreferred",
            ReadPreferenceMode::Secondary => "secondary",
            ReadPreferenceMode::SecondaryPreferred => "secondaryPreferred",
            ReadPreferenceMode::Nearest => "nearest",
        }
    }
}

/// An immutable read preference: mode plus optional tag sets and a maximum
/// replication staleness bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPreference {
    mode: ReadPreferenceMode,
    tag_sets: Vec<Document>,
    max_staleness: Option<Duration>,
}

impl ReadPreference {
    /// Primary read preference (the default).
    pub fn primary() -> Self {
        Self::from_mode(ReadPreferenceMode::Primary)
    }

    /// Primary-preferred read preference.
    pub fn primary_preferred() -> Self {
        Self::from_mode(ReadPreferenceMode::PrimaryPreferred)
    }

    /// Secondary read preference.
    pub fn secondary() -> Self {
        Self::from_mode(ReadPreferenceMode::Secondary)
    }

    /// Secondary-preferred read preference.
    pub fn secondary_preferred() -> Self {
        Self::from_mode(ReadPreferenceMode::SecondaryPreferred)
    }

    /// Nearest read preference.
    pub fn nearest() -> Self {
        Self::from_mode(ReadPreferenceMode::Nearest)
    }

    fn from_mode(mode: ReadPreferenceMode) -> Self {
        Self {
            mode,
            tag_sets: Vec::new(),
            max_staleness: None,
        }
    }

    /// Restrict eligible members to those matching one of the tag sets.
    pub fn with_tag_sets(mut self, tag_sets: Vec<Document>) -> Self {
        self.tag_sets = tag_sets;
        self
    }

    /// Bound the acceptable replication lag of eligible members.
    pub fn with_max_staleness(mut self, max_staleness: Duration) -> Self {
        self.max_staleness = Some(max_staleness);
        self
    }

    /// Get the mode.
    pub fn mode(&self) -> ReadPreferenceMode {
        self.mode
    }

    /// Whether this is the default preference: primary with no tag sets and
    /// no staleness bound. The encoder omits the default entirely.
    pub fn is_default(&self) -> bool {
        self.mode == ReadPreferenceMode::Primary
            && self.tag_sets.is_empty()
            && self.max_staleness.is_none()
    }

    /// Wire-format document representation.
    pub fn to_document(&self) -> Document {
        let mut document = doc! { "mode": self.mode.as_str() };
        if !self.tag_sets.is_empty() {
            let tags: Vec<Bson> = self
                .tag_sets
                .iter()
                .cloned()
                .map(Bson::Document)
                .collect();
            document.insert("tags", Bson::Array(tags));
        }
        if let Some(max_staleness) = self.max_staleness {
            document.insert("maxStalenessSeconds", max_staleness.as_secs() as i64);
        }
        document
    }
}

impl Default for ReadPreference {
    fn default() -> Self {
        Self::primary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_is_default() {
        assert!(ReadPreference::primary().is_default());
        assert!(ReadPreference::default().is_default());
    }

    #[test]
    fn test_non_primary_modes_are_not_default() {
        assert!(!ReadPreference::primary_preferred().is_default());
        assert!(!ReadPreference::secondary().is_default());
        assert!(!ReadPreference::secondary_preferred().is_default());
        assert!(!ReadPreference::nearest().is_default());
    }

    #[test]
    fn test_primary_with_options_is_not_default() {
        let with_tags = ReadPreference::primary().with_tag_sets(vec![doc! { "dc": "east" }]);
        assert!(!with_tags.is_default());

        let with_staleness =
            ReadPreference::primary().with_max_staleness(Duration::from_secs(90));
        assert!(!with_staleness.is_default());
    }

    #[test]
    fn test_to_document_mode_only() {
        let document = ReadPreference::secondary_preferred().to_document();
        assert_eq!(document, doc! { "mode": "secondaryPreferred" });
    }

    #[test]
    fn test_to_document_with_tags_and_staleness() {
        let document = ReadPreference::nearest()
            .with_tag_sets(vec![doc! { "dc": "west" }])
            .with_max_staleness(Duration::from_secs(120))
            .to_document();

        assert_eq!(document.get_str("mode").unwrap(), "nearest");
        assert_eq!(document.get_array("tags").unwrap().len(), 1);
        assert_eq!(document.get_i64("maxStalenessSeconds").unwrap(), 120);
    }
}
