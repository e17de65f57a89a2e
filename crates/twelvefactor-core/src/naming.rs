//! Resource naming — maps `(app_id, process)` pairs onto a flat namespace.
//!
//! Backends like ECS expose a single flat list of service names per
//! cluster. An app's processes are found by encoding both parts into one
//! name and decoding every listed name on the way back.
//!
//! The split happens on the *first* delimiter. An app id that itself
//! contains the delimiter therefore does not round-trip: `("a--b", "web")`
//! encodes to `a--b--web`, which decodes as `("a", "b--web")`.

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = "--";

/// Encodes and decodes resource names with a fixed delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCodec {
    delimiter: String,
}

impl NameCodec {
    /// Create a codec. An empty delimiter falls back to [`DEFAULT_DELIMITER`].
    pub fn new(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            Self::default()
        } else {
            Self { delimiter }
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Build the resource name for a process of an app.
    pub fn encode(&self, app_id: &str, process: &str) -> String {
        format!("{app_id}{}{process}", self.delimiter)
    }

    /// Split a resource name into `(app_id, process)`.
    ///
    /// Returns `None` for names without the delimiter; such names belong to
    /// nobody and are skipped by callers.
    pub fn decode<'a>(&self, name: &'a str) -> Option<(&'a str, &'a str)> {
        name.split_once(self.delimiter.as_str())
    }
}

impl Default for NameCodec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_joins_with_delimiter() {
        let codec = NameCodec::default();
        assert_eq!(codec.encode("acme", "web"), "acme--web");
    }

    #[test]
    fn round_trip_without_delimiter_in_parts() {
        let codec = NameCodec::default();
        for (app, process) in [("acme", "web"), ("acme-inc", "worker"), ("a", "b-c")] {
            let name = codec.encode(app, process);
            assert_eq!(codec.decode(&name), Some((app, process)));
        }
    }

    #[test]
    fn app_id_containing_delimiter_shifts_the_split() {
        let codec = NameCodec::default();
        let name = codec.encode("a--b", "web");
        assert_eq!(codec.decode(&name), Some(("a", "b--web")));
    }

    #[test]
    fn decode_splits_on_first_occurrence_only() {
        let codec = NameCodec::default();
        assert_eq!(codec.decode("acme--web--canary"), Some(("acme", "web--canary")));
    }

    #[test]
    fn decode_without_delimiter_is_dirty() {
        let codec = NameCodec::default();
        assert_eq!(codec.decode("app"), None);
        assert_eq!(codec.decode(""), None);
        assert_eq!(codec.decode("acme-web"), None);
    }

    #[test]
    fn custom_delimiter() {
        let codec = NameCodec::new("__");
        assert_eq!(codec.encode("acme", "web"), "acme__web");
        assert_eq!(codec.decode("acme__web"), Some(("acme", "web")));
        assert_eq!(codec.decode("acme--web"), None);
    }

    #[test]
    fn empty_delimiter_uses_default() {
        let codec = NameCodec::new("");
        assert_eq!(codec.delimiter(), DEFAULT_DELIMITER);
    }
}
