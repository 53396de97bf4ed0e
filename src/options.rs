//! Rendering options passed through to the conversion service.
//!
//! The client never interprets option names or values (page size, margins,
//! footer templates, ...). They are copied verbatim into the request body.
//! A `BTreeMap` keeps iteration order sorted so the encoded body is
//! deterministic for a given set of options.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, HashMap};

/// An opaque mapping of option name → option value.
///
/// # Example
/// ```rust
/// use html2pdf_client::ConversionOptions;
///
/// let opts = ConversionOptions::new()
///     .with("width", "8.5in")
///     .with("hmargin", 0)
///     .with("footer_html", "<p>%p / %n</p>");
/// assert_eq!(opts.get("hmargin"), Some("0"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversionOptions {
    entries: BTreeMap<String, String>,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, returning `self` for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Set an option, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.entries.insert(key.into(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in sorted key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    /// Parse a `key=value` pair, as accepted by the CLI's `--option` flag.
    ///
    /// Only the first `=` separates key from value, so values may contain `=`.
    pub fn parse_pair(pair: &str) -> Option<(String, String)> {
        let (key, value) = pair.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), value.to_string()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for ConversionOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut opts = Self::new();
        for (k, v) in iter {
            opts.insert(k, v);
        }
        opts
    }
}

impl<K: Into<String>, V: ToString> Extend<(K, V)> for ConversionOptions {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl From<HashMap<String, String>> for ConversionOptions {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for ConversionOptions {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a ConversionOptions {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// Accept JSON objects whose values are primitives: `{"width": "8.5in", "hmargin": 0}`.
impl<'de> Deserialize<'de> for ConversionOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "option '{key}' must be a string, number or boolean, got {other}"
                    )))
                }
            };
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_stringified() {
        let opts = ConversionOptions::new()
            .with("width", 612)
            .with("fit_to_page", true)
            .with("scale", 0.5);
        assert_eq!(opts.get("width"), Some("612"));
        assert_eq!(opts.get("fit_to_page"), Some("true"));
        assert_eq!(opts.get("scale"), Some("0.5"));
    }

    #[test]
    fn iteration_is_sorted() {
        let opts: ConversionOptions = [("zeta", "1"), ("alpha", "2"), ("mid", "3")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = opts.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn parse_pair_splits_on_first_equals() {
        assert_eq!(
            ConversionOptions::parse_pair("footer_html=<a href=x>"),
            Some(("footer_html".into(), "<a href=x>".into()))
        );
        assert_eq!(
            ConversionOptions::parse_pair("empty="),
            Some(("empty".into(), String::new()))
        );
        assert_eq!(ConversionOptions::parse_pair("novalue"), None);
        assert_eq!(ConversionOptions::parse_pair("=x"), None);
    }

    #[test]
    fn deserialize_from_json_object() {
        let opts: ConversionOptions =
            serde_json::from_str(r#"{"width": "8.5in", "hmargin": 0, "use_print_media": true}"#)
                .unwrap();
        assert_eq!(opts.len(), 3);
        assert_eq!(opts.get("hmargin"), Some("0"));
        assert_eq!(opts.get("use_print_media"), Some("true"));
    }

    #[test]
    fn deserialize_rejects_nested_values() {
        let err = serde_json::from_str::<ConversionOptions>(r#"{"margins": {"top": 1}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("margins"), "got: {err}");

        assert!(serde_json::from_str::<ConversionOptions>(r#"{"x": null}"#).is_err());
    }
}
