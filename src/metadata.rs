use exiftool::ExifTool;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Exif2XattrError;

/// Name of the binary searched for in $PATH when --exiftool is not given
pub const EXIFTOOL_BINARY: &str = "exiftool";

/// Tag exiftool emits when it could not read a file at all
const ERROR_TAG: &str = "ExifTool:Error";

/// Tag exiftool emits for recoverable problems (e.g. odd maker notes)
const WARNING_TAG: &str = "ExifTool:Warning";

/// A single tag value as emitted by exiftool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Text(String),
    List(Vec<String>),
}

impl TagValue {
    pub fn text(value: impl Into<String>) -> Self {
        TagValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagValue::List(values.into_iter().map(Into::into).collect())
    }

    /// True when there is nothing worth writing (empty string, empty list, or
    /// only whitespace entries).
    pub fn is_blank(&self) -> bool {
        match self {
            TagValue::Text(s) => s.trim().is_empty(),
            TagValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Flatten to a single string, joining list items with `separator` and
    /// dropping blank items.
    pub fn render(&self, separator: &str) -> String {
        match self {
            TagValue::Text(s) => s.trim().to_string(),
            TagValue::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(separator),
        }
    }
}

impl From<Value> for TagValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => TagValue::List(items.into_iter().map(scalar_text).collect()),
            other => TagValue::Text(scalar_text(other)),
        }
    }
}

/// exiftool's JSON mixes strings, numbers and booleans; everything becomes text.
fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Tag key to value mapping for one file. Keys are kept sorted, which fixes
/// the iteration order used by [`MetadataRecord::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    tags: BTreeMap<String, TagValue>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from one JSON object of `exiftool -j -G` output.
    pub fn from_json(value: Value) -> Result<Self, String> {
        let object = match value {
            Value::Object(object) => object,
            other => return Err(format!("expected a JSON object, got {}", other)),
        };

        let tags = object
            .into_iter()
            // SourceFile is exiftool bookkeeping, not metadata
            .filter(|(key, _)| key != "SourceFile")
            .map(|(key, value)| (key, TagValue::from(value)))
            .collect();

        Ok(MetadataRecord { tags })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: TagValue) {
        self.tags.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Warning text exiftool attached to this file, if any.
    pub fn warning(&self) -> Option<String> {
        self.get(WARNING_TAG).map(|v| v.render("; "))
    }

    /// Add a bare `Tag` key for every `GROUP:Tag` key, carrying the same value.
    ///
    /// Keys are visited in sorted order and a later group overwrites an
    /// earlier one, so `XMP:City` beats `IPTC:City`. A bare key produced here
    /// also replaces a bare key that came from exiftool directly.
    pub fn normalize(&mut self) {
        let bare: Vec<(String, TagValue)> = self
            .tags
            .iter()
            .filter_map(|(key, value)| {
                let (_, tag) = key.rsplit_once(':')?;
                if tag.is_empty() {
                    return None;
                }
                Some((tag.to_string(), value.clone()))
            })
            .collect();

        for (tag, value) in bare {
            self.tags.insert(tag, value);
        }
    }

    /// Consuming form of [`MetadataRecord::normalize`].
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

impl<K: Into<String>> FromIterator<(K, TagValue)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, TagValue)>>(iter: I) -> Self {
        MetadataRecord {
            tags: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Source of per-file metadata. The real one talks to exiftool; tests hand in
/// fixed records.
pub trait MetadataExtractor {
    fn extract(&mut self, file_path: &Path) -> Result<MetadataRecord, Exif2XattrError>;
}

/// Resolve the exiftool binary: the explicit path when given, else a $PATH
/// search.
pub fn find_exiftool(explicit: Option<&Path>) -> Result<PathBuf, Exif2XattrError> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(Exif2XattrError::ExifToolMissing {
            path: path.to_path_buf(),
        }),
        None => which::which(EXIFTOOL_BINARY).map_err(Exif2XattrError::ExifToolNotFound),
    }
}

/// Extractor backed by one long-running exiftool process.
pub struct ExifToolExtractor {
    exiftool: ExifTool,
}

impl ExifToolExtractor {
    pub fn new(exiftool_path: &Path) -> Result<Self, Exif2XattrError> {
        let exiftool =
            ExifTool::with_executable(exiftool_path).map_err(|e| Exif2XattrError::ExifToolStart {
                path: exiftool_path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(ExifToolExtractor { exiftool })
    }
}

impl MetadataExtractor for ExifToolExtractor {
    fn extract(&mut self, file_path: &Path) -> Result<MetadataRecord, Exif2XattrError> {
        let file_path_str = file_path
            .to_str()
            .ok_or_else(|| Exif2XattrError::extraction(file_path, "file path contains invalid UTF-8"))?;

        // -G prefixes every tag with its group, e.g. IPTC:Keywords
        let args = ["-G", file_path_str];
        debug!(file = %file_path.display(), ?args, "running exiftool");

        let output = self
            .exiftool
            .json_execute(&args)
            .map_err(|e| Exif2XattrError::extraction(file_path, e))?;

        parse_exiftool_output(file_path, output)
    }
}

/// Turn the JSON array exiftool prints for a single file into a record.
pub fn parse_exiftool_output(file_path: &Path, output: Value) -> Result<MetadataRecord, Exif2XattrError> {
    let first = match output {
        Value::Array(items) => items.into_iter().next(),
        object @ Value::Object(_) => Some(object),
        _ => None,
    }
    .ok_or_else(|| Exif2XattrError::extraction(file_path, "no metadata returned from exiftool"))?;

    let record =
        MetadataRecord::from_json(first).map_err(|e| Exif2XattrError::extraction(file_path, e))?;

    if let Some(error) = record.get(ERROR_TAG) {
        return Err(Exif2XattrError::extraction(file_path, error.render("; ")));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_adds_bare_keys() {
        let record: MetadataRecord = [
            ("IPTC:Keywords", TagValue::list(["a", "b"])),
            ("XMP:Title", TagValue::text("t")),
        ]
        .into_iter()
        .collect();

        let normalized = record.clone().normalized();

        for (key, value) in record.iter() {
            assert_eq!(normalized.get(key), Some(value));
        }
        assert_eq!(normalized.get("Keywords"), Some(&TagValue::list(["a", "b"])));
        assert_eq!(normalized.get("Title"), Some(&TagValue::text("t")));
        assert_eq!(normalized.len(), 4);
    }

    #[test]
    fn test_normalize_collision_is_deterministic() {
        let build = || -> MetadataRecord {
            [
                ("XMP:City", TagValue::text("Y")),
                ("IPTC:City", TagValue::text("X")),
            ]
            .into_iter()
            .collect()
        };

        let first = build().normalized();
        let second = build().normalized();
        assert_eq!(first.get("City"), second.get("City"));

        // sorted key order: IPTC:City, then XMP:City, last one wins
        assert_eq!(first.get("City"), Some(&TagValue::text("Y")));
    }

    #[test]
    fn test_normalize_overwrites_existing_bare_key() {
        let mut record: MetadataRecord = [
            ("Title", TagValue::text("raw")),
            ("XMP:Title", TagValue::text("grouped")),
        ]
        .into_iter()
        .collect();
        record.normalize();
        assert_eq!(record.get("Title"), Some(&TagValue::text("grouped")));
    }

    #[test]
    fn test_normalize_strips_up_to_last_colon() {
        let mut record: MetadataRecord = [("XMP:XMP-dc:Subject", TagValue::text("s"))]
            .into_iter()
            .collect();
        record.normalize();
        assert_eq!(record.get("Subject"), Some(&TagValue::text("s")));
        assert!(!record.contains("XMP-dc:Subject"));
    }

    #[test]
    fn test_tag_value_from_json() {
        assert_eq!(TagValue::from(json!("x")), TagValue::text("x"));
        assert_eq!(TagValue::from(json!(5)), TagValue::text("5"));
        assert_eq!(TagValue::from(json!(true)), TagValue::text("true"));
        assert_eq!(TagValue::from(json!(["a", 2])), TagValue::list(["a", "2"]));
        assert_eq!(TagValue::from(Value::Null), TagValue::text(""));
    }

    #[test]
    fn test_render_and_blank() {
        let value = TagValue::list(["cat", " ", "dog "]);
        assert_eq!(value.render(","), "cat,dog");
        assert!(!value.is_blank());
        assert!(TagValue::list(["", "  "]).is_blank());
        assert!(TagValue::text("   ").is_blank());
    }

    #[test]
    fn test_parse_exiftool_output() {
        let output = json!([{
            "SourceFile": "/tmp/statue.jpg",
            "IPTC:Keywords": ["Statue", "Art"],
            "EXIF:ISO": 100,
            "ExifTool:Warning": "Bad MakerNotes"
        }]);

        let record = parse_exiftool_output(Path::new("/tmp/statue.jpg"), output).unwrap();
        assert!(!record.contains("SourceFile"));
        assert_eq!(record.get("EXIF:ISO"), Some(&TagValue::text("100")));
        assert_eq!(record.warning().as_deref(), Some("Bad MakerNotes"));
    }

    #[test]
    fn test_parse_exiftool_output_error_tag_fails() {
        let output = json!([{
            "SourceFile": "/tmp/badimage.jpeg",
            "ExifTool:Error": "File format error"
        }]);

        let err = parse_exiftool_output(Path::new("/tmp/badimage.jpeg"), output).unwrap_err();
        assert!(matches!(err, Exif2XattrError::Extraction { .. }));
        assert!(err.to_string().contains("File format error"));
    }

    #[test]
    fn test_parse_exiftool_output_empty() {
        let err = parse_exiftool_output(Path::new("x.jpg"), json!([])).unwrap_err();
        assert!(err.to_string().contains("no metadata returned"));
    }

    #[test]
    fn test_find_exiftool_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("myexiftool");
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();

        assert_eq!(find_exiftool(Some(tool.as_path())).unwrap(), tool);

        let missing = dir.path().join("missing");
        assert!(matches!(
            find_exiftool(Some(missing.as_path())),
            Err(Exif2XattrError::ExifToolMissing { .. })
        ));
    }
}
