use std::path::Path;
use tracing::debug;

use crate::error::Exif2XattrError;
use crate::metadata::{MetadataRecord, TagValue};

/// How a resolved value is turned into attribute bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeEncoding {
    /// UTF-8 text, list items joined with the separator
    Text { separator: &'static str },
    /// Binary plist string, list items joined with the separator
    PlistString { separator: &'static str },
    /// Binary plist array of strings
    PlistArray,
}

/// One extended attribute and the normalized tags that can fill it.
#[derive(Debug, Clone, Copy)]
pub struct AttributeMapping {
    pub name: &'static str,
    /// Tried in order; the first tag present with a non-blank value wins
    pub tags: &'static [&'static str],
    pub encoding: AttributeEncoding,
}

const fn text(name: &'static str, tags: &'static [&'static str], separator: &'static str) -> AttributeMapping {
    AttributeMapping {
        name,
        tags,
        encoding: AttributeEncoding::Text { separator },
    }
}

const fn plist_string(name: &'static str, tags: &'static [&'static str]) -> AttributeMapping {
    AttributeMapping {
        name,
        tags,
        encoding: AttributeEncoding::PlistString { separator: "; " },
    }
}

const fn plist_array(name: &'static str, tags: &'static [&'static str]) -> AttributeMapping {
    AttributeMapping {
        name,
        tags,
        encoding: AttributeEncoding::PlistArray,
    }
}

const KEYWORD_TAGS: &[&str] = &["Keywords", "Subject", "CatalogSets"];
const DESCRIPTION_TAGS: &[&str] = &["Description", "Caption-Abstract", "ImageDescription", "UserComment"];
const TITLE_TAGS: &[&str] = &["Title", "ObjectName", "Headline"];
const CREATOR_TAGS: &[&str] = &["Creator", "Artist", "By-line"];
const RIGHTS_TAGS: &[&str] = &["Rights", "Copyright", "CopyrightNotice"];

/// Attributes written for every file, using the freedesktop.org names that
/// desktop indexers (Baloo, Tracker, Nextcloud tags) read.
pub const ATTRIBUTE_MAPPINGS: &[AttributeMapping] = &[
    text("user.xdg.tags", KEYWORD_TAGS, ","),
    text("user.xdg.comment", DESCRIPTION_TAGS, "; "),
    text("user.dublincore.title", TITLE_TAGS, "; "),
    text("user.dublincore.creator", CREATOR_TAGS, "; "),
    text("user.dublincore.rights", RIGHTS_TAGS, "; "),
];

/// Spotlight's own metadata attributes. Spotlight only reads
/// `com.apple.metadata:*` values stored as binary plists.
pub const SPOTLIGHT_MAPPINGS: &[AttributeMapping] = &[
    plist_array("com.apple.metadata:kMDItemKeywords", KEYWORD_TAGS),
    plist_string("com.apple.metadata:kMDItemDescription", DESCRIPTION_TAGS),
    plist_string("com.apple.metadata:kMDItemTitle", TITLE_TAGS),
    plist_array("com.apple.metadata:kMDItemAuthors", CREATOR_TAGS),
    plist_string("com.apple.metadata:kMDItemCopyright", RIGHTS_TAGS),
];

/// Mapping tables used on this platform: the freedesktop names everywhere,
/// plus the Spotlight ones on macOS.
pub fn default_mappings() -> Vec<AttributeMapping> {
    let mut mappings = ATTRIBUTE_MAPPINGS.to_vec();
    if cfg!(target_os = "macos") {
        mappings.extend_from_slice(SPOTLIGHT_MAPPINGS);
    }
    mappings
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeAssignment {
    pub name: String,
    pub value: TagValue,
    pub encoding: AttributeEncoding,
}

impl AttributeAssignment {
    /// Human-readable form of the value, as printed in verbose output.
    pub fn text(&self) -> String {
        match self.encoding {
            AttributeEncoding::Text { separator } | AttributeEncoding::PlistString { separator } => {
                self.value.render(separator)
            }
            AttributeEncoding::PlistArray => self.value.render(", "),
        }
    }

    /// Bytes stored in the attribute.
    pub fn to_bytes(&self) -> Result<Vec<u8>, plist::Error> {
        let value = match self.encoding {
            AttributeEncoding::Text { separator } => return Ok(self.value.render(separator).into_bytes()),
            AttributeEncoding::PlistString { separator } => plist::Value::String(self.value.render(separator)),
            AttributeEncoding::PlistArray => plist::Value::Array(
                self.items().into_iter().map(plist::Value::String).collect(),
            ),
        };

        let mut buf = Vec::new();
        value.to_writer_binary(&mut buf)?;
        Ok(buf)
    }

    fn items(&self) -> Vec<String> {
        let items: Vec<&str> = match &self.value {
            TagValue::Text(s) => vec![s.as_str()],
            TagValue::List(items) => items.iter().map(String::as_str).collect(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Pick attribute values out of a normalized record.
pub fn resolve_attributes(record: &MetadataRecord, mappings: &[AttributeMapping]) -> Vec<AttributeAssignment> {
    mappings
        .iter()
        .filter_map(|mapping| {
            let value = mapping
                .tags
                .iter()
                .filter_map(|tag| record.get(tag))
                .find(|value| !value.is_blank())?;

            Some(AttributeAssignment {
                name: mapping.name.to_string(),
                value: value.clone(),
                encoding: mapping.encoding,
            })
        })
        .collect()
}

/// Sink for resolved attributes. Tests record writes instead of touching the
/// filesystem.
pub trait AttributeWriter {
    fn write(&mut self, path: &Path, assignment: &AttributeAssignment) -> Result<(), Exif2XattrError>;
}

/// Writes attributes with the platform xattr calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct XattrWriter;

impl AttributeWriter for XattrWriter {
    fn write(&mut self, path: &Path, assignment: &AttributeAssignment) -> Result<(), Exif2XattrError> {
        debug!(
            file = %path.display(),
            name = %assignment.name,
            value = %assignment.text(),
            "setting extended attribute"
        );

        let bytes = assignment
            .to_bytes()
            .map_err(|source| Exif2XattrError::AttributeEncode {
                name: assignment.name.clone(),
                source,
            })?;

        xattr::set(path, &assignment.name, &bytes).map_err(|source| Exif2XattrError::AttributeWrite {
            path: path.to_path_buf(),
            name: assignment.name.clone(),
            source,
        })
    }
}
