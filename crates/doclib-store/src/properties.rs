//! The `key=value` properties format.
//!
//! One pair per line. Blank lines and lines whose first non-whitespace
//! character is `#` or `!` are comments. Keys and values are trimmed.
//! Recognized keys are `version`, `hash`, `name` and `tags.<category>`; any
//! other key is kept as is so newer files survive a load/save cycle.
//!
//! ```text
//! version=0
//! hash=blake2b:<hex-digest>
//! name=Annual report
//! tags.topic=finance,taxes
//! ```

use std::collections::{BTreeMap, BTreeSet};

use doclib_crypto::{hash_spec, ALGORITHM};
use doclib_types::DocId;

use crate::error::PropertiesError;

/// The only schema version this engine reads and writes.
pub const SCHEMA_VERSION: &str = "0";

pub const KEY_VERSION: &str = "version";
pub const KEY_HASH: &str = "hash";
pub const KEY_NAME: &str = "name";
pub const TAGS_PREFIX: &str = "tags.";

/// Tag assignment: category name to the set of tag keys.
pub type Tags = BTreeMap<String, BTreeSet<String>>;

/// Split a properties text into its `(key, value)` pairs, in file order.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, PropertiesError> {
    let mut pairs = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let (key, value) = trimmed
            .split_once('=')
            .ok_or_else(|| PropertiesError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            })?;
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

/// Render the recognized properties, one line each, newline-terminated.
///
/// Categories without values are left out entirely.
pub fn serialize(version: &str, hash: &str, name: &str, tags: &Tags) -> String {
    let mut out = String::new();
    out.push_str(&format!("{KEY_VERSION}={version}\n"));
    out.push_str(&format!("{KEY_HASH}={hash}\n"));
    out.push_str(&format!("{KEY_NAME}={name}\n"));
    for (category, values) in tags {
        if values.is_empty() {
            continue;
        }
        let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        out.push_str(&format!("{TAGS_PREFIX}{category}={joined}\n"));
    }
    out
}

/// Split a comma-separated tag list into a sorted, de-duplicated set.
fn split_csv(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decoded contents of one properties file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Properties {
    /// Digest recorded in the `hash` property.
    pub hash: DocId,
    pub name: String,
    /// Non-empty tag categories.
    pub tags: Tags,
    /// Unrecognized pairs, kept in file order.
    pub extra: Vec<(String, String)>,
}

impl Properties {
    /// Fresh properties for a newly admitted object: no tags, no extras.
    pub fn new(hash: DocId, name: impl Into<String>) -> Self {
        Self {
            hash,
            name: name.into(),
            tags: Tags::new(),
            extra: Vec::new(),
        }
    }

    /// Decode and schema-check a properties text.
    ///
    /// When a key occurs more than once the last occurrence wins.
    pub fn decode(text: &str) -> Result<Self, PropertiesError> {
        let mut version = None;
        let mut hash = None;
        let mut name = None;
        let mut tags = Tags::new();
        let mut extra = Vec::new();

        for (key, value) in parse(text)? {
            match key.as_str() {
                KEY_VERSION => version = Some(value),
                KEY_HASH => hash = Some(value),
                KEY_NAME => name = Some(value),
                _ => match key.strip_prefix(TAGS_PREFIX) {
                    Some("") => {
                        return Err(PropertiesError::Schema(format!(
                            "tag key {key:?} has no category"
                        )))
                    }
                    Some(category) => {
                        let values = split_csv(&value);
                        if values.is_empty() {
                            tags.remove(category);
                        } else {
                            tags.insert(category.to_string(), values);
                        }
                    }
                    None => extra.push((key, value)),
                },
            }
        }

        let version = version.ok_or(PropertiesError::MissingKey(KEY_VERSION))?;
        if version != SCHEMA_VERSION {
            return Err(PropertiesError::UnsupportedVersion(version));
        }
        let hash = hash.ok_or(PropertiesError::MissingKey(KEY_HASH))?;
        let hash = parse_hash_spec(&hash)?;
        let name = name.ok_or(PropertiesError::MissingKey(KEY_NAME))?;

        Ok(Self {
            hash,
            name,
            tags,
            extra,
        })
    }

    /// Encode to properties text; unrecognized pairs follow the tags.
    pub fn encode(&self) -> String {
        let mut out = serialize(SCHEMA_VERSION, &hash_spec(&self.hash), &self.name, &self.tags);
        for (key, value) in &self.extra {
            out.push_str(&format!("{key}={value}\n"));
        }
        out
    }
}

/// Parse a `blake2b:<hex>` hash property.
pub fn parse_hash_spec(spec: &str) -> Result<DocId, PropertiesError> {
    let digest = spec
        .strip_prefix(ALGORITHM)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| PropertiesError::MalformedHash(spec.to_string()))?;
    DocId::from_hex(digest).map_err(|_| PropertiesError::MalformedHash(spec.to_string()))
}
