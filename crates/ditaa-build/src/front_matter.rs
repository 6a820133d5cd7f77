//! YAML front matter of `*.ditaa` documents.
//!
//! A document may start with a `---` delimited YAML block:
//!
//! ```text
//! ---
//! permalink: /diagrams/flow.png
//! ditaa:
//!   scale: 2.0
//!   shadows: false
//! ---
//! +---+    +---+
//! | A |--->| B |
//! +---+    +---+
//! ```
//!
//! A null option (`scale: ~`) counts as unset, so the site or default value
//! applies.

use std::collections::BTreeMap;

use ditaa_diagrams::{OptionValue, RawOptions};
use serde::Deserialize;
use serde_yaml::Value;

const DELIMITER: &str = "---";

/// Front matter error.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FrontMatterError {
    /// Malformed YAML.
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    /// An option value that is not a scalar.
    #[error("ditaa.{key} must be a string, number or boolean, got {kind}")]
    InvalidOption { key: String, kind: &'static str },
}

/// Front matter fields as written.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFrontMatter {
    permalink: Option<String>,
    ditaa: Option<BTreeMap<String, Value>>,
}

/// Parsed front matter fields.
#[derive(Debug, Default)]
pub(crate) struct FrontMatter {
    /// Explicit output URL.
    pub permalink: Option<String>,
    /// Per-document ditaa options, without null entries.
    pub ditaa: Option<RawOptions>,
}

/// Split `content` into its front matter block and the remaining body.
///
/// Returns `None` for the block when the document has no front matter.
pub(crate) fn split(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = strip_delimiter_line(content) else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    // Unterminated block: treat the whole file as diagram content
    (None, content)
}

/// Parse a front matter block.
///
/// Empty blocks yield the default (no permalink, no options).
pub(crate) fn parse(block: &str) -> Result<FrontMatter, FrontMatterError> {
    let trimmed = block.trim();
    if trimmed.is_empty() {
        return Ok(FrontMatter::default());
    }

    let raw: RawFrontMatter = serde_yaml::from_str(trimmed)?;
    let ditaa = raw.ditaa.map(option_map).transpose()?;

    Ok(FrontMatter {
        permalink: raw.permalink,
        ditaa,
    })
}

/// Convert YAML option values, dropping nulls.
fn option_map(values: BTreeMap<String, Value>) -> Result<RawOptions, FrontMatterError> {
    let mut options = RawOptions::new();
    for (key, value) in values {
        if let Some(value) = option_value(&key, value)? {
            options.insert(key, value);
        }
    }
    Ok(options)
}

fn option_value(key: &str, value: Value) -> Result<Option<OptionValue>, FrontMatterError> {
    let invalid = |kind: &'static str| FrontMatterError::InvalidOption {
        key: key.to_owned(),
        kind,
    };

    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(OptionValue::Bool(b))),
        Value::Number(n) => n
            .as_i64()
            .map(OptionValue::Int)
            .or_else(|| n.as_f64().map(OptionValue::Float))
            .map(Some)
            .ok_or_else(|| invalid("an out-of-range number")),
        Value::String(s) => Ok(Some(OptionValue::Str(s))),
        Value::Sequence(_) => Err(invalid("a sequence")),
        Value::Mapping(_) => Err(invalid("a mapping")),
        Value::Tagged(_) => Err(invalid("a tagged value")),
    }
}

fn strip_delimiter_line(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}
