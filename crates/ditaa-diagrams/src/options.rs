//! Layered option resolution.
//!
//! Options are merged from three layers, highest precedence first:
//!
//! 1. per-diagram overrides (tag attributes, document front matter)
//! 2. process-wide settings ([`SiteSettings`])
//! 3. compiled-in defaults (per [`Variant`])
//!
//! Legacy site keys (`encoding`, `ditaa_debug_mode`, `ditaa_output_directory`)
//! are applied as a fallback layer between the site options and the defaults,
//! driven by a small rule table.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::consts::{DEFAULT_DIRNAME, DEFAULT_NAME, DEFAULT_SCALE, DEFAULT_TABS};
use crate::error::DiagramError;

/// Raw, untyped option map as supplied by collaborators.
pub type RawOptions = BTreeMap<String, OptionValue>;

/// A single untyped option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Format a float the way cached file names have always spelled it:
/// integral values keep one fractional digit (`2.0`, not `2`).
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Process-wide settings shared by every diagram of a build.
#[derive(Debug, Clone, Default)]
pub struct SiteSettings {
    /// Site-wide ditaa options (the `[ditaa]` config section).
    pub ditaa: RawOptions,
    /// Global text encoding of the document pipeline.
    pub encoding: Option<String>,
    /// Legacy `ditaa_debug_mode` setting.
    pub debug_mode: Option<OptionValue>,
    /// Legacy `ditaa_output_directory` setting.
    pub output_directory: Option<String>,
}

/// Diagram variant, selecting the allowed option keys and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Diagram backed by a whole source document.
    Document,
    /// Diagram embedded in another document, addressed by content hash.
    Embedded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Flag,
    Float,
    Integer,
    Text,
}

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Bool(bool),
    Float(f64),
    Int(i64),
    Str(&'static str),
    Inherit,
}

struct OptionSpec {
    name: &'static str,
    kind: Kind,
    default: DefaultValue,
    embedded_only: bool,
}

const fn spec(name: &'static str, kind: Kind, default: DefaultValue) -> OptionSpec {
    OptionSpec {
        name,
        kind,
        default,
        embedded_only: false,
    }
}

/// Every recognized option, in declaration order.
const OPTIONS: &[OptionSpec] = &[
    spec("antialias", Kind::Flag, DefaultValue::Bool(true)),
    spec("debug", Kind::Flag, DefaultValue::Bool(false)),
    spec("separation", Kind::Flag, DefaultValue::Bool(true)),
    spec("round", Kind::Flag, DefaultValue::Bool(false)),
    spec("shadows", Kind::Flag, DefaultValue::Bool(true)),
    spec("verbose", Kind::Flag, DefaultValue::Bool(false)),
    spec("scale", Kind::Float, DefaultValue::Float(DEFAULT_SCALE)),
    spec("tabs", Kind::Integer, DefaultValue::Int(DEFAULT_TABS)),
    spec("encoding", Kind::Text, DefaultValue::Inherit),
    OptionSpec {
        name: "dirname",
        kind: Kind::Text,
        default: DefaultValue::Str(DEFAULT_DIRNAME),
        embedded_only: true,
    },
    OptionSpec {
        name: "name",
        kind: Kind::Text,
        default: DefaultValue::Str(DEFAULT_NAME),
        embedded_only: true,
    },
];

/// Long-form option names accepted as aliases of canonical keys.
const ALIASES: &[(&str, &str)] = &[
    ("output-directory-template", "dirname"),
    ("filename-template", "name"),
];

/// Map an alias to its canonical key.
fn canonical_key(key: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| canonical)
}

fn lookup(key: &str) -> Option<&'static OptionSpec> {
    OPTIONS.iter().find(|spec| spec.name == key)
}

/// Whether `key` names a boolean flag option.
#[must_use]
pub fn is_flag(key: &str) -> bool {
    lookup(canonical_key(key)).is_some_and(|spec| spec.kind == Kind::Flag)
}

impl Variant {
    /// Whether `key` (canonical name) survives resolution for this variant.
    #[must_use]
    pub fn allows(self, key: &str) -> bool {
        lookup(key).is_some_and(|spec| !spec.embedded_only || self == Self::Embedded)
    }

    /// Compiled-in defaults for this variant.
    #[must_use]
    pub fn defaults(self) -> RawOptions {
        OPTIONS
            .iter()
            .filter(|spec| self.allows(spec.name))
            .filter_map(|spec| {
                let value = match spec.default {
                    DefaultValue::Bool(b) => OptionValue::Bool(b),
                    DefaultValue::Float(x) => OptionValue::Float(x),
                    DefaultValue::Int(i) => OptionValue::Int(i),
                    DefaultValue::Str(s) => OptionValue::from(s),
                    DefaultValue::Inherit => return None,
                };
                Some((spec.name.to_owned(), value))
            })
            .collect()
    }
}

/// A legacy site setting consulted when `key` was not set explicitly.
struct FallbackRule {
    key: &'static str,
    variant: Option<Variant>,
    value: fn(&SiteSettings) -> Option<OptionValue>,
}

fn site_encoding(site: &SiteSettings) -> Option<OptionValue> {
    site.encoding.clone().map(OptionValue::Str)
}

fn legacy_debug_mode(site: &SiteSettings) -> Option<OptionValue> {
    site.debug_mode
        .as_ref()
        .map(|value| OptionValue::Bool(value.to_string() == "true"))
}

fn legacy_output_directory(site: &SiteSettings) -> Option<OptionValue> {
    site.output_directory.clone().map(OptionValue::Str)
}

const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        key: "encoding",
        variant: None,
        value: site_encoding,
    },
    FallbackRule {
        key: "debug",
        variant: None,
        value: legacy_debug_mode,
    },
    FallbackRule {
        key: "dirname",
        variant: Some(Variant::Embedded),
        value: legacy_output_directory,
    },
];

fn fallback_layer(site: &SiteSettings, variant: Variant) -> RawOptions {
    FALLBACK_RULES
        .iter()
        .filter(|rule| rule.variant.is_none_or(|v| v == variant))
        .filter_map(|rule| (rule.value)(site).map(|value| (rule.key.to_owned(), value)))
        .collect()
}

/// Merge option layers, highest precedence first, keeping only keys allowed
/// for `variant`.
///
/// For each key the first layer that sets it wins. Aliases are normalized to
/// canonical keys; unknown keys are dropped.
#[must_use]
pub fn resolve(layers: &[&RawOptions], variant: Variant) -> RawOptions {
    let mut resolved = RawOptions::new();
    for layer in layers {
        for (key, value) in *layer {
            let key = canonical_key(key);
            if variant.allows(key) {
                resolved
                    .entry(key.to_owned())
                    .or_insert_with(|| value.clone());
            }
        }
    }
    resolved
}

/// Typed, immutable options of a single diagram.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OptionSet {
    antialias: bool,
    debug: bool,
    separation: bool,
    round: bool,
    shadows: bool,
    verbose: bool,
    encoding: Option<String>,
    scale: f64,
    tabs: i64,
    dirname: Option<String>,
    name: Option<String>,
    variant: Variant,
    raw: RawOptions,
}

impl OptionSet {
    /// Resolve options for a diagram of `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] if a resolved value cannot be
    /// coerced to its declared type.
    pub fn resolve(
        site: &SiteSettings,
        overrides: &RawOptions,
        variant: Variant,
    ) -> Result<Self, DiagramError> {
        let fallbacks = fallback_layer(site, variant);
        let defaults = variant.defaults();
        let raw = resolve(&[overrides, &site.ditaa, &fallbacks, &defaults], variant);
        Self::from_raw(raw, variant)
    }

    fn from_raw(raw: RawOptions, variant: Variant) -> Result<Self, DiagramError> {
        let flag = |key: &str| raw.get(key).map_or(Ok(false), |v| coerce_bool(key, v));
        let text = |key: &str| raw.get(key).map(OptionValue::to_string);

        Ok(Self {
            antialias: flag("antialias")?,
            debug: flag("debug")?,
            separation: flag("separation")?,
            round: flag("round")?,
            shadows: flag("shadows")?,
            verbose: flag("verbose")?,
            encoding: text("encoding"),
            scale: raw
                .get("scale")
                .map_or(Ok(DEFAULT_SCALE), |v| coerce_float("scale", v))?,
            tabs: raw
                .get("tabs")
                .map_or(Ok(DEFAULT_TABS), |v| coerce_int("tabs", v))?,
            dirname: text("dirname"),
            name: text("name"),
            variant,
            raw,
        })
    }

    /// Whether ditaa antialiases the image.
    pub fn antialias(&self) -> bool {
        self.antialias
    }

    /// Whether ditaa draws its debug grid.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Whether common edges of shapes are drawn separately.
    pub fn separation(&self) -> bool {
        self.separation
    }

    /// Whether corners are rounded.
    pub fn round(&self) -> bool {
        self.round
    }

    /// Whether shapes cast drop shadows.
    pub fn shadows(&self) -> bool {
        self.shadows
    }

    /// Whether ditaa runs verbosely and its output is echoed.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Text encoding of the diagram source, if any was configured.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Image scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Tab width in columns.
    pub fn tabs(&self) -> i64 {
        self.tabs
    }

    /// Output directory template (embedded diagrams only).
    pub fn dirname(&self) -> Option<&str> {
        self.dirname.as_deref()
    }

    /// Output filename template (embedded diagrams only).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rendering variant.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Merged option map after filtering, before type coercion.
    pub fn raw(&self) -> &RawOptions {
        &self.raw
    }
}

fn configuration_error(key: &str, expected: &'static str, value: &OptionValue) -> DiagramError {
    DiagramError::Configuration {
        key: key.to_owned(),
        expected,
        value: value.to_string(),
    }
}

fn coerce_bool(key: &str, value: &OptionValue) -> Result<bool, DiagramError> {
    match value {
        OptionValue::Bool(b) => Ok(*b),
        OptionValue::Int(0) => Ok(false),
        OptionValue::Int(1) => Ok(true),
        OptionValue::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(configuration_error(key, "a boolean", value)),
        },
        _ => Err(configuration_error(key, "a boolean", value)),
    }
}

#[allow(clippy::cast_precision_loss)]
fn coerce_float(key: &str, value: &OptionValue) -> Result<f64, DiagramError> {
    let parsed = match value {
        OptionValue::Float(x) => Some(*x),
        OptionValue::Int(i) => Some(*i as f64),
        OptionValue::Str(s) => s.trim().parse::<f64>().ok(),
        OptionValue::Bool(_) => None,
    };
    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| configuration_error(key, "a number", value))
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_int(key: &str, value: &OptionValue) -> Result<i64, DiagramError> {
    let truncate = |x: f64| x.is_finite().then(|| x.trunc() as i64);
    let parsed = match value {
        OptionValue::Int(i) => Some(*i),
        OptionValue::Float(x) => truncate(*x),
        OptionValue::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        OptionValue::Bool(_) => None,
    };
    parsed.ok_or_else(|| configuration_error(key, "an integer", value))
}
