//! Configuration management for ditaa builds.
//!
//! Parses `ditaa.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Layout
//!
//! ```toml
//! encoding = "utf-8"               # global document encoding
//! ditaa_debug_mode = false         # legacy: same as [ditaa] debug
//! ditaa_output_directory = "/img"  # legacy: same as [ditaa] dirname
//!
//! [ditaa]                          # site-wide diagram options
//! scale = 2.0
//! shadows = false
//!
//! [build]
//! source_dir = "docs"
//! output_dir = "_site"
//! program = "ditaa"
//! program_args = []
//! ```
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `encoding`
//! - `ditaa_output_directory`
//! - `build.source_dir`
//! - `build.output_dir`
//! - `build.program`

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override document source directory.
    pub source_dir: Option<PathBuf>,
    /// Override output root.
    pub output_dir: Option<PathBuf>,
    /// Override ditaa program.
    pub program: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "ditaa.toml";

/// Default ditaa executable.
const DEFAULT_PROGRAM: &str = "ditaa";

/// Default output root, relative to the config directory.
const DEFAULT_OUTPUT_DIR: &str = "_site";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global text encoding of the documents.
    pub encoding: Option<String>,
    /// Legacy debug flag. Any value whose string form is `true` enables it.
    pub ditaa_debug_mode: Option<toml::Value>,
    /// Legacy output directory for embedded diagrams.
    pub ditaa_output_directory: Option<String>,
    /// Site-wide diagram options (the `[ditaa]` section).
    pub ditaa: BTreeMap<String, toml::Value>,
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw build configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    source_dir: Option<String>,
    output_dir: Option<String>,
    program: Option<String>,
    program_args: Option<Vec<String>>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug, Default)]
pub struct BuildConfig {
    /// Directory searched for `*.ditaa` documents.
    pub source_dir: PathBuf,
    /// Output root for rendered images.
    pub output_dir: PathBuf,
    /// Ditaa program name or path.
    pub program: String,
    /// Arguments placed before the ditaa options (e.g., `-jar ditaa.jar`).
    pub program_args: Vec<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`build.output_dir`").
        field: String,
        /// Error message (e.g., "${`OUTPUT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a value to be a TOML scalar (string, integer, float or boolean).
fn require_scalar(value: &toml::Value, field: &str) -> Result<(), ConfigError> {
    match value {
        toml::Value::String(_)
        | toml::Value::Integer(_)
        | toml::Value::Float(_)
        | toml::Value::Boolean(_) => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "{field} must be a string, number or boolean, got {}",
            other.type_str()
        ))),
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `ditaa.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.build_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.build_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(program) = &settings.program {
            self.build_resolved.program.clone_from(program);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            encoding: None,
            ditaa_debug_mode: None,
            ditaa_output_directory: None,
            ditaa: BTreeMap::new(),
            build: BuildConfigRaw::default(),
            build_resolved: BuildConfig {
                source_dir: base.to_path_buf(),
                output_dir: base.join(DEFAULT_OUTPUT_DIR),
                program: DEFAULT_PROGRAM.to_owned(),
                program_args: Vec::new(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that the program is set and that diagram options are scalars.
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_build()?;
        self.validate_ditaa()?;
        Ok(())
    }

    /// Validate build configuration.
    fn validate_build(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.build_resolved.program, "build.program")?;
        if self.build_resolved.source_dir == self.build_resolved.output_dir {
            return Err(ConfigError::Validation(
                "build.output_dir must differ from build.source_dir".to_owned(),
            ));
        }
        Ok(())
    }

    /// Validate diagram options.
    fn validate_ditaa(&self) -> Result<(), ConfigError> {
        for (key, value) in &self.ditaa {
            require_scalar(value, &format!("ditaa.{key}"))?;
        }
        if let Some(ref debug_mode) = self.ditaa_debug_mode {
            require_scalar(debug_mode, "ditaa_debug_mode")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref encoding) = self.encoding {
            self.encoding = Some(expand::expand_env(encoding, "encoding")?);
        }
        if let Some(ref dir) = self.ditaa_output_directory {
            self.ditaa_output_directory =
                Some(expand::expand_env(dir, "ditaa_output_directory")?);
        }

        let build = &mut self.build;
        if let Some(ref dir) = build.source_dir {
            build.source_dir = Some(expand::expand_env(dir, "build.source_dir")?);
        }
        if let Some(ref dir) = build.output_dir {
            build.output_dir = Some(expand::expand_env(dir, "build.output_dir")?);
        }
        if let Some(ref program) = build.program {
            build.program = Some(expand::expand_env(program, "build.program")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.build_resolved = BuildConfig {
            source_dir: resolve(self.build.source_dir.as_deref(), "."),
            output_dir: resolve(self.build.output_dir.as_deref(), DEFAULT_OUTPUT_DIR),
            program: self
                .build
                .program
                .clone()
                .unwrap_or_else(|| DEFAULT_PROGRAM.to_owned()),
            program_args: self.build.program_args.clone().unwrap_or_default(),
        };
    }
}
