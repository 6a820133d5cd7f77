//! Bridging loaded configuration into diagram settings.

use ditaa_config::Config;
use ditaa_diagrams::{OptionValue, RawOptions, Renderer, SiteSettings};

use crate::error::CliError;

/// Build the process-wide diagram settings from `config`.
pub(crate) fn site_settings(config: &Config) -> Result<SiteSettings, CliError> {
    let ditaa = config
        .ditaa
        .iter()
        .map(|(key, value)| Ok((key.clone(), option_value(value, key)?)))
        .collect::<Result<RawOptions, CliError>>()?;

    let debug_mode = config
        .ditaa_debug_mode
        .as_ref()
        .map(|value| option_value(value, "ditaa_debug_mode"))
        .transpose()?;

    Ok(SiteSettings {
        ditaa,
        encoding: config.encoding.clone(),
        debug_mode,
        output_directory: config.ditaa_output_directory.clone(),
    })
}

/// Locate the configured ditaa program.
pub(crate) fn renderer(config: &Config) -> Result<Renderer, CliError> {
    let build = &config.build_resolved;
    Ok(Renderer::with_command(&build.program, &build.program_args)?)
}

/// Convert a scalar TOML value.
fn option_value(value: &toml::Value, field: &str) -> Result<OptionValue, CliError> {
    match value {
        toml::Value::String(s) => Ok(OptionValue::Str(s.clone())),
        toml::Value::Integer(i) => Ok(OptionValue::Int(*i)),
        toml::Value::Float(f) => Ok(OptionValue::Float(*f)),
        toml::Value::Boolean(b) => Ok(OptionValue::Bool(*b)),
        other => Err(CliError::Validation(format!(
            "{field} must be a string, number or boolean, got {}",
            other.type_str()
        ))),
    }
}

/// Parse a `key=value` command-line option.
///
/// Values are typed by shape: `true`/`false` become booleans, integers and
/// floats become numbers, everything else stays a string.
pub(crate) fn parse_option(input: &str) -> Result<(String, OptionValue), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in '{input}'"));
    }

    let value = value.trim();
    let parsed = match value {
        "true" => OptionValue::Bool(true),
        "false" => OptionValue::Bool(false),
        _ => {
            if let Ok(i) = value.parse::<i64>() {
                OptionValue::Int(i)
            } else if let Ok(f) = value.parse::<f64>() {
                OptionValue::Float(f)
            } else {
                OptionValue::Str(value.to_owned())
            }
        }
    };

    Ok((key.to_owned(), parsed))
}
