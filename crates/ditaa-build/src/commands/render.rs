//! `ditaa-build render` command implementation.

use std::io;
use std::path::PathBuf;

use clap::Args;
use ditaa_config::{CliSettings, Config};
use ditaa_diagrams::{
    Diagram, EmbeddedDiagram, OptionValue, RawOptions, RenderOutcome, ReturnForm,
};

use crate::error::CliError;
use crate::output::Output;
use crate::settings::{self, parse_option};

/// Arguments for the render command.
#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct RenderArgs {
    /// Diagram source file (default: read stdin).
    input: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover ditaa.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output root for rendered images (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ditaa program (overrides config).
    #[arg(long, env = "DITAA")]
    program: Option<String>,

    /// Diagram option as key=value (repeatable).
    #[arg(
        short = 'O',
        long = "option",
        value_name = "KEY=VALUE",
        value_parser = parse_option
    )]
    options: Vec<(String, OptionValue)>,

    /// What to print: `url` (also `uri`, `href`) or the image tag (default).
    #[arg(short, long = "return", value_name = "FORM")]
    return_form: Option<String>,

    /// Print the diagram summary as JSON.
    #[arg(long, conflicts_with = "return_form")]
    json: bool,

    /// Enable antialiasing.
    #[arg(long)]
    antialias: bool,
    /// Disable antialiasing.
    #[arg(long, conflicts_with = "antialias")]
    no_antialias: bool,

    /// Enable ditaa debug output.
    #[arg(long)]
    debug: bool,
    /// Disable ditaa debug output.
    #[arg(long, conflicts_with = "debug")]
    no_debug: bool,

    /// Separate common edges of shapes.
    #[arg(long)]
    separation: bool,
    /// Do not separate common edges of shapes.
    #[arg(long, conflicts_with = "separation")]
    no_separation: bool,

    /// Round corners.
    #[arg(long)]
    round: bool,
    /// Square corners.
    #[arg(long, conflicts_with = "round")]
    no_round: bool,

    /// Draw drop shadows.
    #[arg(long)]
    shadows: bool,
    /// Omit drop shadows.
    #[arg(long, conflicts_with = "shadows")]
    no_shadows: bool,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let content = match &self.input {
            Some(path) => std::fs::read_to_string(path)?,
            None => io::read_to_string(io::stdin())?,
        };
        let overrides = self.overrides();
        let form = self.return_form();

        let cli_settings = CliSettings {
            output_dir: self.output_dir,
            program: self.program,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let root = &config.build_resolved.output_dir;

        let site = settings::site_settings(&config)?;
        let renderer = settings::renderer(&config)?;
        let diagram = EmbeddedDiagram::new(&renderer, &site, content, &overrides)?;

        match diagram.render(root) {
            RenderOutcome::Written => output.info(&format!(
                "Rendered {}",
                diagram.destination(root).display()
            )),
            RenderOutcome::Skipped => output.detail(&format!(
                "Up to date: {}",
                diagram.destination(root).display()
            )),
            RenderOutcome::Failed => {
                return Err(CliError::RenderFailed {
                    failed: 1,
                    total: 1,
                });
            }
        }

        let result = if self.json {
            serde_json::to_string_pretty(&diagram.info())?
        } else {
            diagram.output(form)
        };
        output.result(&result)?;
        Ok(())
    }

    /// Per-call options: `--option` pairs first, then explicit flag switches.
    fn overrides(&self) -> RawOptions {
        let mut overrides: RawOptions = self.options.iter().cloned().collect();

        let flags = [
            ("antialias", switch(self.antialias, self.no_antialias)),
            ("debug", switch(self.debug, self.no_debug)),
            ("separation", switch(self.separation, self.no_separation)),
            ("round", switch(self.round, self.no_round)),
            ("shadows", switch(self.shadows, self.no_shadows)),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                overrides.insert(key.to_owned(), OptionValue::Bool(value));
            }
        }

        overrides
    }

    fn return_form(&self) -> ReturnForm {
        let Ok(form) = self.return_form.as_deref().unwrap_or_default().parse();
        form
    }
}

/// Resolve a `--flag`/`--no-flag` pair.
fn switch(on: bool, off: bool) -> Option<bool> {
    off.then_some(false).or(on.then_some(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RenderArgs,
    }

    fn parse(args: &[&str]) -> RenderArgs {
        Harness::try_parse_from(std::iter::once("render").chain(args.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_switch() {
        assert_eq!(switch(false, false), None);
        assert_eq!(switch(true, false), Some(true));
        assert_eq!(switch(false, true), Some(false));
    }

    #[test]
    fn test_overrides_from_options_and_flags() {
        let args = parse(&[
            "-O",
            "scale=2.0",
            "--option",
            "name=x.png",
            "--no-shadows",
            "--round",
        ]);

        let overrides = args.overrides();

        assert_eq!(
            overrides,
            [
                ("name".to_owned(), OptionValue::from("x.png")),
                ("round".to_owned(), OptionValue::Bool(true)),
                ("scale".to_owned(), OptionValue::Float(2.0)),
                ("shadows".to_owned(), OptionValue::Bool(false)),
            ]
            .into()
        );
    }

    #[test]
    fn test_flags_override_option_pairs() {
        let args = parse(&["-O", "shadows=true", "--no-shadows"]);
        assert_eq!(
            args.overrides().get("shadows"),
            Some(&OptionValue::Bool(false))
        );
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        let result = Harness::try_parse_from(["render", "--shadows", "--no-shadows"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_option_rejected() {
        let result = Harness::try_parse_from(["render", "-O", "scale"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_return_form() {
        assert_eq!(parse(&[]).return_form(), ReturnForm::ImageTag);
        assert_eq!(parse(&["--return", "url"]).return_form(), ReturnForm::Url);
        assert_eq!(parse(&["-r", "HREF"]).return_form(), ReturnForm::Url);
        assert_eq!(parse(&["-r", "img"]).return_form(), ReturnForm::ImageTag);
    }

    #[test]
    fn test_input_file() {
        let args = parse(&["diagram.txt"]);
        assert_eq!(args.input, Some(PathBuf::from("diagram.txt")));
        assert!(parse(&[]).input.is_none());
    }
}
