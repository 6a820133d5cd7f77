//! Ditaa process invocation.
//!
//! [`Renderer`] locates the ditaa executable once and runs it for each
//! diagram that needs a (re)render. Success is judged solely by whether the
//! destination file exists afterwards; ditaa's exit status is only logged.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempPath;

use crate::consts::{DEFAULT_PROGRAM, DEFAULT_SCALE, DEFAULT_TABS};
use crate::error::DiagramError;
use crate::options::{OptionSet, format_float};

/// Tracing target of ditaa's echoed standard output (debug or verbose runs).
pub const ECHO_TARGET: &str = "ditaa::output";

/// Build the ditaa argument list for `options`.
///
/// The order is fixed: it feeds the cache key, so reordering would orphan
/// every previously rendered embedded diagram. The list always ends with
/// `-o` (overwrite the output file).
#[must_use]
#[allow(clippy::float_cmp)]
pub fn ditaa_arguments(options: &OptionSet) -> Vec<String> {
    let mut args = Vec::new();

    if options.verbose() {
        args.push("-v".to_owned());
    }
    if !options.antialias() {
        args.push("-A".to_owned());
    }
    if options.debug() {
        args.push("-d".to_owned());
    }
    if !options.separation() {
        args.push("-E".to_owned());
    }
    if let Some(encoding) = options.encoding() {
        args.push("-e".to_owned());
        args.push(encoding.to_owned());
    }
    if options.round() {
        args.push("-r".to_owned());
    }
    if options.scale() != DEFAULT_SCALE {
        args.push("-s".to_owned());
        args.push(format_float(options.scale()));
    }
    if !options.shadows() {
        args.push("-S".to_owned());
    }
    if options.tabs() != DEFAULT_TABS {
        args.push("-t".to_owned());
        args.push(options.tabs().to_string());
    }
    args.push("-o".to_owned());

    args
}

/// Handle to a located ditaa executable.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Resolved program path.
    program: PathBuf,
    /// Arguments placed before the ditaa options (e.g., `-jar ditaa.jar`).
    leading_args: Vec<OsString>,
}

impl Renderer {
    /// Locate `ditaa` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::MissingDependency`] if it cannot be found.
    pub fn locate() -> Result<Self, DiagramError> {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Locate a specific program (name on `PATH` or a path).
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::MissingDependency`] if it cannot be found.
    pub fn with_program(program: impl AsRef<OsStr>) -> Result<Self, DiagramError> {
        Self::with_command(program, Vec::<OsString>::new())
    }

    /// Locate `program` and run it with `leading_args` before the ditaa
    /// arguments, e.g. `java` with `["-jar", "/opt/ditaa.jar"]`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::MissingDependency`] if `program` cannot be found.
    pub fn with_command<I, S>(
        program: impl AsRef<OsStr>,
        leading_args: I,
    ) -> Result<Self, DiagramError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let program = program.as_ref();
        let resolved = which::which(program).map_err(|source| DiagramError::MissingDependency {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;
        tracing::debug!(program = %resolved.display(), "located ditaa");

        Ok(Self {
            program: resolved,
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        })
    }

    /// Resolved program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Render `source` to `destination` with `options`.
    ///
    /// Returns whether `destination` exists once ditaa has exited. Failures
    /// to prepare the render (temporary file, output directory, spawning) are
    /// logged and reported as `false`.
    pub fn invoke(&self, options: &OptionSet, source: &str, destination: &Path) -> bool {
        match self.run(options, source, destination) {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(
                    destination = %destination.display(),
                    "failed to run ditaa: {e}"
                );
                false
            }
        }
    }

    fn run(&self, options: &OptionSet, source: &str, destination: &Path) -> io::Result<bool> {
        let arguments = ditaa_arguments(options);
        // Removed on drop, including every early return below
        let input = write_source(source, options.encoding())?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let echo = options.debug() || options.verbose();
        tracing::info!(destination = %destination.display(), "rendering diagram");

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&arguments)
            .arg(&*input)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(if echo { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::piped())
            .output()?;

        if echo {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                tracing::info!(target: ECHO_TARGET, "{line}");
            }
        }

        let written = destination.exists();
        if written {
            tracing::debug!(status = %output.status, "ditaa finished");
        } else {
            tracing::warn!(
                status = %output.status,
                destination = %destination.display(),
                "ditaa did not produce an image: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(written)
    }
}

/// Write the diagram source to a fresh temporary file.
fn write_source(source: &str, encoding: Option<&str>) -> io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("ditaa")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(&encode_source(source, encoding))?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Encode `source` for writing in the configured text encoding.
///
/// Characters outside a single-byte charset become `?`. Unknown encodings are
/// written as UTF-8; ditaa still receives the label through `-e`.
fn encode_source<'a>(source: &'a str, encoding: Option<&str>) -> Cow<'a, [u8]> {
    let narrow = |max: char| {
        source
            .chars()
            .map(|c| {
                if c <= max {
                    u8::try_from(c).unwrap_or(b'?')
                } else {
                    b'?'
                }
            })
            .collect::<Vec<u8>>()
    };

    let label = encoding.map(|e| e.to_ascii_lowercase().replace(['-', '_'], ""));
    match label.as_deref() {
        None | Some("utf8") => Cow::Borrowed(source.as_bytes()),
        Some("ascii" | "usascii") => Cow::Owned(narrow('\u{7f}')),
        Some("latin1" | "iso88591") => Cow::Owned(narrow('\u{ff}')),
        Some(other) => {
            tracing::warn!(
                encoding = other,
                "unsupported source encoding, writing UTF-8"
            );
            Cow::Borrowed(source.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionValue, RawOptions, SiteSettings, Variant};
    use crate::testing::{FakeDitaa, args};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn options(pairs: &[(&str, OptionValue)]) -> OptionSet {
        let overrides: RawOptions = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        OptionSet::resolve(&SiteSettings::default(), &overrides, Variant::Embedded).unwrap()
    }

    #[test]
    fn test_default_arguments() {
        assert_eq!(ditaa_arguments(&options(&[])), args(&["-o"]));
    }

    #[test]
    fn test_full_argument_order() {
        let opts = options(&[
            ("verbose", true.into()),
            ("antialias", false.into()),
            ("debug", true.into()),
            ("separation", false.into()),
            ("encoding", "utf-8".into()),
            ("round", true.into()),
            ("scale", 2.0.into()),
            ("shadows", false.into()),
            ("tabs", OptionValue::Int(4)),
        ]);

        assert_eq!(
            ditaa_arguments(&opts),
            args(&[
                "-v", "-A", "-d", "-E", "-e", "utf-8", "-r", "-s", "2.0", "-S", "-t", "4", "-o",
            ])
        );
    }

    #[test]
    fn test_default_values_omitted() {
        let opts = options(&[("scale", 1.0.into()), ("tabs", OptionValue::Int(8))]);
        assert_eq!(ditaa_arguments(&opts), args(&["-o"]));
    }

    #[test]
    fn test_fractional_scale() {
        let opts = options(&[("scale", "0.5".into())]);
        assert_eq!(ditaa_arguments(&opts), args(&["-s", "0.5", "-o"]));
    }

    #[test]
    fn test_missing_program() {
        let err = Renderer::with_program("ditaa-definitely-not-installed").unwrap_err();
        assert!(matches!(err, DiagramError::MissingDependency { .. }));
        assert!(err.to_string().contains("ditaa-definitely-not-installed"));
    }

    #[test]
    fn test_encode_source() {
        assert_eq!(&*encode_source("a→b", None), "a→b".as_bytes());
        assert_eq!(&*encode_source("a→b", Some("UTF-8")), "a→b".as_bytes());
        assert_eq!(&*encode_source("déjà→", Some("ISO-8859-1")), b"d\xe9j\xe0?");
        assert_eq!(&*encode_source("déjà", Some("us-ascii")), b"d?j?");
        assert_eq!(&*encode_source("a→b", Some("shift_jis")), "a→b".as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_writes_destination() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let destination = tmp.path().join("out/nested/diagram.png");

        assert!(ditaa.renderer().invoke(&options(&[]), "A->B", &destination));
        assert_eq!(fs::read_to_string(&destination).unwrap(), "A->B");
        assert_eq!(ditaa.calls(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_passes_arguments_and_removes_input() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::recording(tmp.path());
        let destination = tmp.path().join("diagram.png");
        let opts = options(&[("scale", 2.0.into()), ("round", true.into())]);

        assert!(ditaa.renderer().invoke(&opts, "A->B", &destination));

        let recorded = fs::read_to_string(&destination).unwrap();
        let lines: Vec<&str> = recorded.lines().collect();
        let (input, output) = (lines[lines.len() - 2], lines[lines.len() - 1]);
        assert_eq!(&lines[..lines.len() - 2], ["-r", "-s", "2.0", "-o"]);
        assert_eq!(Path::new(output), destination);
        assert!(
            !Path::new(input).exists(),
            "temporary input file should be removed"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_reports_missing_output() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::failing(tmp.path());
        let destination = tmp.path().join("diagram.png");

        assert!(!ditaa.renderer().invoke(&options(&[]), "A->B", &destination));
        assert!(!destination.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_removes_input_after_failure() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::noting_input_then_failing(tmp.path());
        let destination = tmp.path().join("diagram.png");

        assert!(!ditaa.renderer().invoke(&options(&[]), "A->B", &destination));

        let noted = ditaa.noted_input();
        assert_eq!(noted.len(), 2);
        assert_eq!(noted[1], "present");
        assert!(
            !Path::new(&noted[0]).exists(),
            "temporary input file should be removed"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_trusts_existence_over_exit_status() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying_then_failing(tmp.path());
        let destination = tmp.path().join("diagram.png");

        assert!(ditaa.renderer().invoke(&options(&[]), "A->B", &destination));
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_echo_does_not_change_result() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let destination = tmp.path().join("diagram.png");
        let opts = options(&[("verbose", true.into()), ("debug", true.into())]);

        assert!(ditaa.renderer().invoke(&opts, "A->B", &destination));
    }
}
