//! Stand-ins for the ditaa executable used by unit tests.
//!
//! Scripts are run through `sh` rather than executed directly, so writing a
//! script never races with another test spawning a process.

use std::fs;
use std::path::{Path, PathBuf};

use crate::renderer::Renderer;

/// Copy the input file to the output file (the last two arguments).
const COPYING: &str = r#"
while [ "$#" -gt 2 ]; do shift; done
cp "$1" "$2"
"#;

/// Write every argument, one per line, into the output file.
const RECORDING: &str = r#"
for arg in "$@"; do out="$arg"; done
printf '%s\n' "$@" > "$out"
"#;

/// Produce nothing and fail.
const FAILING: &str = r#"
echo "syntax error" >&2
exit 1
"#;

/// Note the input path (and whether it exists) in `ditaa-input`, then fail.
const NOTING_INPUT_THEN_FAILING: &str = r#"
while [ "$#" -gt 2 ]; do shift; done
printf '%s\n' "$1" > "$(dirname "$0")/ditaa-input"
if [ -f "$1" ]; then echo present >> "$(dirname "$0")/ditaa-input"; fi
echo "syntax error" >&2
exit 1
"#;

/// Produce the output and still exit with failure.
const COPYING_THEN_FAILING: &str = r#"
while [ "$#" -gt 2 ]; do shift; done
cp "$1" "$2"
exit 3
"#;

/// Fake ditaa that records how many times it ran.
pub(crate) struct FakeDitaa {
    renderer: Renderer,
    calls_file: PathBuf,
    input_file: PathBuf,
}

impl FakeDitaa {
    pub(crate) fn copying(dir: &Path) -> Self {
        Self::new(dir, COPYING)
    }

    pub(crate) fn recording(dir: &Path) -> Self {
        Self::new(dir, RECORDING)
    }

    pub(crate) fn failing(dir: &Path) -> Self {
        Self::new(dir, FAILING)
    }

    pub(crate) fn copying_then_failing(dir: &Path) -> Self {
        Self::new(dir, COPYING_THEN_FAILING)
    }

    pub(crate) fn noting_input_then_failing(dir: &Path) -> Self {
        Self::new(dir, NOTING_INPUT_THEN_FAILING)
    }

    fn new(dir: &Path, body: &str) -> Self {
        let calls_file = dir.join("ditaa-calls");
        let script = dir.join("fake-ditaa.sh");
        let counter = format!("echo run >> '{}'\n", calls_file.display());
        fs::write(&script, format!("{counter}{body}")).unwrap();

        Self {
            renderer: Renderer::with_command("sh", [script]).unwrap(),
            calls_file,
            input_file: dir.join("ditaa-input"),
        }
    }

    pub(crate) fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Lines written by [`FakeDitaa::noting_input_then_failing`]: the input
    /// path, then `present` if the file existed while ditaa ran.
    pub(crate) fn noted_input(&self) -> Vec<String> {
        fs::read_to_string(&self.input_file)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Number of times the script has run.
    pub(crate) fn calls(&self) -> usize {
        fs::read_to_string(&self.calls_file).map_or(0, |s| s.lines().count())
    }
}

pub(crate) fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}
