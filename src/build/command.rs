// src/build/command.rs

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// An argv template such as `["go", "build", "-o", "{output}", "{entry}"]`.
///
/// Placeholders are substituted per argument, so paths with spaces never need
/// shell quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Human-readable form for logs.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }

    /// Substitute `{entry}` and `{output}` and build a command that runs in
    /// `cwd` with captured output.
    ///
    /// Returns `None` for an empty template.
    pub fn to_command(&self, cwd: &Path, entry: &str, output: &Path) -> Option<Command> {
        let output = output.to_string_lossy();
        let mut expanded = self
            .argv
            .iter()
            .map(|arg| arg.replace("{entry}", entry).replace("{output}", &output));

        let program = expanded.next()?;
        let mut cmd = Command::new(program);
        cmd.args(expanded)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Some(cmd)
    }
}

/// Join captured stdout and stderr into one diagnostic text.
pub fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    match (out.trim().is_empty(), err.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => out.trim_end().to_string(),
        (true, false) => err.trim_end().to_string(),
        (false, false) => format!("{}\n{}", out.trim_end(), err.trim_end()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_expand_per_argument() {
        let tpl = CommandTemplate::new(
            ["go", "build", "-o", "{output}", "{entry}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let cmd = tpl
            .to_command(Path::new("/proj"), "main.go", Path::new("/proj/my server"))
            .unwrap();
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "go");
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["build", "-o", "/proj/my server", "main.go"]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/proj")));
    }

    #[test]
    fn empty_template_has_no_command() {
        let tpl = CommandTemplate::new(Vec::new());
        assert!(tpl.to_command(Path::new("."), "main.go", Path::new("out")).is_none());
    }

    #[test]
    fn combined_output_skips_empty_streams() {
        assert_eq!(combined_output(b"", b"  \n"), "");
        assert_eq!(combined_output(b"warn\n", b""), "warn");
        assert_eq!(combined_output(b"a\n", b"b\n"), "a\nb");
    }
}
