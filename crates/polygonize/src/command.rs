//! Building and running the gdal_polygonize command line.

use crate::connectivity::Connectivity;
use crate::locator::ToolInstall;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// OGR driver the tool is asked to write
pub const OUTPUT_FORMAT: &str = "ESRI Shapefile";

/// One invocation of the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub env_scripts: Vec<PathBuf>,
    pub entry_point: PathBuf,
    pub connectivity: Connectivity,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ToolCommand {
    pub fn new(install: &ToolInstall, connectivity: Connectivity, input: &Path, output: &Path) -> Self {
        Self {
            env_scripts: install.env_scripts.clone(),
            entry_point: install.entry_point.clone(),
            connectivity,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }
    }

    /// The exact line handed to the shell:
    ///
    /// ```text
    /// "env1" & "env2" & "tool" [-8 ]"input" -f "ESRI Shapefile" "output" -q
    /// ```
    ///
    /// Every path is double-quoted, so paths with spaces survive. Paths
    /// containing a double quote are not supported.
    pub fn command_line(&self) -> String {
        let mut line = String::new();
        for script in &self.env_scripts {
            line.push_str(&quoted(script));
            line.push_str(" & ");
        }
        line.push_str(&quoted(&self.entry_point));
        line.push(' ');
        line.push_str(self.connectivity.flag());
        line.push_str(&quoted(&self.input));
        line.push_str(" -f \"");
        line.push_str(OUTPUT_FORMAT);
        line.push_str("\" ");
        line.push_str(&quoted(&self.output));
        line.push_str(" -q");
        line
    }
}

fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

/// What a finished run printed and how it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// Captured output, prefixed for appending to an error message.
    /// Empty when the tool printed nothing.
    pub fn diagnostics(&self) -> String {
        let mut text = String::new();
        for stream in [self.stderr.trim(), self.stdout.trim()] {
            if !stream.is_empty() {
                text.push('\n');
                text.push_str(stream);
            }
        }
        text
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Executes a [`ToolCommand`] and waits for it to finish.
pub trait CommandRunner {
    /// Run to completion. An `Err` means the command could not be started;
    /// a failing tool is reported through [`ToolOutput::status`].
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        (**self).run(command)
    }
}

/// Runs commands through the platform shell (`cmd` on Windows, `sh`
/// elsewhere) so that the environment scripts chain with `&`.
///
/// Only `cmd` runs the chain in sequence within one process, so variables a
/// `.bat` script sets are seen by the tool. Under `sh` each `&` starts the
/// script in the background as its own process: nothing it exports reaches
/// the tool, which sees the caller's environment only. Unix layouts should
/// leave [`ToolLayout::env_scripts`](crate::ToolLayout::env_scripts) empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        let line = command.command_line();
        tracing::debug!("Running: {}", line);
        shell(&line).output().map(ToolOutput::from)
    }
}

#[cfg(windows)]
fn shell(line: &str) -> Command {
    use std::os::windows::process::CommandExt;

    // /S makes cmd strip exactly the outer quote pair and keep the rest
    let mut cmd = Command::new("cmd");
    cmd.raw_arg("/S /C").raw_arg(format!("\"{line}\""));
    cmd
}

#[cfg(not(windows))]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(connectivity: Connectivity, env_scripts: Vec<PathBuf>) -> ToolCommand {
        ToolCommand {
            env_scripts,
            entry_point: PathBuf::from("/usr/bin/gdal_polygonize.py"),
            connectivity,
            input: PathBuf::from("/data/land cover.tif"),
            output: PathBuf::from("/tmp/polygonize_ab12.shp"),
        }
    }

    #[test]
    fn test_four_connected_line() {
        assert_eq!(
            command(Connectivity::Four, Vec::new()).command_line(),
            r#""/usr/bin/gdal_polygonize.py" "/data/land cover.tif" -f "ESRI Shapefile" "/tmp/polygonize_ab12.shp" -q"#
        );
    }

    #[test]
    fn test_eight_connected_line() {
        assert_eq!(
            command(Connectivity::Eight, Vec::new()).command_line(),
            r#""/usr/bin/gdal_polygonize.py" -8 "/data/land cover.tif" -f "ESRI Shapefile" "/tmp/polygonize_ab12.shp" -q"#
        );
    }

    #[test]
    fn test_env_scripts_chain() {
        let cmd = command(
            Connectivity::Four,
            vec![PathBuf::from("C:/OSGeo4W64/bin/o4w_env.bat"), PathBuf::from("C:/OSGeo4W64/bin/py3_env.bat")],
        );
        assert!(cmd.command_line().starts_with(
            r#""C:/OSGeo4W64/bin/o4w_env.bat" & "C:/OSGeo4W64/bin/py3_env.bat" & "/usr/bin/gdal_polygonize.py" "#
        ));
    }

    #[test]
    fn test_from_install() {
        let install = ToolInstall {
            root: PathBuf::from("/usr"),
            entry_point: PathBuf::from("/usr/bin/gdal_polygonize"),
            env_scripts: Vec::new(),
        };
        let cmd = ToolCommand::new(&install, Connectivity::Eight, Path::new("a.tif"), Path::new("b.shp"));
        assert_eq!(cmd.entry_point, install.entry_point);
        assert_eq!(cmd.command_line(), r#""/usr/bin/gdal_polygonize" -8 "a.tif" -f "ESRI Shapefile" "b.shp" -q"#);
    }

    #[test]
    fn test_diagnostics() {
        let out = ToolOutput {
            status: Some(1),
            stdout: "0...10...\n".into(),
            stderr: "ERROR 4: no such file\n".into(),
        };
        assert!(!out.success());
        assert_eq!(out.status_text(), "exit status 1");
        assert_eq!(out.diagnostics(), "\nERROR 4: no such file\n0...10...");
        assert_eq!(ToolOutput::default().diagnostics(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("echo tool.sh");
        std::fs::write(&tool, "#!/bin/sh\necho \"$@\"\necho oops >&2\nexit 3\n").unwrap();
        let cmd = ToolCommand {
            env_scripts: Vec::new(),
            entry_point: PathBuf::from("sh"),
            connectivity: Connectivity::Four,
            input: tool,
            output: PathBuf::from("out.shp"),
        };
        // `"sh" "<script>" -f ... -q` runs the script with the remaining args
        let out = ShellRunner.run(&cmd).unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stdout.trim(), "-f ESRI Shapefile out.shp -q");
        assert_eq!(out.stderr.trim(), "oops");
    }
}
