//! Running the `manifest` binary from integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One invocation of the binary built for this test run
pub struct ManifestCommand {
    cwd: PathBuf,
    args: Vec<String>,
}

impl ManifestCommand {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn run(&self) -> Result<CommandResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_manifest"))
            .args(&self.args)
            .current_dir(&self.cwd)
            .output()
            .with_context(|| format!("Failed to run manifest {:?}", self.args))?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }

    /// Run, failing with the captured output unless the exit status is zero
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.run()?;
        if !result.success {
            anyhow::bail!(
                "manifest {:?} failed\nstdout: {}\nstderr: {}",
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    /// Run, failing unless the exit status is non-zero
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.run()?;
        if result.success {
            anyhow::bail!(
                "manifest {:?} should have failed\nstdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandResult {
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// `manifest_cmd!(dir, "update", "--work")` builds a command run in `dir`
#[macro_export]
macro_rules! manifest_cmd {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::ManifestCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
