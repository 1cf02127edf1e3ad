//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing `lance` CLI behavior.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
const LANCE_TIMEOUT_CONNECT_MS: &str = "2000";
const LANCE_TIMEOUT_EXIT_MS: &str = "500";
const LANCE_TIMEOUT_IPC_MS: &str = "500";
const LANCE_CONNECT_POLL_MS: &str = "5";

/// Returns the path to a binary, checking llvm-cov target directory first.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn lance_binary() -> PathBuf {
    binary_path("lance")
}

/// Returns the path to the lanced daemon binary.
pub fn lanced_binary() -> PathBuf {
    binary_path("lanced")
}

/// Create a CLI builder for `lance` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                ("LANCE_DAEMON_BINARY".into(), lanced_binary().to_string_lossy().into()),
                ("LANCE_TIMEOUT_CONNECT_MS".into(), LANCE_TIMEOUT_CONNECT_MS.into()),
                ("LANCE_TIMEOUT_EXIT_MS".into(), LANCE_TIMEOUT_EXIT_MS.into()),
                ("LANCE_TIMEOUT_IPC_MS".into(), LANCE_TIMEOUT_IPC_MS.into()),
                ("LANCE_CONNECT_POLL_MS".into(), LANCE_CONNECT_POLL_MS.into()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(lance_binary());
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        // Prevent a parent LANCE_STATE_DIR from leaking into tests.
        cmd.env_remove("LANCE_STATE_DIR");

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{}'\nstdout: {}", expected, stdout);
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(unexpected), "stdout should not contain '{}'\nstdout: {}", unexpected, stdout);
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{}'\nstderr: {}", expected, stderr);
        self
    }
}

/// Temporary isolated state directory for a test, so runs never touch a
/// developer's real `~/.local/state/lance`.
pub struct IsolatedState {
    state_dir: tempfile::TempDir,
}

impl IsolatedState {
    pub fn new() -> Self {
        Self { state_dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Run `lance` scoped to this isolated state directory.
    pub fn lance(&self) -> CliBuilder {
        cli().env("LANCE_STATE_DIR", self.path())
    }
}
