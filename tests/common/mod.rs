//! Common test utilities for qernal integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.qernal/` directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Host that refuses connections, so no test ever reaches the network.
pub const UNREACHABLE_HOST: &str = "http://127.0.0.1:9";

/// A test environment with an isolated config directory.
///
/// The `qernal()` method returns a `Command` that sets `QERNAL_CONFIG_DIR`
/// per-invocation and clears any credential inherited from the developer's
/// shell, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with a stored credential.
    pub fn with_token(token: &str) -> Self {
        let env = Self::new();
        env.write_config(&format!("token: {}\n", token));
        env
    }

    /// Get a Command for the qernal binary with an isolated config directory.
    pub fn qernal(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_qernal"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("QERNAL_CONFIG_DIR", self.config_dir.path());
        cmd.env("QERNAL_HOST_HYDRA", UNREACHABLE_HOST);
        cmd.env("QERNAL_HOST_CHAOS", UNREACHABLE_HOST);
        cmd.env_remove("QERNAL_TOKEN");
        cmd.env_remove("QERNAL_LOG");
        cmd
    }

    /// Get the path to the config directory.
    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }

    /// Path of the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.path().join("config.yaml")
    }

    /// Write raw content to the config file with owner-only permissions.
    pub fn write_config(&self, content: &str) {
        let path = self.config_file();
        std::fs::write(&path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }
    }

    /// Read the config file.
    pub fn read_config(&self) -> String {
        std::fs::read_to_string(self.config_file()).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
