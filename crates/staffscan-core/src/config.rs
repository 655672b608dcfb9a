// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// What to do when the final artifact name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Pick the first free `<id>-<n>` name.
    Suffix,
    /// Fail the request with an I/O error.
    Reject,
}

/// How to launch the optical music recognition engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable name or path (looked up on `PATH`).
    pub program: String,
    /// Arguments placed before the image path.
    pub args: Vec<String>,
    /// Kill the engine after this many seconds.
    pub timeout_secs: u64,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "homr".into(),
            args: Vec::new(),
            timeout_secs: 600,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where inbound images are stored. Relative paths resolve against the
    /// data root.
    pub uploads_dir: PathBuf,
    /// Where normalized images and per-request working directories live.
    pub processed_dir: PathBuf,
    /// Where final score artifacts are placed.
    pub output_dir: PathBuf,
    /// Recognition engine invocation.
    pub engine: EngineConfig,
    /// Extension of the score file the engine writes (without the dot).
    pub score_extension: String,
    /// Behaviour when an artifact with the same id already exists.
    pub collision_policy: CollisionPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed_images"),
            output_dir: PathBuf::from("musicxml_output"),
            engine: EngineConfig::default(),
            score_extension: "musicxml".into(),
            collision_policy: CollisionPolicy::Suffix,
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(ScanError::Io(err)),
        };
        let config: Self = serde_json::from_str(&data)
            .map_err(|err| ScanError::Config(format!("{}: {}", path.display(), err)))?;
        config.check()?;
        Ok(config)
    }

    /// Persist settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn check(&self) -> Result<()> {
        if self.engine.program.trim().is_empty() {
            return Err(ScanError::Config("engine program must not be empty".into()));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ScanError::Config("engine timeout must be at least one second".into()));
        }
        let ext = self.score_extension.trim_start_matches('.');
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return Err(ScanError::Config(format!(
                "invalid score extension {:?}",
                self.score_extension
            )));
        }
        Ok(())
    }

    /// Score extension without a leading dot.
    pub fn score_extension(&self) -> &str {
        self.score_extension.trim_start_matches('.')
    }
}
