// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory layout — uploads, processed images and final score artifacts,
// plus one working directory per request.

use std::path::{Path, PathBuf};

use staffscan_core::error::Result;
use staffscan_core::{AppConfig, JobId};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// The three persistent directories the pipeline reads and writes.
///
/// Created once at startup and handed to the orchestrator; never torn down
/// during normal operation.
#[derive(Debug, Clone)]
pub struct Directories {
    uploads: PathBuf,
    processed: PathBuf,
    output: PathBuf,
}

impl Directories {
    /// Resolve the configured directories against `root` and create any that
    /// are missing.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn prepare(root: impl AsRef<Path>, config: &AppConfig) -> Result<Self> {
        let root = root.as_ref();
        let dirs = Self {
            uploads: root.join(&config.uploads_dir),
            processed: root.join(&config.processed_dir),
            output: root.join(&config.output_dir),
        };
        for dir in [&dirs.uploads, &dirs.processed, &dirs.output] {
            std::fs::create_dir_all(dir)?;
        }
        info!(
            uploads = %dirs.uploads.display(),
            processed = %dirs.processed.display(),
            output = %dirs.output.display(),
            "data directories ready"
        );
        Ok(dirs)
    }

    pub fn uploads(&self) -> &Path {
        &self.uploads
    }

    pub fn processed(&self) -> &Path {
        &self.processed
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Create the private working directory for one request.
    ///
    /// Fails if the directory already exists, so two requests never share
    /// intermediate files.
    pub fn allocate_workdir(&self, job: JobId) -> Result<PathBuf> {
        let dir = self.processed.join(job.to_string());
        std::fs::create_dir(&dir)?;
        debug!(path = %dir.display(), "working directory allocated");
        Ok(dir)
    }

    /// Store camera bytes in the uploads directory under a fresh name.
    pub fn store_upload(&self, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.uploads.join(format!("{}.png", Uuid::new_v4()));
        std::fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "upload stored");
        Ok(path)
    }
}
