// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job record — a `job.json` summary written into each request's working
// directory: which stages ran and when, how it ended, and a SHA-256
// fingerprint of the delivered score.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use staffscan_core::error::Result;
use staffscan_core::{ArtifactId, FailureKind, JobId, ProcessingMode, ProcessingRequest, Stage};
use tracing::debug;

/// File name of the record inside the working directory.
pub const RECORD_FILE: &str = "job.json";

/// Compute the SHA-256 hash of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A stage transition and when it happened.
#[derive(Debug, Clone, Serialize)]
pub struct StageMark {
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Success { path: PathBuf, sha256: String },
    Failure { kind: FailureKind, error: String },
}

/// Everything worth knowing about one pipeline run after the fact.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub mode: ProcessingMode,
    pub artifact_id: ArtifactId,
    pub source: PathBuf,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageMark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
}

impl JobRecord {
    pub fn start(job_id: JobId, request: &ProcessingRequest) -> Self {
        Self {
            job_id,
            mode: request.mode(),
            artifact_id: request.artifact_id().clone(),
            source: request.source().to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            outcome: None,
        }
    }

    pub fn mark(&mut self, stage: Stage) {
        self.stages.push(StageMark {
            stage,
            at: Utc::now(),
        });
    }

    pub fn last_stage(&self) -> Option<Stage> {
        self.stages.last().map(|m| m.stage)
    }

    /// Close the record with a delivered artifact, fingerprinting its bytes.
    pub fn succeed(&mut self, path: &Path) -> Result<()> {
        let sha256 = hash_bytes(&std::fs::read(path)?);
        self.outcome = Some(JobOutcome::Success {
            path: path.to_path_buf(),
            sha256,
        });
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, kind: FailureKind, error: impl Into<String>) {
        self.outcome = Some(JobOutcome::Failure {
            kind,
            error: error.into(),
        });
        self.finished_at = Some(Utc::now());
    }

    /// Write `job.json` into `workdir`, returning its path.
    pub fn write(&self, workdir: &Path) -> Result<PathBuf> {
        let path = workdir.join(RECORD_FILE);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        debug!(path = %path.display(), "job record written");
        Ok(path)
    }
}
