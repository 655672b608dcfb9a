// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Staffscan recognition pipeline.

use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{FailureKind, ScanError};

/// Unique identifier for one pipeline run (names its working directory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable name used for every downstream file of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// A fresh random identifier (camera captures).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derive an identifier from an uploaded file name, extension stripped.
    ///
    /// Returns `None` when the path has no usable stem.
    pub fn from_file_stem(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.trim();
        if stem.is_empty() {
            return None;
        }
        Some(Self(stem.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The same identifier with a numeric disambiguation suffix (`id-2`).
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{}", self.0, n))
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the inbound image was obtained; governs whether normalization runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// A file upload; used unchanged.
    RawUpload,
    /// A photo of a physical page; rotated, rectified and grayscaled first.
    CapturedPhoto,
}

impl ProcessingMode {
    /// Map the front end's `performProcessing` flag onto a mode.
    pub fn from_perform_processing(perform_processing: bool) -> Self {
        if perform_processing {
            Self::CapturedPhoto
        } else {
            Self::RawUpload
        }
    }
}

/// One inbound unit of work. Immutable once created.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    source: PathBuf,
    mode: ProcessingMode,
    artifact_id: ArtifactId,
}

impl ProcessingRequest {
    /// Build a request for an image already on disk.
    ///
    /// Camera captures get a generated artifact id; uploads derive theirs
    /// from the file name, falling back to a generated one.
    pub fn from_path(source: impl Into<PathBuf>, perform_processing: bool) -> Self {
        let source = source.into();
        let mode = ProcessingMode::from_perform_processing(perform_processing);
        let artifact_id = match mode {
            ProcessingMode::CapturedPhoto => ArtifactId::generate(),
            ProcessingMode::RawUpload => {
                ArtifactId::from_file_stem(&source).unwrap_or_else(ArtifactId::generate)
            }
        };
        Self {
            source,
            mode,
            artifact_id,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }
}

/// Stages of the linear pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Normalizing,
    Normalized,
    EngineInvoked,
    OutputLocated,
    Relocated,
    Validated,
    Done,
}

const SUCCESS_MESSAGE: &str = "Successfully generated a valid score file.";

/// Terminal outcome of a request. Success and error payloads never mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingResult {
    Success {
        artifact_id: ArtifactId,
        path: PathBuf,
    },
    Failure {
        kind: FailureKind,
        error: String,
    },
}

impl ProcessingResult {
    pub fn from_error(err: &ScanError) -> Self {
        Self::Failure {
            kind: err.kind(),
            error: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Final artifact location, present only on success.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Success { path, .. } => Some(path),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl Serialize for ProcessingResult {
    /// Serializes as `{"success", "path"}` or `{"error"}`, the only shape the
    /// front end relies on.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success { path, .. } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", SUCCESS_MESSAGE)?;
                map.serialize_entry("path", &path.display().to_string())?;
                map.end()
            }
            Self::Failure { error, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_derives_artifact_id_from_file_stem() {
        let req = ProcessingRequest::from_path("/uploads/nocturne.op9.png", false);
        assert_eq!(req.mode(), ProcessingMode::RawUpload);
        assert_eq!(req.artifact_id().as_str(), "nocturne.op9");
    }

    #[test]
    fn photo_gets_generated_artifact_id() {
        let a = ProcessingRequest::from_path("/uploads/page.png", true);
        let b = ProcessingRequest::from_path("/uploads/page.png", true);
        assert_eq!(a.mode(), ProcessingMode::CapturedPhoto);
        assert_ne!(a.artifact_id(), b.artifact_id());
        assert!(Uuid::parse_str(a.artifact_id().as_str()).is_ok());
    }

    #[test]
    fn upload_without_stem_falls_back_to_generated_id() {
        let req = ProcessingRequest::from_path("/", false);
        assert!(!req.artifact_id().as_str().is_empty());
    }

    #[test]
    fn success_serializes_to_success_and_path_only() {
        let result = ProcessingResult::Success {
            artifact_id: ArtifactId::from_file_stem(Path::new("song.png")).unwrap(),
            path: PathBuf::from("/out/song.musicxml"),
        };
        let json = serde_json::to_value(&result).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["path"], "/out/song.musicxml");
        assert!(obj.contains_key("success"));
    }

    #[test]
    fn failure_serializes_to_error_only() {
        let result = ProcessingResult::from_error(&ScanError::ExternalTool("exit code 1".into()));
        let json = serde_json::to_value(&result).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["error"].as_str().unwrap().contains("exit code 1"));
        assert_eq!(result.failure_kind(), Some(FailureKind::ExternalTool));
        assert!(result.path().is_none());
    }

    #[test]
    fn suffixed_artifact_id() {
        let id = ArtifactId::from_file_stem(Path::new("etude.png")).unwrap();
        assert_eq!(id.with_suffix(2).as_str(), "etude-2");
    }
}
