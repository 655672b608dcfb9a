// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Staffscan.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Staffscan operations.
///
/// Every variant is terminal for the request that raised it: the pipeline
/// never retries.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Input --
    #[error("could not read image from {}: {reason}", path.display())]
    ImageRead { path: PathBuf, reason: String },

    #[error("could not write processed image to {}: {reason}", path.display())]
    ImageWrite { path: PathBuf, reason: String },

    // -- Recognition engine --
    #[error("recognition engine failed: {0}")]
    ExternalTool(String),

    #[error("recognition engine ran but did not produce a score file at {}", .0.display())]
    MissingOutput(PathBuf),

    // -- Validation --
    #[error("the generated score at {} is not valid: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },

    // -- Storage / configuration --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The stage-level classification reported alongside an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    ImageRead,
    ExternalTool,
    MissingOutput,
    Io,
    Validation,
}

impl ScanError {
    /// Map this error onto the failure kind reported to callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            ScanError::ImageRead { .. } => FailureKind::ImageRead,
            ScanError::ExternalTool(_) => FailureKind::ExternalTool,
            ScanError::MissingOutput(_) => FailureKind::MissingOutput,
            ScanError::Validation { .. } => FailureKind::Validation,
            ScanError::ImageWrite { .. }
            | ScanError::Io(_)
            | ScanError::Config(_)
            | ScanError::Serialization(_) => FailureKind::Io,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
