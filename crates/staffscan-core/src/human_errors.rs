// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for musicians using the scanner.
//
// Every technical error is mapped to plain English with a clear suggestion.

use std::path::PathBuf;

use crate::error::{FailureKind, ScanError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user can fix it (retake the photo, install the engine, free disk).
    ActionRequired,
    /// Retrying the same input will fail the same way.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `ScanError` into a `HumanError`.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::ImageRead { .. } => HumanError {
            message: "We couldn't open this picture.".into(),
            suggestion: "The file may be damaged or not an image. Try saving it as a PNG or JPEG and upload it again.".into(),
            severity: Severity::Permanent,
        },

        ScanError::ImageWrite { .. } => HumanError {
            message: "We couldn't save the straightened page.".into(),
            suggestion: "Your disk may be full or read-only. Free some space and try again.".into(),
            severity: Severity::ActionRequired,
        },

        ScanError::ExternalTool(detail) => humanize_engine_error(detail),

        ScanError::MissingOutput(_) => HumanError {
            message: "No music was recognised on this page.".into(),
            suggestion: "Retake the photo with the whole page in view, flat, and in good light.".into(),
            severity: Severity::ActionRequired,
        },

        ScanError::Validation { .. } => HumanError {
            message: "The recognised score doesn't look right.".into(),
            suggestion: "The file was kept so you can inspect it. A clearer, straighter photo usually helps.".into(),
            severity: Severity::Permanent,
        },

        ScanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "We don't have permission to write the score.".into(),
                suggestion: "Check the permissions of the data directory, or pick another one with --data-dir.".into(),
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::AlreadyExists => HumanError {
                message: "A score with this name already exists.".into(),
                suggestion: "Rename the image before uploading it, or remove the older score.".into(),
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                severity: Severity::ActionRequired,
            },
        },

        ScanError::Config(detail) => HumanError {
            message: "The settings file has a problem.".into(),
            suggestion: format!("Fix or delete the settings file to use the defaults. ({detail})"),
            severity: Severity::ActionRequired,
        },

        ScanError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            severity: Severity::Permanent,
        },
    }
}

/// Humanize a failure already folded into a result, where only its kind and
/// message survive.
pub fn humanize_failure(kind: FailureKind, detail: &str) -> HumanError {
    match kind {
        FailureKind::ImageRead => humanize_error(&ScanError::ImageRead {
            path: PathBuf::new(),
            reason: detail.into(),
        }),
        FailureKind::ExternalTool => humanize_engine_error(detail),
        FailureKind::MissingOutput => humanize_error(&ScanError::MissingOutput(PathBuf::new())),
        FailureKind::Validation => humanize_error(&ScanError::Validation {
            path: PathBuf::new(),
            reason: detail.into(),
        }),
        FailureKind::Io => humanize_error(&ScanError::Io(std::io::Error::other(detail.to_owned()))),
    }
}

/// Parse engine failure details into human-readable messages.
fn humanize_engine_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("could not launch") {
        HumanError {
            message: "The music recognition engine isn't installed.".into(),
            suggestion: "Install homr (or your configured engine) and make sure it is on your PATH, or pass --engine.".into(),
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("timed out") {
        HumanError {
            message: "Music recognition took too long and was stopped.".into(),
            suggestion: "Try a smaller or clearer image, or raise the limit with --engine-timeout.".into(),
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The music recognition engine failed on this page.".into(),
            suggestion: format!("Check the engine log in the job's working directory. (Detail: {detail})"),
            severity: Severity::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_engine_is_action_required() {
        let err = ScanError::ExternalTool("could not launch homr: No such file or directory".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("isn't installed"));
    }

    #[test]
    fn engine_timeout_mentions_limit_flag() {
        let err = ScanError::ExternalTool("homr timed out after 600s".into());
        assert!(humanize_error(&err).suggestion.contains("--engine-timeout"));
    }

    #[test]
    fn validation_failure_is_permanent() {
        let err = ScanError::Validation {
            path: PathBuf::from("/out/a.musicxml"),
            reason: "no measures".into(),
        };
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }

    #[test]
    fn existing_artifact_is_action_required() {
        let err = ScanError::Io(std::io::Error::new(std::io::ErrorKind::AlreadyExists, "taken"));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("already exists"));
    }

    #[test]
    fn folded_engine_failure_keeps_its_hint() {
        let human = humanize_failure(
            FailureKind::ExternalTool,
            "recognition engine failed: homr timed out after 600s",
        );
        assert!(human.suggestion.contains("--engine-timeout"));
        assert_eq!(
            humanize_failure(FailureKind::MissingOutput, "").severity,
            Severity::ActionRequired
        );
    }
}
