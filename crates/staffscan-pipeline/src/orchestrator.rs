// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator — drives one request from received image to
// validated score artifact:
//
//   Received → [Normalizing → Normalized]? → EngineInvoked → OutputLocated
//            → Relocated → Validated → Done
//
// The first failing stage ends the run. Every failure is folded into a
// `ProcessingResult`; nothing propagates past `Pipeline::process`.

use std::path::{Path, PathBuf};

use staffscan_core::error::{Result, ScanError};
use staffscan_core::{
    AppConfig, CollisionPolicy, JobId, ProcessingMode, ProcessingRequest, ProcessingResult, Stage,
};
use staffscan_document::PageNormalizer;
use tracing::{debug, error, info, info_span, warn};

use crate::engine::{CommandEngine, RecognitionEngine};
use crate::layout::Directories;
use crate::record::JobRecord;
use crate::relocate::{locate_output, relocate_artifact};
use crate::validator::{MusicXmlValidator, ScoreValidator};

const DEFAULT_SCORE_EXTENSION: &str = "musicxml";

/// The recognition pipeline with its collaborators wired in.
///
/// Built once at startup; [`Pipeline::process`] may then be called for any
/// number of requests. Each request gets its own working directory, so
/// calls from different threads do not share intermediate files.
pub struct Pipeline {
    dirs: Directories,
    engine: Box<dyn RecognitionEngine>,
    validator: Box<dyn ScoreValidator>,
    score_extension: String,
    collision_policy: CollisionPolicy,
}

impl Pipeline {
    pub fn new(
        dirs: Directories,
        engine: Box<dyn RecognitionEngine>,
        validator: Box<dyn ScoreValidator>,
    ) -> Self {
        Self {
            dirs,
            engine,
            validator,
            score_extension: DEFAULT_SCORE_EXTENSION.to_owned(),
            collision_policy: CollisionPolicy::Suffix,
        }
    }

    /// Prepare the data directories under `root` and wire the subprocess
    /// engine and MusicXML validator from `config`.
    pub fn from_config(root: impl AsRef<Path>, config: &AppConfig) -> Result<Self> {
        config.check()?;
        let dirs = Directories::prepare(root, config)?;
        Ok(Self::new(
            dirs,
            Box::new(CommandEngine::from_config(&config.engine)),
            Box::new(MusicXmlValidator::new()),
        )
        .with_score_extension(config.score_extension())
        .with_collision_policy(config.collision_policy))
    }

    /// Extension the engine writes, without a leading dot.
    pub fn with_score_extension(mut self, extension: impl Into<String>) -> Self {
        self.score_extension = extension.into();
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn directories(&self) -> &Directories {
        &self.dirs
    }

    /// Process an image already on disk. `perform_processing` selects
    /// camera-capture normalization.
    pub fn process_path(&self, path: impl Into<PathBuf>, perform_processing: bool) -> ProcessingResult {
        self.process(&ProcessingRequest::from_path(path, perform_processing))
    }

    /// Store camera bytes in the uploads directory and process them as a
    /// captured photo.
    pub fn submit_bytes(&self, bytes: &[u8]) -> ProcessingResult {
        match self.dirs.store_upload(bytes) {
            Ok(path) => self.process_path(path, true),
            Err(err) => {
                error!(error = %err, "could not store uploaded bytes");
                ProcessingResult::from_error(&err)
            }
        }
    }

    /// Run one request to completion.
    pub fn process(&self, request: &ProcessingRequest) -> ProcessingResult {
        let job = JobId::new();
        let span = info_span!(
            "process",
            job = %job,
            artifact = %request.artifact_id(),
            mode = ?request.mode()
        );
        let _guard = span.enter();

        let mut record = JobRecord::start(job, request);
        record.mark(Stage::Received);
        info!(source = %request.source().display(), "request received");

        let workdir = match self.dirs.allocate_workdir(job) {
            Ok(dir) => dir,
            Err(err) => {
                error!(error = %err, "could not allocate working directory");
                return ProcessingResult::from_error(&err);
            }
        };

        let outcome = self.run(request, &workdir, &mut record);

        let result = match outcome {
            Ok(path) => {
                if let Err(err) = record.succeed(&path) {
                    warn!(error = %err, "could not fingerprint artifact");
                }
                info!(path = %path.display(), "score ready");
                ProcessingResult::Success {
                    artifact_id: request.artifact_id().clone(),
                    path,
                }
            }
            Err(err) => {
                error!(
                    error = %err,
                    stage = ?record.last_stage(),
                    "request failed"
                );
                record.fail(err.kind(), err.to_string());
                ProcessingResult::from_error(&err)
            }
        };

        if let Err(err) = record.write(&workdir) {
            warn!(error = %err, "could not write job record");
        }
        result
    }

    fn run(
        &self,
        request: &ProcessingRequest,
        workdir: &Path,
        record: &mut JobRecord,
    ) -> Result<PathBuf> {
        let image = match request.mode() {
            ProcessingMode::CapturedPhoto => {
                record.mark(Stage::Normalizing);
                let page = PageNormalizer::open(request.source())?.normalize();
                let target = workdir.join(format!("{}.png", request.artifact_id()));
                page.save(&target)?;
                record.mark(Stage::Normalized);
                debug!(
                    path = %target.display(),
                    rectified = page.was_rectified(),
                    "normalized image written"
                );
                target
            }
            ProcessingMode::RawUpload => stage_upload(request.source(), workdir)?,
        };

        record.mark(Stage::EngineInvoked);
        let output = self.engine.invoke(&image)?;
        if !output.succeeded() {
            error!(
                engine = self.engine.name(),
                exit_code = ?output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "recognition engine failed"
            );
            let status = match output.exit_code {
                Some(code) => format!("exit code {code}"),
                None => "termination by signal".to_owned(),
            };
            return Err(ScanError::ExternalTool(format!(
                "{} ended with {status}",
                self.engine.name()
            )));
        }
        debug!(
            engine = self.engine.name(),
            stdout = %output.stdout,
            stderr = %output.stderr,
            "recognition engine finished"
        );

        let produced = locate_output(&image, &self.score_extension)?;
        record.mark(Stage::OutputLocated);

        let artifact = relocate_artifact(
            &produced,
            self.dirs.output(),
            request.artifact_id(),
            &self.score_extension,
            self.collision_policy,
        )?;
        record.mark(Stage::Relocated);

        let report = self.validator.validate(&artifact)?;
        if !report.verdict() {
            return Err(ScanError::Validation {
                path: artifact,
                reason: report.summary(),
            });
        }
        record.mark(Stage::Validated);
        record.mark(Stage::Done);
        Ok(artifact)
    }
}

/// Copy an upload into the working directory under its own file name, so
/// the engine writes next to the copy rather than next to the original.
fn stage_upload(source: &Path, workdir: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        ScanError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} does not name a file", source.display()),
        ))
    })?;
    let staged = workdir.join(name);
    std::fs::copy(source, &staged)?;
    debug!(path = %staged.display(), "upload staged");
    Ok(staged)
}
