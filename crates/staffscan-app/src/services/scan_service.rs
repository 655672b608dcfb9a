// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan service — loads settings, prepares the data directory and owns the
// recognition pipeline for the lifetime of the process.

use std::path::{Path, PathBuf};

use staffscan_core::error::Result;
use staffscan_core::{AppConfig, ProcessingResult};
use staffscan_pipeline::Pipeline;
use tracing::{info, warn};

/// Command-line adjustments applied on top of the settings file. Never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct EngineOverrides {
    pub program: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl EngineOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(program) = &self.program {
            config.engine.program = program.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.engine.timeout_secs = secs;
        }
    }
}

pub struct ScanService {
    data_dir: PathBuf,
    config: AppConfig,
    pipeline: Pipeline,
}

impl ScanService {
    /// Initialise the service. Call once at startup.
    ///
    /// Loads `config_path` (defaults when absent), applies `overrides`,
    /// creates the data directories and writes a default settings file on
    /// first run.
    pub fn init(data_dir: &Path, config_path: &Path, overrides: &EngineOverrides) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising scan service");

        let stored = AppConfig::load(config_path)?;
        let mut config = stored.clone();
        overrides.apply(&mut config);

        let pipeline = Pipeline::from_config(data_dir, &config)?;

        if !config_path.exists() {
            match stored.save(config_path) {
                Ok(()) => info!(path = %config_path.display(), "default settings written"),
                Err(err) => warn!(error = %err, "could not write default settings"),
            }
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            pipeline,
        })
    }

    /// Process an uploaded image as-is.
    pub fn upload(&self, image: &Path) -> ProcessingResult {
        self.pipeline.process_path(image, false)
    }

    /// Normalize a photographed page, then process it.
    pub fn photo(&self, image: &Path) -> ProcessingResult {
        self.pipeline.process_path(image, true)
    }

    /// Store camera bytes and process them as a photographed page.
    pub fn photo_bytes(&self, bytes: &[u8]) -> ProcessingResult {
        self.pipeline.submit_bytes(bytes)
    }

    /// The effective settings, overrides included.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
