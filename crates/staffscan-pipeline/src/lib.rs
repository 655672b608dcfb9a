// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staffscan pipeline — orchestration of normalization, the external optical
// music recognition engine, output relocation and score validation.

pub mod engine;
pub mod layout;
pub mod orchestrator;
pub mod record;
pub mod relocate;
pub mod validator;

pub use engine::{CommandEngine, EngineOutput, RecognitionEngine};
pub use layout::Directories;
pub use orchestrator::Pipeline;
pub use validator::{MusicXmlValidator, ScoreValidator, ValidationCheck, ValidationReport};
