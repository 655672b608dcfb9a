// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end pipeline scenarios with scripted engines and validators.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use staffscan_core::error::Result;
use staffscan_core::{AppConfig, CollisionPolicy, FailureKind, ProcessingResult};
use staffscan_pipeline::{
    Directories, EngineOutput, MusicXmlValidator, Pipeline, RecognitionEngine, ScoreValidator,
    ValidationCheck, ValidationReport,
};

const SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Voice</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <note><pitch><step>G</step><octave>4</octave></pitch><duration>2</duration></note>
      <note><rest/><duration>2</duration></note>
    </measure>
  </part>
</score-partwise>"#;

#[derive(Clone, Copy)]
enum Behaviour {
    WriteScore,
    Exit(i32),
    WriteNothing,
}

/// Records every invocation and acts according to its script.
#[derive(Clone)]
struct ScriptedEngine {
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedEngine {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_image(&self) -> PathBuf {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn invoke(&self, image_path: &Path) -> Result<EngineOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(image_path.to_path_buf());
        let exit_code = match self.behaviour {
            Behaviour::WriteScore => {
                std::fs::write(image_path.with_extension("musicxml"), SCORE)?;
                0
            }
            Behaviour::Exit(code) => code,
            Behaviour::WriteNothing => 0,
        };
        Ok(EngineOutput {
            exit_code: Some(exit_code),
            stdout: "processing page".into(),
            stderr: if exit_code == 0 { String::new() } else { "model not found".into() },
        })
    }
}

struct FixedVerdict(bool);

impl ScoreValidator for FixedVerdict {
    fn validate(&self, _path: &Path) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();
        report.push(ValidationCheck {
            name: "fixed",
            passed: self.0,
            detail: (!self.0).then(|| "rejected by test".to_owned()),
        });
        Ok(report)
    }
}

fn build(
    root: &Path,
    engine: &ScriptedEngine,
    validator: Box<dyn ScoreValidator>,
) -> Pipeline {
    let dirs = Directories::prepare(root, &AppConfig::default()).unwrap();
    Pipeline::new(dirs, Box::new(engine.clone()), validator)
}

/// A 120 x 200 white sheet lying on a dark 200 x 300 table.
fn write_photo(path: &Path) {
    let img = RgbImage::from_fn(200, 300, |x, y| {
        if (40..160).contains(&x) && (50..250).contains(&y) {
            Rgb([240, 238, 230])
        } else {
            Rgb([35, 30, 28])
        }
    });
    img.save(path).unwrap();
}

fn error_message(result: &ProcessingResult) -> String {
    let json = serde_json::to_value(result).unwrap();
    json["error"].as_str().unwrap().to_owned()
}

#[test]
fn photo_is_normalized_recognized_and_validated() {
    let root = tempfile::tempdir().unwrap();
    let photo = root.path().join("capture.png");
    write_photo(&photo);
    let engine = ScriptedEngine::new(Behaviour::WriteScore);
    let pipeline = build(root.path(), &engine, Box::new(MusicXmlValidator::new()));

    let result = pipeline.process_path(&photo, true);

    assert!(result.is_success(), "{result:?}");
    let artifact = result.path().unwrap().to_path_buf();
    assert!(artifact.starts_with(pipeline.directories().output()));
    assert_eq!(std::fs::read_to_string(&artifact).unwrap(), SCORE);

    // The engine saw the normalized image, not the capture.
    let processed = engine.last_image();
    assert!(processed.starts_with(pipeline.directories().processed()));
    assert_eq!(processed.file_stem(), artifact.file_stem());
    let normalized = image::open(&processed).unwrap();
    assert!(matches!(normalized, DynamicImage::ImageLuma8(_)));
    // Rotated a quarter turn and cropped to the sheet: 200 wide, 120 tall.
    let (width, height) = (normalized.width() as i64, normalized.height() as i64);
    assert!((width - 200).abs() <= 3, "width {width}");
    assert!((height - 120).abs() <= 3, "height {height}");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 2);
    assert_eq!(json["path"], artifact.display().to_string());
}

#[test]
fn unreadable_photo_fails_before_engine_runs() {
    let root = tempfile::tempdir().unwrap();
    let photo = root.path().join("capture.jpg");
    std::fs::write(&photo, b"\xff\xd8 truncated").unwrap();
    let engine = ScriptedEngine::new(Behaviour::WriteScore);
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(true)));

    let result = pipeline.process_path(&photo, true);

    assert_eq!(result.failure_kind(), Some(FailureKind::ImageRead));
    assert_eq!(engine.calls(), 0);
    assert!(result.path().is_none());
}

#[test]
fn engine_failure_skips_output_discovery() {
    let root = tempfile::tempdir().unwrap();
    let upload = root.path().join("minuet.png");
    std::fs::write(&upload, b"raw bytes").unwrap();
    let engine = ScriptedEngine::new(Behaviour::Exit(1));
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(true)));

    let result = pipeline.process_path(&upload, false);

    assert_eq!(result.failure_kind(), Some(FailureKind::ExternalTool));
    assert!(error_message(&result).contains("exit code 1"));
    assert_eq!(engine.calls(), 1);
    let outputs = std::fs::read_dir(pipeline.directories().output()).unwrap().count();
    assert_eq!(outputs, 0);
}

#[test]
fn clean_exit_without_output_is_missing_output() {
    let root = tempfile::tempdir().unwrap();
    let upload = root.path().join("minuet.png");
    std::fs::write(&upload, b"raw bytes").unwrap();
    let engine = ScriptedEngine::new(Behaviour::WriteNothing);
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(true)));

    let result = pipeline.process_path(&upload, false);

    assert_eq!(result.failure_kind(), Some(FailureKind::MissingOutput));
    assert!(error_message(&result).contains("minuet.musicxml"));
}

#[test]
fn rejected_score_stays_on_disk() {
    let root = tempfile::tempdir().unwrap();
    let upload = root.path().join("minuet.png");
    std::fs::write(&upload, b"raw bytes").unwrap();
    let engine = ScriptedEngine::new(Behaviour::WriteScore);
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(false)));

    let result = pipeline.process_path(&upload, false);

    assert_eq!(result.failure_kind(), Some(FailureKind::Validation));
    assert!(result.path().is_none());
    let kept = pipeline.directories().output().join("minuet.musicxml");
    assert_eq!(std::fs::read_to_string(kept).unwrap(), SCORE);
    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("success").is_none());
    assert!(json.get("path").is_none());
}

#[test]
fn same_upload_name_twice_gets_distinct_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let first = root.path().join("a").join("song.png");
    let second = root.path().join("b").join("song.png");
    for path in [&first, &second] {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"raw").unwrap();
    }
    let engine = ScriptedEngine::new(Behaviour::WriteScore);
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(true)));

    let a = pipeline.process_path(&first, false);
    let b = pipeline.process_path(&second, false);

    let out = pipeline.directories().output();
    assert_eq!(a.path().unwrap(), out.join("song.musicxml"));
    assert_eq!(b.path().unwrap(), out.join("song-2.musicxml"));
    // Each run staged its copy in a private working directory.
    let staged: Vec<PathBuf> = std::fs::read_dir(pipeline.directories().processed())
        .unwrap()
        .map(|entry| entry.unwrap().path().join("song.png"))
        .collect();
    assert_eq!(staged.len(), 2);
    assert!(staged.iter().all(|p| p.exists()));
}

#[test]
fn reject_policy_refuses_a_taken_name() {
    let root = tempfile::tempdir().unwrap();
    let upload = root.path().join("song.png");
    std::fs::write(&upload, b"raw").unwrap();
    let engine = ScriptedEngine::new(Behaviour::WriteScore);
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(true)))
        .with_collision_policy(CollisionPolicy::Reject);

    assert!(pipeline.process_path(&upload, false).is_success());
    let again = pipeline.process_path(&upload, false);

    assert_eq!(again.failure_kind(), Some(FailureKind::Io));
    assert_eq!(
        std::fs::read_dir(pipeline.directories().output()).unwrap().count(),
        1
    );
}

#[test]
fn submitted_bytes_are_stored_and_processed_as_photo() {
    let root = tempfile::tempdir().unwrap();
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([200, 200, 200])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    let engine = ScriptedEngine::new(Behaviour::WriteScore);
    let pipeline = build(root.path(), &engine, Box::new(FixedVerdict(true)));

    let result = pipeline.submit_bytes(&bytes);

    assert!(result.is_success(), "{result:?}");
    let uploads: Vec<_> = std::fs::read_dir(pipeline.directories().uploads())
        .unwrap()
        .collect();
    assert_eq!(uploads.len(), 1);
    let normalized = image::open(engine.last_image()).unwrap();
    assert_eq!((normalized.width(), normalized.height()), (10, 20));
}

#[cfg(unix)]
#[test]
fn subprocess_engine_end_to_end() {
    use staffscan_pipeline::CommandEngine;
    use std::time::Duration;

    let root = tempfile::tempdir().unwrap();
    let fixture = root.path().join("fixture.musicxml");
    std::fs::write(&fixture, SCORE).unwrap();
    let upload = root.path().join("prelude.png");
    std::fs::write(&upload, b"raw").unwrap();

    let engine = CommandEngine::new(
        "sh",
        vec![
            "-c".into(),
            r#"cp "$0" "${1%.*}.musicxml""#.into(),
            fixture.display().to_string(),
        ],
        Duration::from_secs(30),
    );
    let dirs = Directories::prepare(root.path(), &AppConfig::default()).unwrap();
    let pipeline = Pipeline::new(dirs, Box::new(engine), Box::new(MusicXmlValidator::new()));

    let result = pipeline.process_path(&upload, false);

    assert!(result.is_success(), "{result:?}");
    assert!(result.path().unwrap().ends_with("prelude.musicxml"));
}
