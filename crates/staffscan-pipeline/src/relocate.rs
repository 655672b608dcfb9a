// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output discovery and relocation of the engine's score file into the
// output directory. Existing artifacts are never overwritten.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use staffscan_core::error::{Result, ScanError};
use staffscan_core::{ArtifactId, CollisionPolicy};
use tracing::{debug, info, instrument, warn};

/// Upper bound on `-N` suffixes tried before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Where the engine is expected to write its result for `image`: same
/// directory, same stem, score extension.
pub fn expected_output_path(image: &Path, extension: &str) -> PathBuf {
    image.with_extension(extension)
}

/// Confirm the engine produced a non-empty score file next to `image`.
pub fn locate_output(image: &Path, extension: &str) -> Result<PathBuf> {
    let expected = expected_output_path(image, extension);
    match fs::metadata(&expected) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {
            debug!(path = %expected.display(), bytes = meta.len(), "engine output found");
            Ok(expected)
        }
        _ => Err(ScanError::MissingOutput(expected)),
    }
}

/// Move `source` to `<output_dir>/<artifact_id>.<extension>`.
///
/// If the destination is taken, [`CollisionPolicy::Suffix`] tries
/// `<artifact_id>-2`, `-3`, ... while [`CollisionPolicy::Reject`] fails with
/// an `AlreadyExists` I/O error.
#[instrument(skip(source, output_dir), fields(source = %source.display()))]
pub fn relocate_artifact(
    source: &Path,
    output_dir: &Path,
    artifact_id: &ArtifactId,
    extension: &str,
    policy: CollisionPolicy,
) -> Result<PathBuf> {
    for n in 1..=MAX_SUFFIX {
        let name = if n == 1 {
            artifact_id.clone()
        } else {
            artifact_id.with_suffix(n)
        };
        let dest = output_dir.join(format!("{name}.{extension}"));
        match move_no_clobber(source, &dest) {
            Ok(()) => {
                info!(dest = %dest.display(), "score artifact stored");
                return Ok(dest);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => match policy {
                CollisionPolicy::Reject => return Err(err.into()),
                CollisionPolicy::Suffix => {
                    warn!(taken = %dest.display(), "artifact name taken, trying next suffix");
                }
            },
            Err(err) => return Err(err.into()),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free artifact name for {artifact_id} in {}", output_dir.display()),
    )
    .into())
}

/// Rename without replacing an existing `dest`.
///
/// A hard link claims the name atomically; when links are not possible
/// (different filesystem) the bytes are copied into a freshly created file.
/// Once `dest` holds the bytes the move counts as done, even if the source
/// cannot be removed.
fn move_no_clobber(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(source, dest) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Err(err),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(err),
        Err(_) => {
            let mut out = OpenOptions::new().write(true).create_new(true).open(dest)?;
            let copied = File::open(source)
                .and_then(|mut input| io::copy(&mut input, &mut out))
                .and_then(|_| out.sync_all());
            if let Err(err) = copied {
                let _ = fs::remove_file(dest);
                return Err(err);
            }
        }
    }
    release_source(source, dest);
    Ok(())
}

/// Remove the engine's copy after a completed move.
fn release_source(source: &Path, dest: &Path) {
    if let Err(err) = fs::remove_file(source) {
        warn!(
            source = %source.display(),
            dest = %dest.display(),
            error = %err,
            "artifact stored but engine output left behind"
        );
    }
}
