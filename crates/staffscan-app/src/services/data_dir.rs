// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "staffscan";
const CONFIG_FILE: &str = "config.json";

/// Return the application data directory.
///
/// An explicit `--data-dir` wins; otherwise `$XDG_DATA_HOME/staffscan`, then
/// `~/.local/share/staffscan`. The directory is created by the pipeline when
/// it prepares its layout.
pub fn data_dir(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => base_dir(
            std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        )
        .join(APP_DIR),
    }
}

/// Default location of the settings file inside the data directory.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

fn base_dir(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Some(xdg) = xdg_data_home.filter(|p| !p.as_os_str().is_empty()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        assert_eq!(
            data_dir(Some(Path::new("/srv/scores"))),
            PathBuf::from("/srv/scores")
        );
    }

    #[test]
    fn xdg_takes_precedence_over_home() {
        let base = base_dir(Some("/xdg".into()), Some("/home/ada".into()));
        assert_eq!(base, PathBuf::from("/xdg"));
    }

    #[test]
    fn empty_xdg_falls_back_to_home() {
        let base = base_dir(Some(PathBuf::new()), Some("/home/ada".into()));
        assert_eq!(base, PathBuf::from("/home/ada/.local/share"));
    }

    #[test]
    fn config_lives_in_data_dir() {
        assert_eq!(
            config_path(Path::new("/d")),
            PathBuf::from("/d/config.json")
        );
    }
}
