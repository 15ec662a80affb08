//! Finding an installation and the versions installed in it.

use crate::error::TweakError;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Marker file that identifies an installation directory.
pub const APP_EXECUTABLE: &str = "WhatsApp.exe";

/// Every version folder is named `app-<version>`.
pub const VERSION_PREFIX: &str = "app-";

pub fn is_installation(dir: &Path) -> bool {
    dir.is_dir() && dir.join(APP_EXECUTABLE).is_file()
}

pub fn validate_base_dir(dir: &Path) -> Result<PathBuf, TweakError> {
    if !is_installation(dir) {
        return Err(TweakError::InvalidBaseDir(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}

/// Version folders directly below `base`, sorted by name.
pub fn list_versions(base: &Path) -> io::Result<Vec<String>> {
    let mut versions = Vec::new();

    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(VERSION_PREFIX) {
                versions.push(name.to_string());
            }
        }
    }

    versions.sort();
    Ok(versions)
}

/// `1.2.3` and `app-1.2.3` both name the folder `app-1.2.3`.
pub fn normalize_version(version: &str) -> String {
    let version = version.trim();
    if version.starts_with(VERSION_PREFIX) {
        version.to_string()
    } else {
        format!("{VERSION_PREFIX}{version}")
    }
}

/// Newest version by semver, with folder names that don't parse ranked below
/// those that do.
pub fn latest_version(versions: &[String]) -> Option<&String> {
    versions.iter().max_by(|a, b| compare_versions(a, b))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |name: &str| {
        let bare = name.strip_prefix(VERSION_PREFIX).unwrap_or(name);
        semver::Version::parse(bare).ok()
    };

    parse(a).cmp(&parse(b)).then_with(|| a.cmp(b))
}
