//! Single-slot backup of the live archive.

use crate::bundle::BundlePaths;
use std::fs;
use std::io;
use tracing::info;

pub fn has_backup(paths: &BundlePaths) -> bool {
    paths.backup().is_file()
}

/// Copy the live archive over any previous backup.
pub fn backup(paths: &BundlePaths) -> io::Result<()> {
    let (from, to) = (paths.archive(), paths.backup());
    let bytes = fs::copy(&from, &to)?;
    info!(from = %from.display(), to = %to.display(), bytes, "backed up archive");
    Ok(())
}

/// Copy the backup back over the live archive.
pub fn restore(paths: &BundlePaths) -> io::Result<()> {
    let (from, to) = (paths.backup(), paths.archive());
    if !from.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("backup {} not found", from.display()),
        ));
    }

    let bytes = fs::copy(&from, &to)?;
    info!(from = %from.display(), to = %to.display(), bytes, "restored archive");
    Ok(())
}
