use crate::inject::FileKind;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ARCHIVE_NAME: &str = "app.asar";
pub const BACKUP_NAME: &str = "app.asar.backup";
pub const SCRATCH_DIR: &str = "temp";
pub const ENTRY_SCRIPT: &str = "main.js";
pub const ENTRY_PAGE: &str = "index.html";
pub const INJECTED_DIR: &str = "injected";

/// Paths inside the `resources` directory of one installed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundlePaths {
    pub resources: PathBuf,
}

impl BundlePaths {
    pub fn new(base_dir: &Path, version: &str) -> Self {
        Self {
            resources: base_dir.join(version).join("resources"),
        }
    }

    pub fn archive(&self) -> PathBuf {
        self.resources.join(ARCHIVE_NAME)
    }

    pub fn backup(&self) -> PathBuf {
        self.resources.join(BACKUP_NAME)
    }

    pub fn scratch(&self) -> PathBuf {
        self.resources.join(SCRATCH_DIR)
    }

    pub fn entry_script(&self) -> PathBuf {
        self.scratch().join(ENTRY_SCRIPT)
    }

    pub fn entry_page(&self) -> PathBuf {
        self.scratch().join(ENTRY_PAGE)
    }

    pub fn injected(&self, kind: FileKind) -> PathBuf {
        self.scratch().join(INJECTED_DIR).join(kind.dir_name())
    }
}
