//! The tweak session: configuration built up through setters, then applied
//! to one installed version in a fixed order.
//!
//! `apply` runs extract → patch → inject → repack → cleanup. Nothing is rolled
//! back when a stage fails; call [`TweakSession::backup`] first if the live
//! archive must be recoverable with [`TweakSession::restore`].

use crate::backup;
use crate::bundle::BundlePaths;
use crate::error::TweakError;
use crate::inject::{self, FileKind, InjectReport, InjectedFile};
use crate::locator;
use crate::patch::{self, PatchOptions, PatchOutcome, PatchReport};
use crate::platform::HostPlatform;
use crate::profile::TweakProfile;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use watweak_common::archive;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TweakSession {
    base_dir: Option<PathBuf>,
    version: Option<String>,
    node_integration: bool,
    dev_tools: bool,
    strict: bool,
    injections: Vec<InjectedFile>,
}

/// What `apply` did.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub version: String,
    pub archive: PathBuf,
    pub files_extracted: usize,
    pub patch: PatchOutcome,
    pub injected: InjectReport,
    pub files_packed: usize,
}

impl TweakSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session from a saved profile, validating every setting the
    /// same way the setters do.
    pub fn from_profile(profile: &TweakProfile) -> Result<Self, TweakError> {
        let mut session = Self::new();

        if let Some(dir) = &profile.base_dir {
            session.set_base_dir(dir)?;
        }
        if let Some(version) = &profile.version {
            session.select_version(version)?;
        }
        if profile.node_integration {
            session.enable_node_integration();
        }
        if profile.dev_tools {
            session.enable_dev_tools();
        }
        session.set_strict(profile.strict);

        for item in &profile.inject {
            session.inject_file(&item.path, item.kind)?;
        }

        Ok(session)
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn injections(&self) -> &[InjectedFile] {
        &self.injections
    }

    pub fn node_integration(&self) -> bool {
        self.node_integration
    }

    pub fn dev_tools(&self) -> bool {
        self.dev_tools
    }

    pub fn enable_dev_tools(&mut self) {
        self.dev_tools = true;
    }

    pub fn enable_node_integration(&mut self) {
        self.node_integration = true;
    }

    /// In strict mode a missing patch target or a page without `</head>`
    /// fails the pipeline instead of being skipped.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Register a file for injection. Its kind is inferred from the
    /// extension when `kind` is `None`.
    pub fn inject_file(
        &mut self,
        path: impl AsRef<Path>,
        kind: Option<FileKind>,
    ) -> Result<(), TweakError> {
        let file = InjectedFile::from_path(path, kind)?;
        debug!(file = %file.file_name(), kind = ?file.kind, "registered injection");
        self.injections.push(file);
        Ok(())
    }

    pub fn inject_css(&mut self, path: impl AsRef<Path>) -> Result<(), TweakError> {
        self.inject_file(path, Some(FileKind::Stylesheet))
    }

    pub fn inject_js(&mut self, path: impl AsRef<Path>) -> Result<(), TweakError> {
        self.inject_file(path, Some(FileKind::Script))
    }

    pub fn set_base_dir(&mut self, dir: impl AsRef<Path>) -> Result<(), TweakError> {
        self.base_dir = Some(locator::validate_base_dir(dir.as_ref())?);
        Ok(())
    }

    pub fn use_default_base_dir(&mut self, platform: &HostPlatform) -> Result<(), TweakError> {
        self.set_base_dir(platform.default_base_dir())
    }

    /// Installed versions, read fresh from disk. Empty until a base
    /// directory is set.
    pub fn list_versions(&self) -> Result<Vec<String>, TweakError> {
        match &self.base_dir {
            Some(dir) => Ok(locator::list_versions(dir)?),
            None => Ok(Vec::new()),
        }
    }

    /// Select an installed version, with or without the `app-` prefix.
    pub fn select_version(&mut self, version: &str) -> Result<(), TweakError> {
        let version = locator::normalize_version(version);
        if !self.list_versions()?.contains(&version) {
            return Err(TweakError::VersionNotFound(version));
        }
        self.version = Some(version);
        Ok(())
    }

    /// Select the newest installed version and return its folder name.
    pub fn select_latest_version(&mut self) -> Result<String, TweakError> {
        let versions = self.list_versions()?;
        let latest = locator::latest_version(&versions).cloned().ok_or_else(|| {
            TweakError::NoVersions(self.base_dir.clone().unwrap_or_default())
        })?;
        self.version = Some(latest.clone());
        Ok(latest)
    }

    /// The resources directory of the selected version. Every operation that
    /// touches the bundle goes through here first.
    pub fn bundle(&self) -> Result<BundlePaths, TweakError> {
        match (&self.base_dir, &self.version) {
            (Some(base), Some(version)) => Ok(BundlePaths::new(base, version)),
            _ => Err(TweakError::ResourcesDirNotSet),
        }
    }

    pub fn has_backup(&self) -> bool {
        self.bundle()
            .map(|paths| backup::has_backup(&paths))
            .unwrap_or(false)
    }

    pub fn backup(&self) -> Result<(), TweakError> {
        Ok(backup::backup(&self.bundle()?)?)
    }

    pub fn restore(&self) -> Result<(), TweakError> {
        Ok(backup::restore(&self.bundle()?)?)
    }

    /// Unpack the live archive into the scratch tree.
    pub fn extract(&self) -> Result<usize, TweakError> {
        let paths = self.bundle()?;
        Ok(archive::extract_all(&paths.archive(), &paths.scratch())?)
    }

    pub fn apply_integration_patch(&self) -> Result<PatchReport, TweakError> {
        let paths = self.bundle()?;
        patch::apply_integration_patch(
            &paths,
            PatchOptions {
                node_integration: self.node_integration,
                dev_tools: self.dev_tools,
                strict: self.strict,
            },
        )
    }

    /// Inject the registered files followed by `extra`.
    pub fn inject(&self, extra: &[InjectedFile]) -> Result<InjectReport, TweakError> {
        let paths = self.bundle()?;
        let files: Vec<InjectedFile> = self
            .injections
            .iter()
            .chain(extra.iter())
            .cloned()
            .collect();
        inject::inject(&paths, &files, self.strict)
    }

    /// Pack the scratch tree over the live archive. Returns once the archive
    /// is on disk.
    pub fn repack(&self) -> Result<usize, TweakError> {
        let paths = self.bundle()?;
        Ok(archive::create_package(&paths.scratch(), &paths.archive())?)
    }

    /// Remove the scratch tree. A missing tree is not an error.
    pub fn cleanup(&self) -> Result<(), TweakError> {
        let scratch = self.bundle()?.scratch();
        match fs::remove_dir_all(&scratch) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn apply(&self) -> Result<ApplyReport, TweakError> {
        let paths = self.bundle()?;
        let version = self.version.clone().unwrap_or_default();
        info!(version = %version, resources = %paths.resources.display(), "applying tweaks");

        // Leftovers from an earlier failed run would be packed otherwise.
        self.cleanup()?;
        let files_extracted = self.extract()?;
        let patch = self.apply_integration_patch()?;
        let injected = self.inject(&patch.extra_injections)?;
        let files_packed = self.repack()?;
        self.cleanup()?;

        info!(
            version = %version,
            patch = ?patch.outcome,
            injected = injected.copied.len(),
            "tweaks applied"
        );

        Ok(ApplyReport {
            version,
            archive: paths.archive(),
            files_extracted,
            patch: patch.outcome,
            injected,
            files_packed,
        })
    }
}
