use crate::error::ProfileError;
use crate::inject::FileKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Points at a profile file, overriding the default location.
pub const PROFILE_ENV: &str = "WATWEAK_PROFILE";

/// Saved session settings, so repeated `apply` runs after app updates need
/// no flags.
///
/// ```json
/// {
///   "version": "2.2106.10",
///   "node_integration": true,
///   "dev_tools": true,
///   "inject": [{ "path": "dark.css" }, { "path": "fonts/inter.woff2", "kind": "other" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweakProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub node_integration: bool,
    #[serde(default)]
    pub dev_tools: bool,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub inject: Vec<ProfileInjection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInjection {
    pub path: PathBuf,
    /// Inferred from the extension when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FileKind>,
}

impl TweakProfile {
    /// Load a profile; a missing file yields the defaults. Relative paths are
    /// resolved against the profile's directory.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let mut profile: Self = serde_json::from_str(&content)?;

        if let Some(dir) = path.parent() {
            profile.resolve_relative_to(dir);
        }
        Ok(profile)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        let base = dirs::config_dir()?;
        Some(base.join("watweak").join("profile.json"))
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        if let Some(base_dir) = self.base_dir.as_mut() {
            if base_dir.is_relative() {
                *base_dir = dir.join(&*base_dir);
            }
        }
        for item in &mut self.inject {
            if item.path.is_relative() {
                item.path = dir.join(&item.path);
            }
        }
    }
}
