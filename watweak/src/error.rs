use std::path::PathBuf;
use thiserror::Error;
use watweak_common::CommonError;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("platform not supported: {os} (expected Windows or WSL)")]
    UnsupportedPlatform { os: String },
    #[error("unknown platform override '{0}' (expected 'windows' or 'wsl')")]
    UnknownOverride(String),
    #[error("could not determine the local app data directory")]
    NoLocalAppData,
}

#[derive(Debug, Error)]
pub enum TweakError {
    #[error("directory {} is not a valid WhatsApp directory", .0.display())]
    InvalidBaseDir(PathBuf),
    #[error("version {0} not found")]
    VersionNotFound(String),
    #[error("file {} not found", .0.display())]
    FileNotFound(PathBuf),
    #[error("resources directory not set (select a base directory and a version first)")]
    ResourcesDirNotSet,
    #[error("no versions installed under {}", .0.display())]
    NoVersions(PathBuf),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Inject(#[from] InjectError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] CommonError),
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("entry script {} is not valid UTF-8", .0.display())]
    Malformed(PathBuf),
    #[error("node integration pattern not found in {}", .0.display())]
    PatternNotFound(PathBuf),
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("no </head> tag in {}; injected files would not be referenced", .0.display())]
    HeadNotFound(PathBuf),
    #[error("entry page {} is not valid UTF-8", .0.display())]
    Malformed(PathBuf),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
