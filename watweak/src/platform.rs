//! Host platform detection and the default installation directory.
//!
//! Only two hosts can reach a WhatsApp for Windows installation: Windows
//! itself and WSL, where the Windows drive is mounted under `/mnt/c`.

use crate::error::EnvironmentError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Folder under the local app data directory that holds the installation.
pub const APP_DATA_DIR: &str = "WhatsApp";

/// Forces detection to `windows` or `wsl`.
pub const PLATFORM_OVERRIDE_ENV: &str = "WATWEAK_PLATFORM";

const WSL_WINDOWS_DRIVE: &str = "/mnt/c";
const WSL_RELEASE_FILE: &str = "/proc/sys/kernel/osrelease";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Unknown(String),
}

impl Os {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => Os::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
            Os::Unknown(value) => value.as_str(),
        }
    }
}

/// A host from which the Windows installation is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    Windows { local_app_data: PathBuf },
    Wsl { windows_user: String },
}

impl HostPlatform {
    /// Detect the current host, failing on anything that is neither Windows
    /// nor WSL.
    pub fn detect() -> Result<Self, EnvironmentError> {
        if let Ok(value) = std::env::var(PLATFORM_OVERRIDE_ENV) {
            debug!(value = %value, "platform override set");
            return Self::from_override(&value);
        }

        match Os::current() {
            Os::Windows => Self::windows(),
            Os::Linux if is_wsl() => Ok(Self::Wsl {
                windows_user: windows_user(),
            }),
            other => Err(EnvironmentError::UnsupportedPlatform {
                os: other.as_str().to_string(),
            }),
        }
    }

    pub fn from_override(value: &str) -> Result<Self, EnvironmentError> {
        match value.trim().to_lowercase().as_str() {
            "windows" => Self::windows(),
            "wsl" => Ok(Self::Wsl {
                windows_user: windows_user(),
            }),
            _ => Err(EnvironmentError::UnknownOverride(value.to_string())),
        }
    }

    fn windows() -> Result<Self, EnvironmentError> {
        dirs::data_local_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("AppData").join("Local")))
            .map(|local_app_data| Self::Windows { local_app_data })
            .ok_or(EnvironmentError::NoLocalAppData)
    }

    pub fn default_base_dir(&self) -> PathBuf {
        match self {
            HostPlatform::Windows { local_app_data } => local_app_data.join(APP_DATA_DIR),
            HostPlatform::Wsl { windows_user } => Path::new(WSL_WINDOWS_DRIVE)
                .join("Users")
                .join(windows_user)
                .join("AppData")
                .join("Local")
                .join(APP_DATA_DIR),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostPlatform::Windows { .. } => "windows",
            HostPlatform::Wsl { .. } => "wsl",
        }
    }
}

fn is_wsl() -> bool {
    if std::env::var("WSL_DISTRO_NAME").is_ok() {
        return true;
    }

    fs::read_to_string(WSL_RELEASE_FILE)
        .map(|release| is_wsl_release(&release))
        .unwrap_or(false)
}

fn is_wsl_release(release: &str) -> bool {
    let release = release.to_lowercase();
    release.contains("microsoft") || release.contains("wsl")
}

/// The Windows account name, asked over WSL interop. Falls back to the Linux
/// user name, which matches on default WSL setups.
fn windows_user() -> String {
    let mut cmd = Command::new("cmd.exe");
    cmd.args(["/C", "echo %USERNAME%"]);
    if Path::new(WSL_WINDOWS_DRIVE).is_dir() {
        // cmd.exe warns about UNC paths when started from the Linux filesystem
        cmd.current_dir(WSL_WINDOWS_DRIVE);
    }

    let from_interop = cmd
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| parse_interop_user(&String::from_utf8_lossy(&output.stdout)));

    match from_interop {
        Some(user) => user,
        None => {
            let user = whoami::username();
            debug!(user = %user, "interop user lookup failed, using linux user");
            user
        }
    }
}

fn parse_interop_user(stdout: &str) -> Option<String> {
    let user = stdout.trim();
    if user.is_empty() || user.contains('%') {
        None
    } else {
        Some(user.to_string())
    }
}
