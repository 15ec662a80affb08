//! watweak - patch the WhatsApp desktop client's `app.asar`.
//!
//! A [`TweakSession`] collects what to change (node integration, the dev
//! tools hotkey, extra stylesheets, scripts and assets) and applies it to
//! one installed version: the archive is unpacked into a scratch directory,
//! `main.js` and `index.html` are rewritten, and the tree is packed back.

pub mod backup;
pub mod bundle;
pub mod cli;
pub mod error;
pub mod inject;
pub mod locator;
pub mod output;
pub mod patch;
pub mod platform;
pub mod profile;
pub mod session;

pub use bundle::BundlePaths;
pub use cli::{Cli, Commands};
pub use error::{EnvironmentError, InjectError, PatchError, ProfileError, TweakError};
pub use inject::{FileKind, InjectReport, InjectedFile};
pub use patch::{PatchOutcome, PatchReport};
pub use platform::HostPlatform;
pub use profile::TweakProfile;
pub use session::{ApplyReport, TweakSession};
