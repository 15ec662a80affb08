//! CLI argument definitions for watweak.

use clap::{ArgMatches, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::inject::FileKind;
use crate::profile::{ProfileInjection, TweakProfile, PROFILE_ENV};

/// Overrides the installation directory.
pub const DIR_ENV: &str = "WATWEAK_DIR";

#[derive(Debug, Parser)]
#[command(name = "watweak")]
#[command(about = "Tweak the WhatsApp desktop app: node integration, dev tools, injected CSS/JS")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// WhatsApp installation directory (default: %LOCALAPPDATA%\WhatsApp)
    #[arg(long, global = true, env = DIR_ENV, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Profile with saved settings (default: <config dir>/watweak/profile.json)
    #[arg(long, global = true, env = PROFILE_ENV, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List installed versions
    Versions,

    /// Show the installation, the selected version and whether a backup exists
    Status(StatusArgs),

    /// Copy app.asar to app.asar.backup, replacing any previous backup
    Backup(TargetArgs),

    /// Copy app.asar.backup back over app.asar
    Restore(TargetArgs),

    /// Unpack app.asar, apply the tweaks and pack it again
    Apply(ApplyArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Installed version, with or without the "app-" prefix
    /// (default: the profile's version, then the newest installed)
    #[arg(id = "target_version", value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Let the web UI use Node.js APIs
    #[arg(long)]
    pub node_integration: bool,

    /// Open the dev tools with F12 (needs --node-integration)
    #[arg(long)]
    pub dev_tools: bool,

    /// Inject a stylesheet
    #[arg(long, value_name = "FILE")]
    pub css: Vec<PathBuf>,

    /// Inject a script (loaded with `defer`)
    #[arg(long, value_name = "FILE")]
    pub js: Vec<PathBuf>,

    /// Copy a file to injected/other without referencing it
    #[arg(long, value_name = "FILE")]
    pub asset: Vec<PathBuf>,

    /// Inject a file, classified by extension. Injected files keep their
    /// command-line order across --css, --js, --asset and --inject.
    #[arg(long, value_name = "FILE")]
    pub inject: Vec<PathBuf>,

    /// Fail when main.js has no node integration fragment or index.html has
    /// no </head>
    #[arg(long)]
    pub strict: bool,

    /// Back up app.asar before patching
    #[arg(long)]
    pub backup: bool,

    /// Save the resulting settings to the profile file
    #[arg(long)]
    pub save_profile: bool,
}

impl ApplyArgs {
    /// Layer these flags over `profile`. Files from the profile come first,
    /// then the flagged files in the order they appear in `matches`.
    pub fn merge_into(&self, profile: &mut TweakProfile, matches: &ArgMatches) {
        profile.node_integration |= self.node_integration;
        profile.dev_tools |= self.dev_tools;
        profile.strict |= self.strict;
        if let Some(version) = &self.target.version {
            profile.version = Some(version.clone());
        }

        let flags = [
            ("css", &self.css, Some(FileKind::Stylesheet)),
            ("js", &self.js, Some(FileKind::Script)),
            ("asset", &self.asset, Some(FileKind::Other)),
            ("inject", &self.inject, None),
        ];

        let mut flagged: Vec<(usize, ProfileInjection)> = Vec::new();
        for (id, paths, kind) in flags {
            let indices = matches.indices_of(id).into_iter().flatten();
            flagged.extend(indices.zip(paths).map(|(index, path)| {
                (
                    index,
                    ProfileInjection {
                        path: path.clone(),
                        kind,
                    },
                )
            }));
        }
        flagged.sort_by_key(|(index, _)| *index);
        profile
            .inject
            .extend(flagged.into_iter().map(|(_, item)| item));
    }
}
