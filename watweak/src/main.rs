use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use watweak::cli::{ApplyArgs, Format, StatusArgs, TargetArgs};
use watweak::output::Output;
use watweak::{Cli, Commands, HostPlatform, PatchOutcome, TweakProfile, TweakSession};

fn main() {
    // e.g., RUST_LOG=watweak=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Raw matches are kept so `apply` can order injected files by position.
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    if let Err(err) = run(cli, &matches) {
        Output::error(format!("error: {err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli, matches: &ArgMatches) -> Result<()> {
    // Nothing below makes sense off Windows/WSL, so refuse before touching
    // any configuration.
    let platform = HostPlatform::detect()?;
    debug!(platform = platform.name(), "detected host platform");

    let profile_path = cli.profile.clone().or_else(TweakProfile::default_path);
    let mut profile = match &profile_path {
        Some(path) => TweakProfile::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => TweakProfile::default(),
    };
    profile.base_dir = Some(resolve_base_dir(cli.dir.as_deref(), &profile, &platform));

    match cli.command {
        Commands::Versions => cmd_versions(profile),
        Commands::Status(args) => cmd_status(args, profile, &platform),
        Commands::Backup(args) => cmd_backup(args, profile),
        Commands::Restore(args) => cmd_restore(args, profile),
        Commands::Apply(args) => {
            let apply_matches = matches
                .subcommand_matches("apply")
                .context("apply arguments missing")?;
            cmd_apply(args, apply_matches, profile, profile_path.as_deref())
        }
    }
}

/// `--dir`/`WATWEAK_DIR`, then the profile, then the platform default.
fn resolve_base_dir(dir: Option<&Path>, profile: &TweakProfile, platform: &HostPlatform) -> PathBuf {
    dir.map(Path::to_path_buf)
        .or_else(|| profile.base_dir.clone())
        .unwrap_or_else(|| platform.default_base_dir())
}

/// Build the session and select a version: the one asked for, else the
/// profile's, else the newest installed.
fn open_session(target: &TargetArgs, mut profile: TweakProfile) -> Result<TweakSession> {
    if let Some(version) = &target.version {
        profile.version = Some(version.clone());
    }

    let mut session = TweakSession::from_profile(&profile)?;
    if session.version().is_none() {
        let latest = session.select_latest_version()?;
        Output::info(format!("Using newest installed version {latest}"));
    }
    Ok(session)
}

fn cmd_versions(mut profile: TweakProfile) -> Result<()> {
    profile.version = None;
    profile.inject.clear();
    let session = TweakSession::from_profile(&profile)?;
    let versions = session.list_versions()?;

    if versions.is_empty() {
        Output::warning("No versions installed");
        return Ok(());
    }
    for version in versions {
        Output::list_item(version);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    platform: &'static str,
    base_dir: Option<PathBuf>,
    versions: Vec<String>,
    selected: Option<String>,
    has_backup: bool,
    session: TweakSession,
}

fn cmd_status(args: StatusArgs, mut profile: TweakProfile, platform: &HostPlatform) -> Result<()> {
    if let Some(version) = &args.target.version {
        profile.version = Some(version.clone());
    }
    let mut session = TweakSession::from_profile(&profile)?;
    if session.version().is_none() && !session.list_versions()?.is_empty() {
        session.select_latest_version()?;
    }

    let report = StatusReport {
        platform: platform.name(),
        base_dir: session.base_dir().map(Path::to_path_buf),
        versions: session.list_versions()?,
        selected: session.version().map(str::to_string),
        has_backup: session.has_backup(),
        session,
    };

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Table => {
            Output::header("watweak status");
            Output::kv("Platform", report.platform);
            Output::kv(
                "Install dir",
                report
                    .base_dir
                    .as_ref()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default(),
            );
            Output::kv("Versions", report.versions.join(", "));
            Output::kv("Selected", report.selected.clone().unwrap_or_default());
            Output::kv("Backup", if report.has_backup { "yes" } else { "no" });
            if !report.has_backup {
                Output::hint("Run: watweak backup");
            }
        }
    }
    Ok(())
}

fn cmd_backup(args: TargetArgs, mut profile: TweakProfile) -> Result<()> {
    // Injected files only matter to apply.
    profile.inject.clear();
    let session = open_session(&args, profile)?;
    session.backup().context("Failed to back up app.asar")?;
    Output::success(format!(
        "Backed up {} app.asar",
        session.version().unwrap_or_default()
    ));
    Ok(())
}

fn cmd_restore(args: TargetArgs, mut profile: TweakProfile) -> Result<()> {
    // Injected files only matter to apply.
    profile.inject.clear();
    let session = open_session(&args, profile)?;
    session.restore().context("Failed to restore app.asar")?;
    Output::success(format!(
        "Restored {} app.asar from backup",
        session.version().unwrap_or_default()
    ));
    Ok(())
}

fn cmd_apply(
    args: ApplyArgs,
    matches: &ArgMatches,
    mut profile: TweakProfile,
    profile_path: Option<&Path>,
) -> Result<()> {
    args.merge_into(&mut profile, matches);
    if profile.dev_tools && !profile.node_integration {
        Output::warning("--dev-tools has no effect without --node-integration");
    }

    let session = open_session(&args.target, profile.clone())?;

    if args.backup {
        session.backup().context("Failed to back up app.asar")?;
        Output::success("Backed up app.asar");
    } else if !session.has_backup() {
        Output::warning("No backup of app.asar exists; a failed apply cannot be undone");
        Output::hint("Run: watweak backup");
    }

    let spinner = Output::spinner(format!(
        "Patching {}...",
        session.version().unwrap_or_default()
    ));
    let report = match session.apply() {
        Ok(report) => {
            spinner.finish_success(format!("Applied tweaks to {}", report.version));
            report
        }
        Err(err) => {
            spinner.finish_error("Apply failed");
            return Err(err).context("Failed to apply tweaks");
        }
    };

    match report.patch {
        PatchOutcome::Patched => Output::success("Enabled node integration"),
        PatchOutcome::PatternAbsent => {
            Output::warning("Node integration fragment not found; main.js left unchanged")
        }
        PatchOutcome::Skipped => {}
    }
    for tag in &report.injected.tags {
        Output::list_item(tag);
    }
    Output::kv("Archive", report.archive.display().to_string());
    Output::kv("Files packed", report.files_packed.to_string());

    if args.save_profile {
        let path = profile_path.context("No profile path available to save to")?;
        // A relative path would be re-read against the profile's directory.
        if let Some(dir) = profile.base_dir.as_mut() {
            *dir = std::path::absolute(&*dir)?;
        }
        for item in &mut profile.inject {
            item.path = std::path::absolute(&item.path)?;
        }
        profile
            .save(path)
            .with_context(|| format!("Failed to save profile {}", path.display()))?;
        Output::success(format!("Saved profile {}", path.display()));
    }

    Ok(())
}
