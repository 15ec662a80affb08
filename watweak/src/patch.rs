//! Forcing node integration on in the app's minified `main.js`.
//!
//! The window options in `main.js` contain a fragment like
//! `nodeIntegration:!1,spellcheck:!0`. Minifiers spell the boolean several
//! ways, so the match accepts all of them. Builds that restructure the
//! options object no longer match; that is reported as
//! [`PatchOutcome::PatternAbsent`] and the script is left untouched.

use crate::bundle::BundlePaths;
use crate::error::{PatchError, TweakError};
use crate::inject::{FileKind, InjectedFile};
use regex::{NoExpand, Regex};
use serde::Serialize;
use std::fs;
use std::sync::OnceLock;
use tracing::{debug, warn};

const NODE_INTEGRATION_PATTERN: &str = r"nodeIntegration:?(true|false|!0|!1|1|0),spellcheck:!0";
const NODE_INTEGRATION_ON: &str = "nodeIntegration:true,spellcheck:!0";
const DEV_TOOLS_ON: &str = ",devTools:true";

pub const DEV_TOOLS_SCRIPT_NAME: &str = "devTools.js";
const DEV_TOOLS_SCRIPT: &str = include_str!("../assets/devtools.js");

fn node_integration_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(NODE_INTEGRATION_PATTERN).expect("valid pattern"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    pub node_integration: bool,
    pub dev_tools: bool,
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchOutcome {
    /// Node integration was not requested.
    Skipped,
    Patched,
    /// The options fragment was not found; the script is unchanged.
    PatternAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub outcome: PatchOutcome,
    /// Files the injector must add on top of the user's list.
    pub extra_injections: Vec<InjectedFile>,
}

/// The F12 listener that opens the dev tools window.
pub fn dev_tools_script() -> InjectedFile {
    InjectedFile::bundled(DEV_TOOLS_SCRIPT_NAME, DEV_TOOLS_SCRIPT, FileKind::Script)
}

/// Rewrite the first node integration fragment in `source`.
pub fn patch_entry_script(source: &str, dev_tools: bool) -> (String, PatchOutcome) {
    let regex = node_integration_regex();
    if !regex.is_match(source) {
        return (source.to_string(), PatchOutcome::PatternAbsent);
    }

    let replacement = if dev_tools {
        format!("{NODE_INTEGRATION_ON}{DEV_TOOLS_ON}")
    } else {
        NODE_INTEGRATION_ON.to_string()
    };
    let patched = regex.replacen(source, 1, NoExpand(&replacement)).into_owned();
    (patched, PatchOutcome::Patched)
}

/// Patch the scratch tree's entry script in place.
pub fn apply_integration_patch(
    paths: &BundlePaths,
    options: PatchOptions,
) -> Result<PatchReport, TweakError> {
    if !options.node_integration {
        return Ok(PatchReport {
            outcome: PatchOutcome::Skipped,
            extra_injections: Vec::new(),
        });
    }

    let script = paths.entry_script();
    let source =
        String::from_utf8(fs::read(&script)?).map_err(|_| PatchError::Malformed(script.clone()))?;

    let (patched, outcome) = patch_entry_script(&source, options.dev_tools);
    match outcome {
        PatchOutcome::Patched => {
            fs::write(&script, patched)?;
            debug!(script = %script.display(), dev_tools = options.dev_tools, "patched entry script");
        }
        PatchOutcome::PatternAbsent if options.strict => {
            return Err(PatchError::PatternNotFound(script).into());
        }
        PatchOutcome::PatternAbsent => {
            warn!(script = %script.display(), "node integration pattern not found, entry script left as is");
        }
        PatchOutcome::Skipped => {}
    }

    let extra_injections = if options.dev_tools {
        vec![dev_tools_script()]
    } else {
        Vec::new()
    };

    Ok(PatchReport {
        outcome,
        extra_injections,
    })
}
