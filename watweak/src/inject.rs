//! Copying user files into the scratch tree and wiring them into the page.

use crate::bundle::BundlePaths;
use crate::error::{InjectError, TweakError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HEAD_CLOSE: &str = "</head>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[serde(alias = "js")]
    Script,
    #[serde(alias = "css")]
    Stylesheet,
    #[serde(alias = "asset")]
    Other,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Stylesheet, FileKind::Script, FileKind::Other];

    /// Classify by extension; anything unrecognised is a plain asset.
    pub fn infer(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("js" | "mjs" | "cjs") => FileKind::Script,
            Some("css") => FileKind::Stylesheet,
            _ => FileKind::Other,
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            FileKind::Script => "js",
            FileKind::Stylesheet => "css",
            FileKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileSource {
    Path(PathBuf),
    /// Shipped inside this binary.
    Bundled {
        name: &'static str,
        #[serde(skip)]
        contents: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectedFile {
    pub source: FileSource,
    pub kind: FileKind,
}

impl InjectedFile {
    /// Register a file on disk. The path is made absolute and must exist now,
    /// not when the session is applied.
    pub fn from_path(path: impl AsRef<Path>, kind: Option<FileKind>) -> Result<Self, TweakError> {
        let path = std::path::absolute(path.as_ref())?;
        if !path.is_file() {
            return Err(TweakError::FileNotFound(path));
        }

        let kind = kind.unwrap_or_else(|| FileKind::infer(&path));
        Ok(Self {
            source: FileSource::Path(path),
            kind,
        })
    }

    pub fn bundled(name: &'static str, contents: &'static str, kind: FileKind) -> Self {
        Self {
            source: FileSource::Bundled { name, contents },
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        match &self.source {
            FileSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            FileSource::Bundled { name, .. } => name.to_string(),
        }
    }

    fn write_to(&self, dest: &Path) -> io::Result<()> {
        match &self.source {
            FileSource::Path(path) => fs::copy(path, dest).map(|_| ()),
            FileSource::Bundled { contents, .. } => fs::write(dest, contents),
        }
    }
}

/// The tag that references an injected file from the page, if it gets one.
pub fn markup_tag(kind: FileKind, name: &str) -> Option<String> {
    match kind {
        FileKind::Stylesheet => Some(format!(
            r#"<link rel="stylesheet" href="{INJECTED}/css/{name}">"#,
            INJECTED = crate::bundle::INJECTED_DIR
        )),
        FileKind::Script => Some(format!(
            r#"<script src="{INJECTED}/js/{name}" defer></script>"#,
            INJECTED = crate::bundle::INJECTED_DIR
        )),
        FileKind::Other => None,
    }
}

/// Put `tag` on its own line right above the first `</head>`. Repeated calls
/// stack tags in call order.
pub fn insert_before_head(html: &str, tag: &str) -> Option<String> {
    if !html.contains(HEAD_CLOSE) {
        return None;
    }
    Some(html.replacen(HEAD_CLOSE, &format!("{tag}\n{HEAD_CLOSE}"), 1))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectReport {
    /// Destination of every copied file, in registration order.
    pub copied: Vec<PathBuf>,
    /// Tags added to the page, top to bottom.
    pub tags: Vec<String>,
    pub head_found: bool,
}

/// Copy `files` into the scratch tree and reference scripts and stylesheets
/// from the entry page. The page is read once and written once.
///
/// Files sharing a basename overwrite each other on disk; each still gets
/// its own tag.
pub fn inject(
    paths: &BundlePaths,
    files: &[InjectedFile],
    strict: bool,
) -> Result<InjectReport, TweakError> {
    if files.is_empty() {
        return Ok(InjectReport::default());
    }

    let page = paths.entry_page();
    let mut html =
        String::from_utf8(fs::read(&page)?).map_err(|_| InjectError::Malformed(page.clone()))?;
    let head_found = html.contains(HEAD_CLOSE);
    let wants_tags = files.iter().any(|file| file.kind != FileKind::Other);

    if wants_tags && !head_found {
        if strict {
            return Err(InjectError::HeadNotFound(page).into());
        }
        warn!(page = %page.display(), "no </head> in entry page, injected files stay unreferenced");
    }

    for kind in FileKind::ALL {
        fs::create_dir_all(paths.injected(kind))?;
    }

    let mut report = InjectReport {
        head_found,
        ..InjectReport::default()
    };

    for file in files {
        let name = file.file_name();
        let dest = paths.injected(file.kind).join(&name);
        file.write_to(&dest)?;
        debug!(file = %name, kind = ?file.kind, dest = %dest.display(), "copied injected file");
        report.copied.push(dest);

        if let Some(tag) = markup_tag(file.kind, &name) {
            if let Some(updated) = insert_before_head(&html, &tag) {
                html = updated;
                report.tags.push(tag);
            }
        }
    }

    fs::write(&page, html)?;
    Ok(report)
}
