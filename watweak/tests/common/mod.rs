#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watweak::locator::APP_EXECUTABLE;
use watweak::BundlePaths;
use watweak_common::archive;

pub const MAIN_JS: &str =
    "const w=new BrowserWindow({width:1200,webPreferences:{nodeIntegration:!1,spellcheck:!0,preload:p}});";

pub const INDEX_HTML: &str =
    "<!DOCTYPE html>\n<html>\n<head>\n<title>WhatsApp</title>\n</head>\n<body></body>\n</html>\n";

/// A fake WhatsApp installation with a real `app.asar` per version.
pub struct Installation {
    pub temp: TempDir,
}

impl Installation {
    pub fn new(versions: &[&str]) -> Self {
        Self::with_main_js(versions, MAIN_JS)
    }

    pub fn with_main_js(versions: &[&str], main_js: &str) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("WhatsApp");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join(APP_EXECUTABLE), "MZ").unwrap();

        let src = temp.path().join("app-src");
        fs::create_dir_all(src.join("node_modules/lib")).unwrap();
        fs::write(src.join("main.js"), main_js).unwrap();
        fs::write(src.join("index.html"), INDEX_HTML).unwrap();
        fs::write(src.join("package.json"), r#"{"name":"whatsapp","main":"main.js"}"#).unwrap();
        fs::write(src.join("node_modules/lib/index.js"), "module.exports = 42;").unwrap();

        for version in versions {
            let resources = base.join(version).join("resources");
            fs::create_dir_all(&resources).unwrap();
            archive::create_package(&src, &resources.join("app.asar")).unwrap();
        }

        Self { temp }
    }

    pub fn base(&self) -> PathBuf {
        self.temp.path().join("WhatsApp")
    }

    pub fn source_tree(&self) -> PathBuf {
        self.temp.path().join("app-src")
    }

    pub fn paths(&self, version: &str) -> BundlePaths {
        BundlePaths::new(&self.base(), version)
    }

    /// A user file outside the installation, e.g. a stylesheet to inject.
    pub fn user_file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.temp.path().join("user").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Unpack the live archive of `version` into a fresh directory.
    pub fn unpack(&self, version: &str) -> PathBuf {
        let out = self.temp.path().join("unpacked").join(version);
        if out.exists() {
            fs::remove_dir_all(&out).unwrap();
        }
        archive::extract_all(&self.paths(version).archive(), &out).unwrap();
        out
    }
}

/// Every regular file below `root` with its contents, keyed by relative path.
pub fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    collect(root, root, &mut files);
    files.sort();
    files
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            out.push((rel, fs::read(&path).unwrap()));
        }
    }
}
