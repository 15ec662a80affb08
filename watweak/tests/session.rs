//! End-to-end tests of the tweak session against a fabricated installation.

mod common;

use common::{snapshot, Installation, INDEX_HTML, MAIN_JS};
use std::fs;
use std::io;
use watweak::inject::markup_tag;
use watweak::patch::DEV_TOOLS_SCRIPT_NAME;
use watweak::profile::ProfileInjection;
use watweak::{FileKind, PatchOutcome, TweakError, TweakProfile, TweakSession};

const VERSION: &str = "app-2.2106.10";

fn session_for(install: &Installation) -> TweakSession {
    let mut session = TweakSession::new();
    session.set_base_dir(install.base()).unwrap();
    session.select_version(VERSION).unwrap();
    session
}

// ============================================================================
// Locator
// ============================================================================

#[test]
fn base_dir_must_contain_marker() {
    let install = Installation::new(&[VERSION]);
    let mut session = TweakSession::new();

    session.set_base_dir(install.base()).unwrap();
    assert_eq!(session.base_dir(), Some(install.base().as_path()));

    let err = session.set_base_dir(install.temp.path()).unwrap_err();
    assert!(matches!(err, TweakError::InvalidBaseDir(_)));
    assert!(err.to_string().contains("not a valid WhatsApp directory"));
}

#[test]
fn version_prefix_is_optional() {
    let install = Installation::new(&["app-1.2.3", VERSION]);
    let mut session = TweakSession::new();
    session.set_base_dir(install.base()).unwrap();

    assert_eq!(session.list_versions().unwrap(), vec!["app-1.2.3", VERSION]);

    session.select_version("1.2.3").unwrap();
    assert_eq!(session.version(), Some("app-1.2.3"));
    session.select_version("app-1.2.3").unwrap();
    assert_eq!(session.version(), Some("app-1.2.3"));

    let err = session.select_version("9.9.9").unwrap_err();
    assert!(matches!(err, TweakError::VersionNotFound(v) if v == "app-9.9.9"));
    assert_eq!(session.version(), Some("app-1.2.3"));
}

#[test]
fn versions_are_read_fresh() {
    let install = Installation::new(&[VERSION]);
    let mut session = TweakSession::new();
    session.set_base_dir(install.base()).unwrap();
    assert_eq!(session.list_versions().unwrap().len(), 1);

    fs::create_dir_all(install.base().join("app-3.0.0")).unwrap();
    assert_eq!(session.list_versions().unwrap().len(), 2);
    assert_eq!(session.select_latest_version().unwrap(), "app-3.0.0");
}

// ============================================================================
// Preconditions
// ============================================================================

#[test]
fn bundle_operations_fail_fast_without_selection() {
    let install = Installation::new(&[VERSION]);
    let before = snapshot(install.temp.path());

    let mut session = TweakSession::new();
    assert!(matches!(session.backup(), Err(TweakError::ResourcesDirNotSet)));
    assert!(matches!(session.restore(), Err(TweakError::ResourcesDirNotSet)));

    session.set_base_dir(install.base()).unwrap();
    session.enable_node_integration();
    assert!(matches!(session.backup(), Err(TweakError::ResourcesDirNotSet)));
    assert!(matches!(session.extract(), Err(TweakError::ResourcesDirNotSet)));
    assert!(matches!(session.apply(), Err(TweakError::ResourcesDirNotSet)));
    assert!(matches!(session.cleanup(), Err(TweakError::ResourcesDirNotSet)));
    assert!(!session.has_backup());

    assert_eq!(snapshot(install.temp.path()), before);
}

#[test]
fn injected_files_must_exist_when_registered() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);

    let err = session
        .inject_css(install.temp.path().join("missing.css"))
        .unwrap_err();
    assert!(matches!(err, TweakError::FileNotFound(_)));
    assert!(err.to_string().contains("missing.css"));
    assert!(session.injections().is_empty());
}

// ============================================================================
// Backup
// ============================================================================

#[test]
fn backup_restore_round_trip() {
    let install = Installation::new(&[VERSION]);
    let session = session_for(&install);
    let archive = install.paths(VERSION).archive();
    let pristine = fs::read(&archive).unwrap();

    assert!(!session.has_backup());
    session.backup().unwrap();
    assert!(session.has_backup());

    fs::write(&archive, b"garbage").unwrap();
    session.restore().unwrap();
    assert_eq!(fs::read(&archive).unwrap(), pristine);
}

#[test]
fn restore_without_backup_is_not_found() {
    let install = Installation::new(&[VERSION]);
    let session = session_for(&install);

    let err = session.restore().unwrap_err();
    match err {
        TweakError::Io(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::NotFound),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn backup_survives_apply() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session.backup().unwrap();
    let pristine = fs::read(install.paths(VERSION).archive()).unwrap();

    session.enable_node_integration();
    session.apply().unwrap();
    assert_ne!(fs::read(install.paths(VERSION).archive()).unwrap(), pristine);

    session.restore().unwrap();
    assert_eq!(fs::read(install.paths(VERSION).archive()).unwrap(), pristine);
}

// ============================================================================
// Apply
// ============================================================================

#[test]
fn apply_without_tweaks_round_trips_contents() {
    let install = Installation::new(&[VERSION]);
    let session = session_for(&install);

    let report = session.apply().unwrap();
    assert_eq!(report.patch, PatchOutcome::Skipped);
    assert_eq!(report.files_extracted, report.files_packed);
    assert!(report.injected.copied.is_empty());

    let unpacked = install.unpack(VERSION);
    assert_eq!(snapshot(&unpacked), snapshot(&install.source_tree()));
    assert!(!install.paths(VERSION).scratch().exists());
}

#[test]
fn apply_enables_node_integration() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session.enable_node_integration();

    let report = session.apply().unwrap();
    assert_eq!(report.patch, PatchOutcome::Patched);

    let unpacked = install.unpack(VERSION);
    let main_js = fs::read_to_string(unpacked.join("main.js")).unwrap();
    assert_eq!(
        main_js,
        MAIN_JS.replace("nodeIntegration:!1,spellcheck:!0", "nodeIntegration:true,spellcheck:!0")
    );
    assert_eq!(fs::read_to_string(unpacked.join("index.html")).unwrap(), INDEX_HTML);
}

#[test]
fn dev_tools_script_is_injected_automatically() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session.enable_node_integration();
    session.enable_dev_tools();
    assert!(session.injections().is_empty());

    let report = session.apply().unwrap();
    assert_eq!(report.injected.tags.len(), 1);

    let unpacked = install.unpack(VERSION);
    assert!(fs::read_to_string(unpacked.join("main.js"))
        .unwrap()
        .contains("nodeIntegration:true,spellcheck:!0,devTools:true"));
    assert!(unpacked
        .join("injected/js")
        .join(DEV_TOOLS_SCRIPT_NAME)
        .is_file());
    let html = fs::read_to_string(unpacked.join("index.html")).unwrap();
    assert!(html.contains(&markup_tag(FileKind::Script, DEV_TOOLS_SCRIPT_NAME).unwrap()));
    // Registration stays as the caller left it.
    assert!(session.injections().is_empty());
}

#[test]
fn dev_tools_alone_changes_nothing() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session.enable_dev_tools();

    let report = session.apply().unwrap();
    assert_eq!(report.patch, PatchOutcome::Skipped);
    assert!(report.injected.tags.is_empty());
    assert_eq!(snapshot(&install.unpack(VERSION)), snapshot(&install.source_tree()));
}

#[test]
fn injection_tags_follow_registration_order() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session.inject_css(install.user_file("base.css", "a{}")).unwrap();
    session.inject_js(install.user_file("one.js", "1")).unwrap();
    session.inject_file(install.user_file("theme.css", "b{}"), None).unwrap();
    session.inject_file(install.user_file("two.js", "2"), None).unwrap();
    session.inject_file(install.user_file("font.woff2", "ttf"), None).unwrap();

    let report = session.apply().unwrap();
    assert_eq!(report.injected.copied.len(), 5);

    let html = fs::read_to_string(install.unpack(VERSION).join("index.html")).unwrap();
    assert_eq!(html.matches("<link rel=\"stylesheet\"").count(), 2);
    assert_eq!(html.matches("<script src=").count(), 2);
    assert!(!html.contains("font.woff2"));

    let positions: Vec<usize> = ["css/base.css", "js/one.js", "css/theme.css", "js/two.js", "</head>"]
        .iter()
        .map(|needle| html.find(needle).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{html}");
}

#[test]
fn other_assets_are_copied_without_markup() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session
        .inject_file(install.user_file("logo.svg", "<svg/>"), Some(FileKind::Other))
        .unwrap();

    let report = session.apply().unwrap();
    assert!(report.injected.tags.is_empty());

    let unpacked = install.unpack(VERSION);
    assert_eq!(
        fs::read_to_string(unpacked.join("injected/other/logo.svg")).unwrap(),
        "<svg/>"
    );
    assert_eq!(fs::read_to_string(unpacked.join("index.html")).unwrap(), INDEX_HTML);
}

#[test]
fn same_basename_last_copy_wins_and_tags_duplicate() {
    let install = Installation::new(&[VERSION]);
    let mut session = session_for(&install);
    session.inject_css(install.user_file("a/dark.css", "first")).unwrap();
    session.inject_css(install.user_file("b/dark.css", "second")).unwrap();

    session.apply().unwrap();

    let unpacked = install.unpack(VERSION);
    assert_eq!(
        fs::read_to_string(unpacked.join("injected/css/dark.css")).unwrap(),
        "second"
    );
    let html = fs::read_to_string(unpacked.join("index.html")).unwrap();
    assert_eq!(html.matches("href=\"injected/css/dark.css\"").count(), 2);
}

#[test]
fn missing_pattern_leaves_main_js_untouched() {
    let drifted = "const w=new BrowserWindow({webPreferences:{sandbox:!0}});";
    let install = Installation::with_main_js(&[VERSION], drifted);
    let mut session = session_for(&install);
    session.enable_node_integration();

    let report = session.apply().unwrap();
    assert_eq!(report.patch, PatchOutcome::PatternAbsent);
    assert_eq!(
        fs::read_to_string(install.unpack(VERSION).join("main.js")).unwrap(),
        drifted
    );
}

#[test]
fn strict_mode_stops_on_missing_pattern_without_rollback() {
    let install = Installation::with_main_js(&[VERSION], "nothing here");
    let mut session = session_for(&install);
    session.enable_node_integration();
    session.set_strict(true);
    let pristine = fs::read(install.paths(VERSION).archive()).unwrap();

    let err = session.apply().unwrap_err();
    assert!(err.to_string().contains("pattern not found"));
    // The scratch tree is left behind; the live archive was never repacked.
    assert!(install.paths(VERSION).scratch().is_dir());
    assert_eq!(fs::read(install.paths(VERSION).archive()).unwrap(), pristine);

    session.cleanup().unwrap();
    assert!(!install.paths(VERSION).scratch().exists());
}

#[test]
fn apply_discards_leftover_scratch_tree() {
    let install = Installation::new(&[VERSION]);
    let session = session_for(&install);
    let paths = install.paths(VERSION);
    let stale = paths.injected(FileKind::Stylesheet).join("stale.css");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old").unwrap();
    fs::write(paths.scratch().join("leftover.txt"), "old").unwrap();

    session.apply().unwrap();

    assert_eq!(snapshot(&install.unpack(VERSION)), snapshot(&install.source_tree()));
}

#[test]
fn session_from_profile() {
    let install = Installation::new(&[VERSION]);
    let css = install.user_file("dark.css", "body{}");
    let profile = TweakProfile {
        base_dir: Some(install.base()),
        version: Some("2.2106.10".to_string()),
        node_integration: true,
        inject: vec![ProfileInjection {
            path: css,
            kind: None,
        }],
        ..TweakProfile::default()
    };

    let session = TweakSession::from_profile(&profile).unwrap();
    assert_eq!(session.version(), Some(VERSION));
    assert!(session.node_integration());
    assert_eq!(session.injections()[0].kind, FileKind::Stylesheet);

    let report = session.apply().unwrap();
    assert_eq!(report.patch, PatchOutcome::Patched);
    assert_eq!(report.injected.tags.len(), 1);
}

#[test]
fn profile_with_unknown_version_is_rejected() {
    let install = Installation::new(&[VERSION]);
    let profile = TweakProfile {
        base_dir: Some(install.base()),
        version: Some("0.0.1".to_string()),
        ..TweakProfile::default()
    };

    assert!(matches!(
        TweakSession::from_profile(&profile),
        Err(TweakError::VersionNotFound(_))
    ));
}
