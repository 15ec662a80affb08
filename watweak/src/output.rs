//! Terminal output for the `watweak` binary.
//!
//! Each status line starts with a colored symbol. Unpacking and repacking a
//! large `app.asar` runs under a spinner.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::borrow::Cow;
use std::time::Duration;

pub struct Output;

impl Output {
    /// A finished step, e.g. `✓ Backed up app.asar`.
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// The error that ends the run, on stderr.
    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
    }

    /// Something that did not stop the run but changes its result.
    pub fn warning(msg: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow(), msg.as_ref());
    }

    /// A choice made for the user, such as the default version.
    pub fn info(msg: impl AsRef<str>) {
        println!("{} {}", "→".cyan(), msg.as_ref().dimmed());
    }

    /// Title above the `status` table.
    pub fn header(msg: impl AsRef<str>) {
        println!("\n{}\n", msg.as_ref().bold().cyan());
    }

    /// An installed version or an injected tag, indented.
    pub fn list_item(msg: impl AsRef<str>) {
        println!("  {}", msg.as_ref());
    }

    /// One aligned row of the `status` table.
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        println!("  {:<14} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }

    /// The command to run next, e.g. `→ Run: watweak backup`.
    pub fn hint(msg: impl AsRef<str>) {
        println!("  {} {}", "→".cyan(), msg.as_ref());
    }

    /// Spinner shown while the archive is rewritten.
    pub fn spinner(msg: impl Into<Cow<'static, str>>) -> Spinner {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("valid template"),
        );
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        Spinner(pb)
    }
}

/// Replaces its line with a success or failure mark when finished.
pub struct Spinner(ProgressBar);

impl Spinner {
    pub fn finish_success(self, msg: impl AsRef<str>) {
        self.finish("✓".green().bold().to_string(), msg.as_ref());
    }

    pub fn finish_error(self, msg: impl AsRef<str>) {
        self.finish("✗".red().bold().to_string(), msg.as_ref());
    }

    fn finish(self, mark: String, msg: &str) {
        self.0.finish_with_message(format!("{mark} {msg}"));
    }
}
