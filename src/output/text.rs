//! Human-readable console output.
//!
//! Status lines go to stdout, colored with `yansi` when stdout is a terminal.
//! The statistics block is rendered as plain text so it can be tested and
//! piped.

use std::fmt::Write as _;
use std::io::IsTerminal;

use yansi::Paint;

use crate::config::Settings;
use crate::integrity::StoreStats;

/// Enable colors only for an interactive stdout unless disabled outright.
pub fn init_colors(no_color: bool) {
    if no_color || !std::io::stdout().is_terminal() {
        yansi::disable();
    }
}

/// Status line printer, silenced by `--quiet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    quiet: bool,
}

impl Console {
    /// Create a console; `quiet` suppresses every status line.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// A line reporting that something was produced.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.green());
        }
    }

    /// A neutral informational line.
    pub fn notice(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.cyan());
        }
    }

    /// A line that needs the operator's attention.
    pub fn alert(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.red().bold());
        }
    }
}

/// Format an integer with `,` thousands separators.
///
/// ```
/// use fixity::output::text::thousands;
///
/// assert_eq!(thousands(0), "0");
/// assert_eq!(thousands(1234567), "1,234,567");
/// ```
#[must_use]
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render the `--db-stats` block.
#[must_use]
pub fn render_stats(stats: &StoreStats, settings: &Settings) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Program Runs: {}", thousands(stats.run_count));
    let _ = writeln!(
        out,
        "Total files being tracked: {}",
        thousands(stats.tracked_files)
    );
    let _ = writeln!(
        out,
        "Potential Duplicates: {} in {} groups",
        thousands(stats.duplicate_members),
        thousands(stats.duplicate_groups)
    );
    let _ = writeln!(
        out,
        "Files with a deviation: {}",
        thousands(stats.drifted_files)
    );

    if !stats.by_extension.is_empty() {
        let _ = writeln!(out, "Tracked files by extension:");
        let width = stats
            .by_extension
            .iter()
            .map(|(ext, _)| display_extension(ext).len())
            .max()
            .unwrap_or(0);
        for (ext, count) in &stats.by_extension {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>10}",
                display_extension(ext),
                thousands(*count)
            );
        }
    }

    let _ = writeln!(out, "DB path: {}", settings.db_full_path().display());
    let _ = writeln!(out, "Monitor dir: {}", settings.monitor_dir.display());
    let _ = write!(out, "Ignored extensions: {}", settings.ignore_ext_display());

    out
}

fn display_extension(ext: &str) -> &str {
    if ext.is_empty() {
        "(none)"
    } else {
        ext
    }
}
