//! # Terminal Output
//!
//! Decides whether `git-glue` decorates its human-facing output with colors,
//! emoji and progress bars. The decision follows the usual conventions:
//!
//! - `--color=never|always|auto` - CLI flag, wins over the environment
//! - `NO_COLOR` - disables decoration when set (per https://no-color.org/)
//! - `CLICOLOR=0` - disables decoration
//! - `CLICOLOR_FORCE=1` - forces decoration even without a TTY
//! - `TERM=dumb` - disables decoration
//!
//! ```rust,ignore
//! use git_glue::output::{emoji, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("auto");
//! println!("{} Merged 3 repositories", emoji(&out, "✅", "[OK]"));
//! ```

use std::env;

/// Output configuration for colors, emoji and progress bars.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emoji should be used.
    pub use_color: bool,
    /// Whether stdout is an interactive terminal that can show a progress bar.
    pub interactive: bool,
}

impl OutputConfig {
    /// Create an output configuration from the environment and the value of
    /// the `--color` flag (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self {
            use_color,
            interactive: console::Term::stdout().features().is_attended(),
        }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Whether a progress bar should be drawn.
    pub fn show_progress(&self, quiet: bool) -> bool {
        !quiet && self.interactive
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self {
            use_color: false,
            interactive: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when decoration is enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
