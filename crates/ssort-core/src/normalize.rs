use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use ssort_types::RunConfig;

/// SGR color sequences: ESC [ <digits/semicolons> m
static ANSI_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("color pattern is valid"));

/// Produces the `clean` form of a line used for matching and sorting
#[derive(Clone, Copy, Debug, Default)]
pub struct Normalizer {
    strip_color: bool,
    fold_case: bool,
}

impl Normalizer {
    pub fn new(strip_color: bool, fold_case: bool) -> Self {
        Self {
            strip_color,
            fold_case,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.color, config.ignore_case)
    }

    /// Strip colors first, then fold case
    pub fn normalize(&self, raw: &str) -> String {
        let stripped = if self.strip_color {
            strip_colors(raw)
        } else {
            Cow::Borrowed(raw)
        };

        if self.fold_case {
            stripped.to_lowercase()
        } else {
            stripped.into_owned()
        }
    }

    /// Fold a filter the same way lines are folded
    pub fn fold_filter<'a>(&self, filter: &'a str) -> Cow<'a, str> {
        if self.fold_case {
            Cow::Owned(filter.to_lowercase())
        } else {
            Cow::Borrowed(filter)
        }
    }
}

/// Remove ANSI color codes, leaving all other text intact
pub fn strip_colors(line: &str) -> Cow<'_, str> {
    ANSI_COLOR.replace_all(line, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_colors() {
        let line = "\x1b[1;31mERROR\x1b[0m: disk full";
        assert_eq!(strip_colors(line), "ERROR: disk full");
        assert_eq!(strip_colors("plain"), "plain");
    }

    #[test]
    fn test_non_color_escape_kept() {
        // Cursor movement is not a color code
        let line = "\x1b[2Kcleared";
        assert_eq!(strip_colors(line), line);
    }

    #[test]
    fn test_normalize_modes() {
        let line = "\x1b[33mWARN\x1b[0m Memory";
        assert_eq!(Normalizer::new(false, false).normalize(line), line);
        assert_eq!(Normalizer::new(true, false).normalize(line), "WARN Memory");
        assert_eq!(Normalizer::new(true, true).normalize(line), "warn memory");
        assert_eq!(
            Normalizer::new(false, true).normalize(line),
            "\x1b[33mwarn\x1b[0m memory"
        );
    }
}
