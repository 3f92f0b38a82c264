use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `${NAME}` or `$NAME`
static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([^}]*)\}|([A-Za-z0-9_]+))").expect("env var pattern is valid")
});

/// Expand environment variables and a leading `~` using the process environment
pub fn expand(token: &str) -> String {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    expand_with(token, |name| std::env::var(name).ok(), home.as_deref())
}

/// Expand with an explicit variable lookup and home directory.
///
/// Unset variables expand to nothing. A lone `$` is kept.
pub fn expand_with<F>(token: &str, lookup: F, home: Option<&Path>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = ENV_VAR.replace_all(token, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        lookup(name).unwrap_or_default()
    });

    let Some(home) = home else {
        return expanded.into_owned();
    };

    if expanded == "~" {
        home.to_string_lossy().into_owned()
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        home.join(rest).to_string_lossy().into_owned()
    } else {
        expanded.into_owned()
    }
}
