use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// ssort - reorder a never-ending line stream by filter priority
#[derive(Parser, Debug)]
#[command(name = "ssort")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File holding an optional flag line followed by one filter per line
    #[arg(value_name = "FILTER_FILE")]
    pub filter_file: Option<PathBuf>,

    /// Comma separated list of prioritized strings
    #[arg(short = 'f', value_name = "LIST")]
    pub filters: Option<String>,

    /// Output only matching results
    #[arg(short = 'o')]
    pub only_matching: bool,

    /// Output unsorted (unmatched) lines immediately
    #[arg(short = 'k', long = "keep-going")]
    pub keep_going: bool,

    /// Ignore case
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Flush buffer after N prioritized matches and print at most N results
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Flush timeout, e.g. 500ms, 2s, 1m30s
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Enable color-aware mode
    #[arg(long)]
    pub color: bool,

    /// Match on word boundaries only
    #[arg(short = 'w', long = "word-boundary")]
    pub word_boundary: bool,

    /// Execute command and sort its output
    #[arg(short = 'e', long = "exec", value_name = "COMMAND")]
    pub exec: Option<String>,
}

impl Args {
    /// Parse flags found inside a filter file
    pub fn parse_tokens<I>(tokens: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        let argv = std::iter::once("ssort".to_string()).chain(tokens);
        Self::try_parse_from(normalize_flags(argv))
    }
}

/// Every flag name and whether it takes a value
const FLAGS: &[(&str, bool)] = &[
    ("f", true),
    ("o", false),
    ("k", false),
    ("keep-going", false),
    ("i", false),
    ("ignore-case", false),
    ("limit", true),
    ("timeout", true),
    ("color", false),
    ("w", false),
    ("word-boundary", false),
    ("e", true),
    ("exec", true),
    ("h", false),
    ("help", false),
    ("version", false),
];

/// Rewrite flags into the shape clap expects.
///
/// Long names are accepted with one dash (`-limit 5`, `-timeout=2s`) and
/// boolean flags take an optional `=true`/`=false`. Values of flags that
/// take one are never rewritten, nor is anything after `--`. The first
/// token is the program name.
pub fn normalize_flags<I, T>(argv: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut argv = argv.into_iter().map(Into::into);
    let mut out: Vec<OsString> = argv.next().into_iter().collect();
    let mut value_next = false;
    let mut verbatim = false;

    for token in argv {
        if verbatim || std::mem::take(&mut value_next) {
            out.push(token);
            continue;
        }
        let Some(text) = token.to_str().map(str::to_owned) else {
            out.push(token);
            continue;
        };
        if text == "--" {
            verbatim = true;
            out.push(token);
            continue;
        }

        let Some(body) = text.strip_prefix("--").or_else(|| text.strip_prefix('-')) else {
            out.push(token);
            continue;
        };
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let Some(&(name, takes_value)) = FLAGS.iter().find(|(flag, _)| *flag == name) else {
            // Short clusters like `-ik` and attached values like `-fERROR`
            out.push(token);
            continue;
        };

        let flag = if name.len() == 1 {
            format!("-{}", name)
        } else {
            format!("--{}", name)
        };
        match (takes_value, value) {
            (true, Some(value)) => {
                out.push(flag.into());
                out.push(value.into());
            }
            (true, None) => {
                out.push(flag.into());
                value_next = true;
            }
            (false, None) => out.push(flag.into()),
            (false, Some(value)) => match parse_bool(value) {
                Some(true) => out.push(flag.into()),
                Some(false) => {}
                // Leave it for clap to reject
                None => out.push(token),
            },
        }
    }

    out
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a duration such as `300ms`, `1.5s` or `1h2m`
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    if text == "0" {
        return Ok(Duration::ZERO);
    }

    let invalid = || format!("invalid duration '{}'", input);
    let mut nanos = 0f64;
    let mut rest = text;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration '{}'", input)),
            unit => return Err(format!("unknown unit '{}' in duration '{}'", unit, input)),
        };
        nanos += value * scale;
        rest = &rest[unit_end..];
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}
