//! Filter file parsing
//!
//! A filter file lists one filter per line, highest priority first. Lines
//! starting with `#` are comments. If the first remaining line starts with
//! `-` or with a blank, it holds flags; a trailing `\` continues the flag
//! line onto the next one.

use std::path::Path;

/// Flags and filters read from a filter file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterFile {
    /// Flag tokens, quotes already removed
    pub args: Vec<String>,
    pub filters: Vec<String>,
}

impl FilterFile {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let lines: Vec<&str> = content
            .split('\n')
            .filter(|line| !line.trim().starts_with('#'))
            .collect();

        let Some(first) = lines.first() else {
            return Self::default();
        };

        let mut filter_start = 0;
        let mut args = Vec::new();

        if is_arg_line(first) {
            let mut joined = String::new();
            filter_start = lines.len();

            for (i, line) in lines.iter().enumerate() {
                let trimmed = line.trim();
                let (content, continues) = match trimmed.strip_suffix('\\') {
                    Some(head) => (head, true),
                    None => (trimmed, false),
                };

                if !joined.is_empty() {
                    joined.push(' ');
                }
                joined.push_str(content);

                if !continues {
                    filter_start = i + 1;
                    break;
                }
            }

            args = tokenize(&joined);
        }

        let filters = lines[filter_start..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Self { args, filters }
    }
}

fn is_arg_line(line: &str) -> bool {
    line.trim().starts_with('-') || line.starts_with([' ', '\t'])
}

/// Split on blanks, grouping single- or double-quoted text into one token
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => quote = Some(c),
                ' ' | '\t' => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            },
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
