//! Configuration layering
//!
//! Every option resolves as: command line, then filter file flags, then the
//! built-in default. The engine only ever sees the merged [`RunConfig`].

use std::path::PathBuf;
use std::time::Duration;

use ssort_types::{DEFAULT_TIMEOUT, InputSource, RunConfig};

use crate::cli::Args;
use crate::expand::expand;
use crate::filter_file::{FilterFile, tokenize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading filter file '{}'", path.display())]
    ReadFilterFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing args in filter file")]
    FileArgs(#[source] clap::Error),
}

/// One configuration tier; `None` defers to the tier below
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Layer {
    filters: Option<String>,
    only_matching: Option<bool>,
    keep_unmatched: Option<bool>,
    ignore_case: Option<bool>,
    limit: Option<usize>,
    timeout: Option<Duration>,
    color: Option<bool>,
    word_boundary: Option<bool>,
    exec: Option<String>,
}

impl Layer {
    fn from_args(args: &Args) -> Self {
        Self {
            filters: args.filters.clone(),
            only_matching: args.only_matching.then_some(true),
            keep_unmatched: args.keep_going.then_some(true),
            ignore_case: args.ignore_case.then_some(true),
            limit: args.limit,
            timeout: args.timeout,
            color: args.color.then_some(true),
            word_boundary: args.word_boundary.then_some(true),
            exec: args.exec.clone(),
        }
    }

    /// Fill every unset option from `lower`
    fn over(self, lower: Layer) -> Layer {
        Layer {
            filters: self.filters.or(lower.filters),
            only_matching: self.only_matching.or(lower.only_matching),
            keep_unmatched: self.keep_unmatched.or(lower.keep_unmatched),
            ignore_case: self.ignore_case.or(lower.ignore_case),
            limit: self.limit.or(lower.limit),
            timeout: self.timeout.or(lower.timeout),
            color: self.color.or(lower.color),
            word_boundary: self.word_boundary.or(lower.word_boundary),
            exec: self.exec.or(lower.exec),
        }
    }
}

/// Read the filter file named on the command line (if any) and merge
pub fn resolve(args: Args) -> Result<RunConfig, ConfigError> {
    let file = match &args.filter_file {
        Some(path) => FilterFile::load(path).map_err(|source| ConfigError::ReadFilterFile {
            path: path.clone(),
            source,
        })?,
        None => FilterFile::default(),
    };

    merge(&args, file)
}

/// Merge command-line flags with an already parsed filter file
pub fn merge(args: &Args, file: FilterFile) -> Result<RunConfig, ConfigError> {
    let file_layer = if file.args.is_empty() {
        Layer::default()
    } else {
        let file_args = Args::parse_tokens(file.args).map_err(ConfigError::FileArgs)?;
        Layer::from_args(&file_args)
    };

    let merged = Layer::from_args(args).over(file_layer);
    let defaults = RunConfig::default();

    // File filters keep their order ahead of the -f list
    let mut filters = file.filters;
    if let Some(list) = &merged.filters {
        filters.extend(
            list.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        );
    }

    let source = match merged.exec.as_deref() {
        Some(command) if !command.is_empty() => {
            InputSource::Command(tokenize(command).iter().map(|t| expand(t)).collect())
        }
        _ => InputSource::Stdin,
    };

    Ok(RunConfig {
        filters,
        ignore_case: merged.ignore_case.unwrap_or(defaults.ignore_case),
        word_boundary: merged.word_boundary.unwrap_or(defaults.word_boundary),
        only_matching: merged.only_matching.unwrap_or(defaults.only_matching),
        keep_unmatched: merged.keep_unmatched.unwrap_or(defaults.keep_unmatched),
        limit: merged.limit.unwrap_or(defaults.limit),
        timeout: merged.timeout.unwrap_or(DEFAULT_TIMEOUT),
        color: merged.color.unwrap_or(defaults.color),
        source,
    })
}
