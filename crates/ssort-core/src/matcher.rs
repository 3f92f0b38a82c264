use regex::Regex;

use crate::error::SetupError;
use crate::normalize::Normalizer;

/// One filter, folded and compiled up front
#[derive(Clone)]
struct CompiledFilter {
    /// Filter text after case folding
    text: String,

    /// Whole-word pattern, present only in word-boundary mode
    regex: Option<Regex>,
}

impl CompiledFilter {
    fn matches(&self, clean: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(clean),
            None => clean.contains(self.text.as_str()),
        }
    }
}

impl std::fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("text", &self.text)
            .field("word_boundary", &self.regex.is_some())
            .finish()
    }
}

/// Classifies normalized lines against the ordered filter list
#[derive(Clone, Debug)]
pub struct Matcher {
    filters: Vec<CompiledFilter>,
}

impl Matcher {
    /// Compile filters; folding is applied before any pattern is built
    pub fn new<S: AsRef<str>>(
        filters: &[S],
        normalizer: &Normalizer,
        word_boundary: bool,
    ) -> Result<Self, SetupError> {
        let filters = filters
            .iter()
            .map(|filter| {
                let text = normalizer.fold_filter(filter.as_ref()).into_owned();
                let regex = if word_boundary {
                    // ASCII word boundaries: accented letters count as separators
                    let pattern = format!(r"(?-u:\b){}(?-u:\b)", regex::escape(&text));
                    Some(
                        Regex::new(&pattern).map_err(|source| SetupError::InvalidPattern {
                            filter: text.clone(),
                            source,
                        })?,
                    )
                } else {
                    None
                };
                Ok(CompiledFilter { text, regex })
            })
            .collect::<Result<Vec<_>, SetupError>>()?;

        Ok(Self { filters })
    }

    /// Rank of the longest matching filter, earliest on equal length
    pub fn classify(&self, clean: &str) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;

        for (rank, filter) in self.filters.iter().enumerate() {
            if !filter.matches(clean) {
                continue;
            }
            let len = filter.text.len();
            // Strictly longer replaces, so ties keep the earlier rank
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((rank, len));
            }
        }

        best.map(|(rank, _)| rank)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
