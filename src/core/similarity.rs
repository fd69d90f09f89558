//! Duplicate screening by lexical overlap.
//!
//! Summaries are reduced to sets of lower-cased alphanumeric tokens and
//! compared with the Jaccard index `|A ∩ B| / |A ∪ B|`. The same
//! normalization is applied to every string, so a verdict depends only on
//! the text and the thresholds.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::core::task::TaskId;
use crate::{tlog_trace, Error, Result};

/// Runs of letters or digits in any script; everything else separates tokens.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

/// The `[duplicates]` configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Scores at or above this are a match (inclusive).
    pub match_threshold: f64,
    /// Scores below this are no match; the band in between is inconclusive.
    pub low_threshold: f64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.8,
            low_threshold: 0.5,
        }
    }
}

impl DuplicateConfig {
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.low_threshold
            && self.low_threshold <= self.match_threshold
            && self.match_threshold <= 1.0;
        if !ordered {
            return Err(Error::Config(format!(
                "duplicate thresholds must satisfy 0 <= low ({}) <= match ({}) <= 1",
                self.low_threshold, self.match_threshold
            )));
        }
        Ok(())
    }
}

/// Classification of a candidate summary against the open backlog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// An open task already covers the candidate.
    Match { task_id: TaskId, score: f64 },
    /// Nothing in the comparison set is close.
    NoMatch,
    /// The closest task is similar but below the match threshold, or the
    /// candidate has no comparable tokens. `task_id` is the closest task when
    /// there is one.
    Inconclusive {
        task_id: Option<TaskId>,
        score: f64,
    },
}

impl Verdict {
    /// `0` no match, `1` match, `2` inconclusive.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::NoMatch => 0,
            Verdict::Match { .. } => 1,
            Verdict::Inconclusive { .. } => 2,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match { .. })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Match { task_id, score } => {
                write!(f, "match: task {} (similarity {:.2})", task_id, score)
            }
            Verdict::NoMatch => write!(f, "no match"),
            Verdict::Inconclusive {
                task_id: Some(id),
                score,
            } => write!(f, "inconclusive: closest task {} (similarity {:.2})", id, score),
            Verdict::Inconclusive { task_id: None, .. } => {
                write!(f, "inconclusive: nothing to compare")
            }
        }
    }
}

/// Lower-cased token set of a summary.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard index of two token sets; two empty sets score 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Similarity of two summaries in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

/// Screens candidate summaries against existing ones.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: DuplicateConfig,
}

impl DuplicateDetector {
    pub fn new(config: DuplicateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DuplicateConfig {
        &self.config
    }

    /// Classify `candidate` against `existing` `(id, summary)` pairs.
    ///
    /// The best score wins; equal scores go to the lowest id.
    pub fn classify<'a, I>(&self, candidate: &str, existing: I) -> Verdict
    where
        I: IntoIterator<Item = (TaskId, &'a str)>,
    {
        let candidate_tokens = tokenize(candidate);
        if candidate_tokens.is_empty() {
            return Verdict::Inconclusive {
                task_id: None,
                score: 0.0,
            };
        }

        let mut best: Option<(TaskId, f64)> = None;
        for (id, summary) in existing {
            let score = jaccard(&candidate_tokens, &tokenize(summary));
            tlog_trace!("similarity candidate={:?} task={} score={:.3}", candidate, id, score);
            best = match best {
                Some((best_id, best_score))
                    if best_score > score || (best_score == score && best_id < id) =>
                {
                    Some((best_id, best_score))
                }
                _ => Some((id, score)),
            };
        }

        match best {
            Some((task_id, score)) if score >= self.config.match_threshold => {
                Verdict::Match { task_id, score }
            }
            Some((task_id, score)) if score >= self.config.low_threshold => {
                Verdict::Inconclusive {
                    task_id: Some(task_id),
                    score,
                }
            }
            _ => Verdict::NoMatch,
        }
    }
}
