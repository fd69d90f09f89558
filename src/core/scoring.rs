//! WSJF (Weighted Shortest Job First) priority scoring.
//!
//! A task's score is its business value divided by its estimated size,
//! scaled to an integer so scores sort cleanly:
//!
//! ```text
//! priority_score = round(scale * value_weight(priority) / size_weight(complexity))
//! ```
//!
//! Scoring reads nothing but the task's own attributes. Batch recomputation
//! is therefore order independent and deterministic.

use serde::{Deserialize, Serialize};

use crate::core::task::{Complexity, Priority, TaskId};
use crate::{Error, Result};

/// Value weight per priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub highest: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub lowest: i64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            highest: 5,
            high: 4,
            medium: 3,
            low: 2,
            lowest: 1,
        }
    }
}

impl PriorityWeights {
    pub fn weight(&self, priority: Priority) -> i64 {
        match priority {
            Priority::Highest => self.highest,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
            Priority::Lowest => self.lowest,
        }
    }
}

/// Size weight per complexity estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityWeights {
    pub xs: i64,
    pub s: i64,
    pub m: i64,
    pub l: i64,
    pub xl: i64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            xs: 1,
            s: 2,
            m: 3,
            l: 4,
            xl: 5,
        }
    }
}

impl ComplexityWeights {
    pub fn weight(&self, complexity: Complexity) -> i64 {
        match complexity {
            Complexity::XS => self.xs,
            Complexity::S => self.s,
            Complexity::M => self.m,
            Complexity::L => self.l,
            Complexity::XL => self.xl,
        }
    }
}

/// The `[scoring]` configuration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub priority_weights: PriorityWeights,
    pub complexity_weights: ComplexityWeights,
    /// Size assumed for tasks without a complexity estimate. Defaults to `M`,
    /// the middle of the scale, so unestimated work neither jumps the queue
    /// nor sinks to the bottom.
    pub unset_complexity: Complexity,
    /// The constant `K`; large enough that distinct weight ratios stay
    /// distinct after rounding.
    pub scale: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            priority_weights: PriorityWeights::default(),
            complexity_weights: ComplexityWeights::default(),
            unset_complexity: Complexity::M,
            scale: 100,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scale <= 0 {
            return Err(Error::Config(format!(
                "scoring.scale must be positive, got {}",
                self.scale
            )));
        }
        for priority in Priority::ALL {
            let w = self.priority_weights.weight(priority);
            if w <= 0 {
                return Err(Error::Config(format!(
                    "scoring.priority_weights.{} must be positive, got {}",
                    priority.as_str().to_lowercase(),
                    w
                )));
            }
        }
        let max_value = Priority::ALL
            .into_iter()
            .map(|p| self.priority_weights.weight(p))
            .max()
            .unwrap_or(1);
        if self.scale.checked_mul(max_value).is_none() {
            return Err(Error::Config(format!(
                "scoring.scale {} overflows with priority weight {}",
                self.scale, max_value
            )));
        }
        for complexity in Complexity::ALL {
            let w = self.complexity_weights.weight(complexity);
            if w <= 0 {
                return Err(Error::Config(format!(
                    "scoring.complexity_weights.{} must be positive, got {}",
                    complexity.as_str().to_lowercase(),
                    w
                )));
            }
        }
        Ok(())
    }
}

/// Pure scoring function over a task's ordinal attributes.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    config: ScoringConfig,
}

impl PriorityScorer {
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score typed attributes.
    pub fn score(&self, priority: Priority, complexity: Option<Complexity>) -> i64 {
        let value = self.config.priority_weights.weight(priority);
        let size = self
            .config
            .complexity_weights
            .weight(complexity.unwrap_or(self.config.unset_complexity));
        let raw = self.config.scale as f64 * value as f64 / size as f64;
        raw.round() as i64
    }

    /// Score attributes as stored, failing on values outside the enums.
    ///
    /// An empty or missing complexity is the documented unset case; any other
    /// unrecognized text is an error rather than a silent default.
    pub fn score_raw(&self, priority: &str, complexity: Option<&str>) -> Result<i64> {
        let priority: Priority = priority.parse()?;
        let complexity = match complexity.map(str::trim) {
            None | Some("") => None,
            Some(c) => Some(c.parse::<Complexity>()?),
        };
        Ok(self.score(priority, complexity))
    }
}

/// Outcome of scoring a single task inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreFailure {
    pub task_id: TaskId,
    pub reason: String,
}

/// Summary of a bulk recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecomputeReport {
    /// Open tasks rescored; unchanged scores count too.
    pub updated: usize,
    /// Tasks that could not be scored; their stored score is left as is.
    pub failures: Vec<ScoreFailure>,
}

impl RecomputeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
