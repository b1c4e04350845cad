mod config;
mod policy;
mod rules;

pub use config::{
    BlockRule, OverrideRule, RoleRules, ScoringConfig, ScoringConfigError, SeverityThresholds,
    MAX_INTENSITY,
};
pub use policy::recommendation_for;

use super::domain::{AnswerSet, ScoredResponse};
use crate::Severity;
use tracing::debug;

/// Stateless scorer applying a validated [`ScoringConfig`] to answer sets.
#[derive(Debug, Clone)]
pub struct ResponseScorer {
    config: ScoringConfig,
}

impl ResponseScorer {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn reference() -> Self {
        Self {
            config: ScoringConfig::reference(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one answer set under its role's rules.
    ///
    /// Only items belonging to the role's blocks are read. An intensity outside `0..=4` on
    /// one of those items fails the whole answer set; other identifiers are ignored.
    pub fn score(&self, answers: &AnswerSet) -> Result<ScoredResponse, ScoringError> {
        let role_rules = self.config.rules_for(answers.role);
        rules::validate_intensities(answers, role_rules)?;

        let blocks = rules::score_blocks(answers, role_rules);
        let total_score = blocks.iter().map(|block| block.score).sum();
        let mut flags = rules::block_flags(role_rules, &blocks);

        let overrides = rules::triggered_overrides(answers, role_rules);
        let severity = if overrides.is_empty() {
            policy::classify_total(&role_rules.thresholds, total_score)
        } else {
            for rule in overrides {
                rules::push_flag(&mut flags, &rule.flag);
            }
            Severity::Critical
        };

        debug!(role = %answers.role, total_score, %severity, "scored survey response");

        Ok(ScoredResponse {
            total_score,
            severity,
            flags,
            recommendation: recommendation_for(severity).to_string(),
            blocks,
        })
    }
}

impl Default for ResponseScorer {
    fn default() -> Self {
        Self::reference()
    }
}

/// Score with the reference rule set.
pub fn score_answers(answers: &AnswerSet) -> Result<ScoredResponse, ScoringError> {
    ResponseScorer::reference().score(answers)
}

/// Caller errors raised while scoring. Never corrected silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("item '{item}' has intensity {value}, expected 0..=4")]
    IntensityOutOfRange { item: String, value: i32 },
    #[error("unknown submitter role '{0}'")]
    UnknownRole(String),
}
