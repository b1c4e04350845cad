//! Survey answer sets and the deterministic response scorer.

pub mod domain;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use domain::{
    AnswerSet, BlockScore, NewResponse, ResponseId, ScoredResponse, StoredResponse,
    SubmitterRole, SurveySubmission,
};
pub use scoring::{
    recommendation_for, score_answers, BlockRule, OverrideRule, ResponseScorer, RoleRules,
    ScoringConfig, ScoringConfigError, ScoringError, SeverityThresholds,
};
