use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scoring::ScoringError;
use crate::roster::PersonId;
use crate::Severity;

/// Who filled in the questionnaire. Each role is scored by its own rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitterRole {
    Parent,
    Teacher,
}

impl SubmitterRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Teacher => "teacher",
        }
    }
}

impl fmt::Display for SubmitterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitterRole {
    type Err = ScoringError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(Self::Parent),
            "teacher" => Ok(Self::Teacher),
            _ => Err(ScoringError::UnknownRole(value.to_string())),
        }
    }
}

/// Raw per-item intensities of one submitted survey.
///
/// Values are kept as raw integers so that out-of-range answers reach the scorer and are
/// reported instead of being lost during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub role: SubmitterRole,
    #[serde(default)]
    pub items: BTreeMap<String, Option<i32>>,
}

impl AnswerSet {
    pub fn new(role: SubmitterRole) -> Self {
        Self {
            role,
            items: BTreeMap::new(),
        }
    }

    pub fn with_item(mut self, item: impl Into<String>, intensity: i32) -> Self {
        self.items.insert(item.into(), Some(intensity));
        self
    }

    /// Intensity of `item`, `None` when absent or explicitly blank.
    pub fn intensity(&self, item: &str) -> Option<i32> {
        self.items.get(item).copied().flatten()
    }

    pub fn present(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.items
            .iter()
            .filter_map(|(item, value)| value.map(|value| (item.as_str(), value)))
    }
}

/// Per-block subtotal kept alongside the score for audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockScore {
    pub block: String,
    pub score: u32,
}

/// Outcome of scoring one [`AnswerSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResponse {
    pub total_score: u32,
    pub severity: Severity,
    pub flags: Vec<String>,
    pub recommendation: String,
    #[serde(default)]
    pub blocks: Vec<BlockScore>,
}

/// A survey as received from a form or an import, before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub person_id: PersonId,
    pub answers: AnswerSet,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub i64);

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scored response ready to be written to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResponse {
    pub person_id: PersonId,
    pub role: SubmitterRole,
    pub submitted_at: DateTime<Utc>,
    pub scored: ScoredResponse,
}

/// Persisted response. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub id: ResponseId,
    pub person_id: PersonId,
    pub role: SubmitterRole,
    pub submitted_at: DateTime<Utc>,
    pub scored: ScoredResponse,
}

impl StoredResponse {
    pub fn severity(&self) -> Severity {
        self.scored.severity
    }
}
