use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::window::RecencyWindow;
use crate::roster::PersonId;
use crate::Severity;

/// Traffic-light status of a classroom, school or the whole map.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Green,
    Orange,
    Red,
}

impl GroupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupStatus::Green => "green",
            GroupStatus::Orange => "orange",
            GroupStatus::Red => "red",
        }
    }

    /// Status implied by the worst contributing severity.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => GroupStatus::Red,
            Severity::High => GroupStatus::Orange,
            Severity::Medium | Severity::Low => GroupStatus::Green,
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which responses count towards a group status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "window")]
pub enum RollupPolicy {
    /// Only each person's most recent responses: "is anyone at risk now".
    CurrentWindow(RecencyWindow),
    /// Every response ever recorded: "has anyone here ever been at risk".
    FullHistory,
}

impl RollupPolicy {
    pub fn current() -> Self {
        RollupPolicy::CurrentWindow(RecencyWindow::default())
    }

    /// Per-person row limit for the bulk query; `None` means unlimited.
    pub fn row_limit(self) -> Option<usize> {
        match self {
            RollupPolicy::CurrentWindow(window) => Some(window.size()),
            RollupPolicy::FullHistory => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RollupPolicy::CurrentWindow(_) => "current",
            RollupPolicy::FullHistory => "historical",
        }
    }

    /// Keeps the variant but uses `window` for current-window policies.
    pub fn with_window(self, window: RecencyWindow) -> Self {
        match self {
            RollupPolicy::CurrentWindow(_) => RollupPolicy::CurrentWindow(window),
            RollupPolicy::FullHistory => RollupPolicy::FullHistory,
        }
    }

    fn contributing(self, severities: &[Severity]) -> &[Severity] {
        match self {
            RollupPolicy::CurrentWindow(window) => window.apply(severities),
            RollupPolicy::FullHistory => severities,
        }
    }
}

impl fmt::Display for RollupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rollup policy '{0}' (expected 'current' or 'historical')")]
pub struct ParsePolicyError(pub String);

impl FromStr for RollupPolicy {
    type Err = ParsePolicyError;

    /// Parses the policy name; the current-window form uses the default window size and
    /// callers substitute their configured one with [`RollupPolicy::with_window`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "current" | "current_window" => Ok(RollupPolicy::current()),
            "historical" | "full_history" => Ok(RollupPolicy::FullHistory),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Status of a group given each member's most-recent-first severities.
///
/// Red if any contributing severity is critical, orange if any is high, green otherwise
/// (including an empty group). Feeding input that is already windowed gives the same
/// answer as feeding the full histories.
pub fn group_status(
    histories_by_person: &BTreeMap<PersonId, Vec<Severity>>,
    policy: RollupPolicy,
) -> GroupStatus {
    let worst = Severity::max_of(
        histories_by_person
            .values()
            .flat_map(|severities| policy.contributing(severities).iter().copied()),
    );
    GroupStatus::from_severity(worst)
}

/// One person's standing under a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRisk {
    pub person_id: PersonId,
    pub current: Severity,
    pub alerting: bool,
    pub critical: bool,
    pub responses_considered: usize,
}

pub fn person_risk(person: &PersonId, severities: &[Severity], policy: RollupPolicy) -> PersonRisk {
    let contributing = policy.contributing(severities);
    let current = Severity::max_of(contributing.iter().copied());
    PersonRisk {
        person_id: person.clone(),
        current,
        alerting: current.is_alerting(),
        critical: current == Severity::Critical,
        responses_considered: contributing.len(),
    }
}

/// Worst of a set of statuses; school from classrooms, map from schools.
pub fn combine_statuses<I>(statuses: I) -> GroupStatus
where
    I: IntoIterator<Item = GroupStatus>,
{
    statuses.into_iter().max().unwrap_or_default()
}
