use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::super::domain::SubmitterRole;

/// Highest legal per-item intensity.
pub const MAX_INTENSITY: i32 = 4;

/// Externally supplied rule set: block membership, flag cut points, severity thresholds and
/// overrides for each submitter role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub version: String,
    pub teacher: RoleRules,
    pub parent: RoleRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRules {
    pub blocks: Vec<BlockRule>,
    pub thresholds: SeverityThresholds,
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
}

/// Items summed together; `flag` is raised when the sum is strictly above `flag_above`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub name: String,
    pub items: Vec<String>,
    pub flag: String,
    pub flag_above: u32,
}

/// Strict lower bounds on the total score for each severity above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub critical_above: u32,
    pub high_above: u32,
    pub medium_above: u32,
}

/// Forces `Critical` when any listed item reaches `trigger_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub items: Vec<String>,
    pub trigger_at: u8,
    pub flag: String,
}

impl ScoringConfig {
    /// Rule set the questionnaires were designed against (max total 52 for both roles).
    pub fn reference() -> Self {
        let thresholds = SeverityThresholds {
            critical_above: 25,
            high_above: 15,
            medium_above: 8,
        };

        let teacher = RoleRules {
            blocks: vec![
                block(
                    "victimization",
                    &[
                        "t_vic_insults",
                        "t_vic_exclusion",
                        "t_vic_physical",
                        "t_vic_theft",
                        "t_vic_rumors",
                        "t_vic_threats",
                    ],
                    "high_victimization",
                    10,
                ),
                block(
                    "aggression",
                    &[
                        "t_agg_insults",
                        "t_agg_exclusion",
                        "t_agg_physical",
                        "t_agg_theft",
                        "t_agg_rumors",
                    ],
                    "aggressive_behavior",
                    10,
                ),
                block(
                    "cyber",
                    &["t_cyber_messages", "t_cyber_anxiety"],
                    "cyberbullying_signs",
                    4,
                ),
            ],
            thresholds,
            overrides: Vec::new(),
        };

        let parent = RoleRules {
            blocks: vec![
                block(
                    "direct_material",
                    &["p_item_1", "p_item_2", "p_item_3", "p_item_4", "p_item_5"],
                    "direct_physical_high",
                    8,
                ),
                block(
                    "psychosomatic",
                    &["p_item_6", "p_item_7", "p_item_8", "p_item_9", "p_item_10"],
                    "high_psychosomatic_distress",
                    10,
                ),
                block(
                    "cyber",
                    &["p_item_11", "p_item_12", "p_item_13"],
                    "cyberbullying_signs",
                    5,
                ),
            ],
            thresholds,
            overrides: vec![OverrideRule {
                // injuries, coercion
                items: vec!["p_item_2".to_string(), "p_item_5".to_string()],
                trigger_at: 3,
                flag: "critical_marker_injury_or_coercion".to_string(),
            }],
        };

        Self {
            version: "reference-1".to_string(),
            teacher,
            parent,
        }
    }

    pub fn rules_for(&self, role: SubmitterRole) -> &RoleRules {
        match role {
            SubmitterRole::Teacher => &self.teacher,
            SubmitterRole::Parent => &self.parent,
        }
    }

    /// Load and validate a JSON rule set.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScoringConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ScoringConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        self.teacher.validate(SubmitterRole::Teacher)?;
        self.parent.validate(SubmitterRole::Parent)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl RoleRules {
    /// Largest total this rule set can produce.
    pub fn max_total(&self) -> u32 {
        let items: usize = self.blocks.iter().map(|block| block.items.len()).sum();
        items as u32 * MAX_INTENSITY as u32
    }

    /// Whether scoring under these rules reads `item` at all.
    pub fn reads(&self, item: &str) -> bool {
        self.blocks
            .iter()
            .any(|block| block.items.iter().any(|candidate| candidate == item))
    }

    fn validate(&self, role: SubmitterRole) -> Result<(), ScoringConfigError> {
        let invalid = |reason: String| ScoringConfigError::Invalid { role, reason };

        let SeverityThresholds {
            critical_above,
            high_above,
            medium_above,
        } = self.thresholds;
        if !(medium_above <= high_above && high_above <= critical_above) {
            return Err(invalid(format!(
                "thresholds must satisfy medium ({medium_above}) <= high ({high_above}) <= critical ({critical_above})"
            )));
        }

        let mut seen = HashSet::new();
        for block in &self.blocks {
            if block.items.is_empty() {
                return Err(invalid(format!("block '{}' lists no items", block.name)));
            }
            for item in &block.items {
                if !seen.insert(item.as_str()) {
                    return Err(invalid(format!("item '{item}' belongs to more than one block")));
                }
            }
        }

        for rule in &self.overrides {
            if i32::from(rule.trigger_at) > MAX_INTENSITY {
                return Err(invalid(format!(
                    "override trigger {} exceeds max intensity {MAX_INTENSITY}",
                    rule.trigger_at
                )));
            }
            if let Some(item) = rule.items.iter().find(|item| !seen.contains(item.as_str())) {
                return Err(invalid(format!("override item '{item}' is not scored by any block")));
            }
        }

        Ok(())
    }
}

fn block(name: &str, items: &[&str], flag: &str, flag_above: u32) -> BlockRule {
    BlockRule {
        name: name.to_string(),
        items: items.iter().map(|item| item.to_string()).collect(),
        flag: flag.to_string(),
        flag_above,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringConfigError {
    #[error("failed to read scoring configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scoring configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid {role} scoring rules: {reason}")]
    Invalid { role: SubmitterRole, reason: String },
}
