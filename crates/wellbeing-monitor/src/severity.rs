use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered risk classification of a single scored response.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn ordered() -> [Self; 4] {
        [Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Storage and wire code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// `High` and `Critical` responses put a person on the alert list.
    pub const fn is_alerting(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Max-reduction over the lattice. An empty input is the population default, `Low`.
    pub fn max_of<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        severities.into_iter().max().unwrap_or_default()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity code '{0}'")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseSeverityError(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_totally_ordered() {
        let ordered = Severity::ordered();
        assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn max_of_empty_is_low() {
        assert_eq!(Severity::max_of(Vec::new()), Severity::Low);
        assert_eq!(
            Severity::max_of([Severity::Medium, Severity::Critical, Severity::Low]),
            Severity::Critical
        );
    }

    #[test]
    fn storage_codes_parse_back() {
        for severity in Severity::ordered() {
            assert_eq!(severity.as_str().parse::<Severity>(), Ok(severity));
        }
        assert!("severe".parse::<Severity>().is_err());
    }
}
