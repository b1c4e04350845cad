use super::config::SeverityThresholds;
use crate::Severity;

/// Threshold classification; every comparison is strict.
pub(crate) fn classify_total(thresholds: &SeverityThresholds, total: u32) -> Severity {
    if total > thresholds.critical_above {
        Severity::Critical
    } else if total > thresholds.high_above {
        Severity::High
    } else if total > thresholds.medium_above {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Guidance shown with a scored response. Depends on the final severity only.
pub fn recommendation_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => {
            "Alert: serious indicators detected. Immediate intervention by the school is required."
        }
        Severity::High => {
            "High risk: consistent concerning patterns observed. We recommend requesting a tutoring meeting."
        }
        Severity::Medium => "Caution: keep observing. There are signs of distress.",
        Severity::Low => "No appreciable risk at present. Continue routine monitoring.",
    }
}
