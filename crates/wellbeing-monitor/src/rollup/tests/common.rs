use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::roster::PersonId;
use crate::store::{InMemoryStore, ResponseStore};
use crate::surveys::{
    recommendation_for, NewResponse, ResponseId, ScoredResponse, StoredResponse, SubmitterRole,
};
use crate::Severity;

pub(super) use Severity::{Critical, High, Low, Medium};

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn scored(severity: Severity) -> ScoredResponse {
    ScoredResponse {
        total_score: 0,
        severity,
        flags: Vec::new(),
        recommendation: recommendation_for(severity).to_string(),
        blocks: Vec::new(),
    }
}

/// History with the given severities, most recent first, one day apart.
pub(super) fn history(person: &str, most_recent_first: &[Severity]) -> Vec<StoredResponse> {
    let count = most_recent_first.len() as i64;
    most_recent_first
        .iter()
        .enumerate()
        .map(|(offset, severity)| StoredResponse {
            id: ResponseId(count - offset as i64),
            person_id: PersonId::from(person),
            role: SubmitterRole::Parent,
            submitted_at: base_time() + Duration::days(count - offset as i64),
            scored: scored(*severity),
        })
        .collect()
}

pub(super) fn histories(entries: &[(&str, &[Severity])]) -> BTreeMap<PersonId, Vec<Severity>> {
    entries
        .iter()
        .map(|(person, severities)| (PersonId::from(*person), severities.to_vec()))
        .collect()
}

/// Store seeded chronologically: each person's severities are given oldest first.
pub(super) fn seeded_store(entries: &[(&str, &[Severity])]) -> InMemoryStore {
    let store = InMemoryStore::new();
    for (person, oldest_first) in entries {
        for (day, severity) in oldest_first.iter().enumerate() {
            store
                .insert(NewResponse {
                    person_id: PersonId::from(*person),
                    role: SubmitterRole::Teacher,
                    submitted_at: base_time() + Duration::days(day as i64),
                    scored: scored(*severity),
                })
                .expect("insert");
        }
    }
    store
}
