use std::collections::BTreeMap;

use tracing::debug;

use super::window::RecencyWindow;
use crate::roster::PersonId;
use crate::store::{ResponseStore, SeverityRow, StoreError};
use crate::Severity;

/// Ranks rows per person by `(submitted_at desc, response_id desc)` and keeps ranks
/// `<= limit`. One sort over all rows, then a running count per group.
pub fn top_k_per_person(mut rows: Vec<SeverityRow>, limit: Option<usize>) -> Vec<SeverityRow> {
    rows.sort_by(|left, right| {
        left.person_id
            .cmp(&right.person_id)
            .then_with(|| right.submitted_at.cmp(&left.submitted_at))
            .then_with(|| right.response_id.cmp(&left.response_id))
    });

    let Some(limit) = limit else {
        return rows;
    };

    let mut kept = Vec::with_capacity(rows.len());
    let mut current: Option<PersonId> = None;
    let mut rank = 0usize;
    for row in rows {
        if current.as_ref() != Some(&row.person_id) {
            current = Some(row.person_id.clone());
            rank = 0;
        }
        rank += 1;
        if rank <= limit {
            kept.push(row);
        }
    }
    kept
}

/// Folds ranked rows into most-recent-first severities per person. Every id in `persons`
/// gets an entry, empty when it has no rows.
pub fn group_rows(
    persons: &[PersonId],
    rows: Vec<SeverityRow>,
) -> BTreeMap<PersonId, Vec<Severity>> {
    let mut grouped: BTreeMap<PersonId, Vec<Severity>> = persons
        .iter()
        .map(|person| (person.clone(), Vec::new()))
        .collect();
    for row in rows {
        grouped.entry(row.person_id).or_default().push(row.severity);
    }
    grouped
}

/// Windowed severities for many persons through a single store query.
pub fn bulk_windowed_severities<S>(
    store: &S,
    persons: &[PersonId],
    window: RecencyWindow,
) -> Result<BTreeMap<PersonId, Vec<Severity>>, StoreError>
where
    S: ResponseStore + ?Sized,
{
    let rows = store.ranked_severities(persons, Some(window.size()))?;
    debug!(
        persons = persons.len(),
        rows = rows.len(),
        window = window.size(),
        "loaded windowed severities"
    );
    Ok(group_rows(persons, rows))
}

/// Full most-recent-first severity histories for many persons through a single store query.
pub fn bulk_histories<S>(
    store: &S,
    persons: &[PersonId],
) -> Result<BTreeMap<PersonId, Vec<Severity>>, StoreError>
where
    S: ResponseStore + ?Sized,
{
    let rows = store.ranked_severities(persons, None)?;
    debug!(persons = persons.len(), rows = rows.len(), "loaded severity histories");
    Ok(group_rows(persons, rows))
}
