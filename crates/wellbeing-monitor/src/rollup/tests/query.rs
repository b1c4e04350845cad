use super::common::*;
use crate::roster::PersonId;
use crate::rollup::{
    bulk_histories, bulk_windowed_severities, rank_history, top_k_per_person, windowed_severities,
    RecencyWindow,
};
use crate::store::{ResponseStore, SeverityRow};
use crate::surveys::ResponseId;

fn row(person: &str, id: i64, day: i64, severity: crate::Severity) -> SeverityRow {
    SeverityRow {
        person_id: PersonId::from(person),
        response_id: ResponseId(id),
        submitted_at: base_time() + chrono::Duration::days(day),
        severity,
    }
}

#[test]
fn top_k_groups_and_ranks_rows() {
    let rows = vec![
        row("b", 1, 1, Low),
        row("a", 2, 1, High),
        row("a", 3, 3, Low),
        row("b", 4, 2, Critical),
        row("a", 5, 3, Medium),
    ];

    let ranked = top_k_per_person(rows.clone(), Some(2));
    let ids: Vec<i64> = ranked.iter().map(|row| row.response_id.0).collect();
    assert_eq!(ids, vec![5, 3, 4, 1]);

    assert_eq!(top_k_per_person(rows.clone(), None).len(), rows.len());
    assert!(top_k_per_person(rows, Some(0)).is_empty());
}

#[test]
fn bulk_window_matches_per_person_windowing() {
    let store = seeded_store(&[
        ("s-1", &[Low, Critical, Low, Low]),
        ("s-2", &[High]),
        ("s-3", &[Medium, Medium, High]),
    ]);
    let persons: Vec<PersonId> = ["s-1", "s-2", "s-3", "s-4"]
        .into_iter()
        .map(PersonId::from)
        .collect();

    for size in 1..=5 {
        let window = RecencyWindow::new(size);
        let bulk = bulk_windowed_severities(&store, &persons, window).expect("bulk query");

        for person in &persons {
            let mut history = store.history(person).expect("history");
            rank_history(&mut history);
            assert_eq!(bulk[person], windowed_severities(&history, window), "{person} k={size}");
        }
    }
}

#[test]
fn every_requested_person_appears() {
    let store = seeded_store(&[("s-1", &[High])]);
    let persons = vec![PersonId::from("s-1"), PersonId::from("ghost")];

    let windowed = bulk_windowed_severities(&store, &persons, RecencyWindow::default())
        .expect("bulk query");
    assert_eq!(windowed.len(), 2);
    assert!(windowed[&PersonId::from("ghost")].is_empty());

    let everything = bulk_histories(&store, &[]).expect("bulk query");
    assert!(everything.is_empty());
}

#[test]
fn histories_keep_every_response_newest_first() {
    let store = seeded_store(&[("s-1", &[Critical, Low, Medium])]);
    let persons = vec![PersonId::from("s-1")];

    let histories = bulk_histories(&store, &persons).expect("bulk query");

    assert_eq!(histories[&persons[0]], vec![Medium, Low, Critical]);
}
