use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::monitoring::{MonitoringService, MonitoringSettings};
use crate::rollup::RecencyWindow;
use crate::roster::{ClassroomLabel, GeoPoint, Person, PersonId, School, SchoolId};
use crate::store::{InMemoryStore, ResponseStore, RosterDirectory, SeverityRow, StoreError};
use crate::surveys::{
    AnswerSet, NewResponse, ResponseScorer, StoredResponse, SubmitterRole, SurveySubmission,
};

pub(super) fn settings() -> MonitoringSettings {
    MonitoringSettings {
        window: RecencyWindow::new(2),
        recent_activity_limit: 5,
        query_timeout: Duration::from_millis(500),
    }
}

pub(super) fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

fn school(id: &str, name: &str, location: Option<(f64, f64)>) -> School {
    School {
        id: SchoolId::from(id),
        name: name.to_string(),
        center_code: Some(format!("C-{id}")),
        location: location.map(|(latitude, longitude)| GeoPoint {
            latitude,
            longitude,
        }),
    }
}

fn person(id: &str, school_id: &str, classroom: &str) -> Person {
    Person {
        id: PersonId::from(id),
        school_id: SchoolId::from(school_id),
        classroom: ClassroomLabel::new(classroom),
        display_name: None,
    }
}

/// Roster with two located schools and one without coordinates.
///
/// north: n-1, n-2 in 3A, n-3 in 4B. south: s-1 in 1A. east: nobody.
pub(super) fn roster_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    for school in [
        school("north", "North Primary", Some((39.48, -0.38))),
        school("south", "South Primary", Some((39.45, -0.36))),
        school("east", "East Annex", None),
    ] {
        store.upsert_school(school).expect("upsert school");
    }
    for person in [
        person("n-1", "north", "3A"),
        person("n-2", "north", "3A"),
        person("n-3", "north", "4B"),
        person("s-1", "south", "1A"),
    ] {
        store.upsert_person(person).expect("upsert person");
    }
    store
}

pub(super) fn service_with<S>(store: S) -> MonitoringService<S>
where
    S: ResponseStore + RosterDirectory + 'static,
{
    MonitoringService::new(Arc::new(store), ResponseScorer::reference(), settings())
}

pub(super) fn build_service() -> MonitoringService<InMemoryStore> {
    service_with(roster_store())
}

/// Parent answers with an injury report at the override threshold.
pub(super) fn critical_answers() -> AnswerSet {
    AnswerSet::new(SubmitterRole::Parent).with_item("p_item_2", 3)
}

/// Psychosomatic block at full intensity: total 20.
pub(super) fn high_answers() -> AnswerSet {
    (6..=10).fold(AnswerSet::new(SubmitterRole::Parent), |answers, index| {
        answers.with_item(format!("p_item_{index}"), 4)
    })
}

pub(super) fn low_answers() -> AnswerSet {
    AnswerSet::new(SubmitterRole::Teacher).with_item("t_vic_insults", 1)
}

pub(super) fn submission(person: &str, answers: AnswerSet, on: u32) -> SurveySubmission {
    SurveySubmission {
        person_id: PersonId::from(person),
        answers,
        submitted_at: Some(day(on)),
    }
}

/// n-1 had a critical response before two low ones; n-3 is currently high; s-1 is low.
pub(super) fn seeded_service() -> MonitoringService<InMemoryStore> {
    let service = build_service();
    for submission in [
        submission("n-1", critical_answers(), 1),
        submission("n-1", low_answers(), 2),
        submission("n-1", low_answers(), 3),
        submission("n-2", low_answers(), 3),
        submission("n-3", low_answers(), 2),
        submission("n-3", high_answers(), 4),
        submission("s-1", low_answers(), 4),
    ] {
        service.submit(submission).expect("submission accepted");
    }
    service
}

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

pub(super) struct UnavailableStore;

impl ResponseStore for UnavailableStore {
    fn insert(&self, _response: NewResponse) -> Result<StoredResponse, StoreError> {
        Err(offline())
    }

    fn history(&self, _person: &PersonId) -> Result<Vec<StoredResponse>, StoreError> {
        Err(offline())
    }

    fn ranked_severities(
        &self,
        _persons: &[PersonId],
        _limit: Option<usize>,
    ) -> Result<Vec<SeverityRow>, StoreError> {
        Err(offline())
    }

    fn recent_activity(
        &self,
        _persons: &[PersonId],
        _limit: usize,
    ) -> Result<Vec<StoredResponse>, StoreError> {
        Err(offline())
    }
}

impl RosterDirectory for UnavailableStore {
    fn upsert_school(&self, _school: School) -> Result<(), StoreError> {
        Err(offline())
    }

    fn upsert_person(&self, _person: Person) -> Result<(), StoreError> {
        Err(offline())
    }

    fn school(&self, _id: &SchoolId) -> Result<Option<School>, StoreError> {
        Err(offline())
    }

    fn schools(&self) -> Result<Vec<School>, StoreError> {
        Err(offline())
    }

    fn person(&self, _id: &PersonId) -> Result<Option<Person>, StoreError> {
        Err(offline())
    }

    fn persons_in_school(&self, _id: &SchoolId) -> Result<Vec<Person>, StoreError> {
        Err(offline())
    }

    fn persons(&self) -> Result<Vec<Person>, StoreError> {
        Err(offline())
    }
}

/// Roster store that stalls its severity query, or returns late from an insert that has
/// already been written.
pub(super) struct SlowStore {
    pub(super) inner: InMemoryStore,
    pub(super) query_delay: Duration,
    pub(super) insert_delay: Duration,
}

impl ResponseStore for SlowStore {
    fn insert(&self, response: NewResponse) -> Result<StoredResponse, StoreError> {
        let stored = self.inner.insert(response)?;
        std::thread::sleep(self.insert_delay);
        Ok(stored)
    }

    fn history(&self, person: &PersonId) -> Result<Vec<StoredResponse>, StoreError> {
        self.inner.history(person)
    }

    fn ranked_severities(
        &self,
        persons: &[PersonId],
        limit: Option<usize>,
    ) -> Result<Vec<SeverityRow>, StoreError> {
        std::thread::sleep(self.query_delay);
        self.inner.ranked_severities(persons, limit)
    }

    fn recent_activity(
        &self,
        persons: &[PersonId],
        limit: usize,
    ) -> Result<Vec<StoredResponse>, StoreError> {
        self.inner.recent_activity(persons, limit)
    }
}

impl RosterDirectory for SlowStore {
    fn upsert_school(&self, school: School) -> Result<(), StoreError> {
        self.inner.upsert_school(school)
    }

    fn upsert_person(&self, person: Person) -> Result<(), StoreError> {
        self.inner.upsert_person(person)
    }

    fn school(&self, id: &SchoolId) -> Result<Option<School>, StoreError> {
        self.inner.school(id)
    }

    fn schools(&self) -> Result<Vec<School>, StoreError> {
        self.inner.schools()
    }

    fn person(&self, id: &PersonId) -> Result<Option<Person>, StoreError> {
        self.inner.person(id)
    }

    fn persons_in_school(&self, id: &SchoolId) -> Result<Vec<Person>, StoreError> {
        self.inner.persons_in_school(id)
    }

    fn persons(&self) -> Result<Vec<Person>, StoreError> {
        self.inner.persons()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
