//! Storage abstractions for scored responses and the school roster.
//!
//! Both traits are synchronous so the service can be exercised in isolation; HTTP handlers
//! move calls onto the blocking pool.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roster::{Person, PersonId, School, SchoolId};
use crate::surveys::{NewResponse, ResponseId, StoredResponse};
use crate::Severity;

/// Projection of a stored response used by the bulk aggregation query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityRow {
    pub person_id: PersonId,
    pub response_id: ResponseId,
    pub submitted_at: DateTime<Utc>,
    pub severity: Severity,
}

impl From<&StoredResponse> for SeverityRow {
    fn from(response: &StoredResponse) -> Self {
        Self {
            person_id: response.person_id.clone(),
            response_id: response.id,
            submitted_at: response.submitted_at,
            severity: response.severity(),
        }
    }
}

/// Append-only store of scored responses.
///
/// A response must be visible to every query issued after `insert` returns.
pub trait ResponseStore: Send + Sync {
    fn insert(&self, response: NewResponse) -> Result<StoredResponse, StoreError>;

    /// Full history of one person, most recent first.
    fn history(&self, person: &PersonId) -> Result<Vec<StoredResponse>, StoreError>;

    /// Responses of all `persons` in one pass, ranked per person by
    /// `(submitted_at desc, response_id desc)` and cut to rank `<= limit` when a limit is
    /// given. Rows are grouped by person, most recent first within each group.
    fn ranked_severities(
        &self,
        persons: &[PersonId],
        limit: Option<usize>,
    ) -> Result<Vec<SeverityRow>, StoreError>;

    /// Latest `limit` responses across all `persons`, most recent first.
    fn recent_activity(
        &self,
        persons: &[PersonId],
        limit: usize,
    ) -> Result<Vec<StoredResponse>, StoreError>;
}

/// Read access to schools and their members, plus the upserts used by imports.
pub trait RosterDirectory: Send + Sync {
    fn upsert_school(&self, school: School) -> Result<(), StoreError>;
    fn upsert_person(&self, person: Person) -> Result<(), StoreError>;
    fn school(&self, id: &SchoolId) -> Result<Option<School>, StoreError>;
    fn schools(&self) -> Result<Vec<School>, StoreError>;
    fn person(&self, id: &PersonId) -> Result<Option<Person>, StoreError>;
    fn persons_in_school(&self, id: &SchoolId) -> Result<Vec<Person>, StoreError>;
    fn persons(&self) -> Result<Vec<Person>, StoreError>;
}

/// Store failures. "No data" is never an error; these mean the data could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query timed out")]
    Timeout,
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Transient failures the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout)
    }
}
