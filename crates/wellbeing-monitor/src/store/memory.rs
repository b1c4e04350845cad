use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ResponseStore, RosterDirectory, SeverityRow, StoreError};
use crate::rollup::{rank_history, top_k_per_person};
use crate::roster::{Person, PersonId, School, SchoolId};
use crate::surveys::{NewResponse, ResponseId, StoredResponse};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    responses: Vec<StoredResponse>,
    by_person: HashMap<PersonId, Vec<usize>>,
    schools: BTreeMap<SchoolId, School>,
    persons: BTreeMap<PersonId, Person>,
}

/// Process-local store backing tests, the demo and database-less deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl ResponseStore for InMemoryStore {
    fn insert(&self, response: NewResponse) -> Result<StoredResponse, StoreError> {
        let mut state = self.state()?;
        state.next_id += 1;
        let stored = StoredResponse {
            id: ResponseId(state.next_id),
            person_id: response.person_id,
            role: response.role,
            submitted_at: response.submitted_at,
            scored: response.scored,
        };

        let index = state.responses.len();
        state.responses.push(stored.clone());
        state
            .by_person
            .entry(stored.person_id.clone())
            .or_default()
            .push(index);
        Ok(stored)
    }

    fn history(&self, person: &PersonId) -> Result<Vec<StoredResponse>, StoreError> {
        let state = self.state()?;
        let mut history: Vec<StoredResponse> = state
            .by_person
            .get(person)
            .into_iter()
            .flatten()
            .map(|&index| state.responses[index].clone())
            .collect();
        rank_history(&mut history);
        Ok(history)
    }

    fn ranked_severities(
        &self,
        persons: &[PersonId],
        limit: Option<usize>,
    ) -> Result<Vec<SeverityRow>, StoreError> {
        let state = self.state()?;
        let requested: HashSet<&PersonId> = persons.iter().collect();
        let rows = requested
            .into_iter()
            .filter_map(|person| state.by_person.get(person))
            .flatten()
            .map(|&index| SeverityRow::from(&state.responses[index]))
            .collect();
        Ok(top_k_per_person(rows, limit))
    }

    fn recent_activity(
        &self,
        persons: &[PersonId],
        limit: usize,
    ) -> Result<Vec<StoredResponse>, StoreError> {
        let state = self.state()?;
        let requested: HashSet<&PersonId> = persons.iter().collect();
        let mut recent: Vec<StoredResponse> = requested
            .into_iter()
            .filter_map(|person| state.by_person.get(person))
            .flatten()
            .map(|&index| state.responses[index].clone())
            .collect();
        rank_history(&mut recent);
        recent.truncate(limit);
        Ok(recent)
    }
}

impl RosterDirectory for InMemoryStore {
    fn upsert_school(&self, school: School) -> Result<(), StoreError> {
        self.state()?.schools.insert(school.id.clone(), school);
        Ok(())
    }

    fn upsert_person(&self, person: Person) -> Result<(), StoreError> {
        self.state()?.persons.insert(person.id.clone(), person);
        Ok(())
    }

    fn school(&self, id: &SchoolId) -> Result<Option<School>, StoreError> {
        Ok(self.state()?.schools.get(id).cloned())
    }

    fn schools(&self) -> Result<Vec<School>, StoreError> {
        Ok(self.state()?.schools.values().cloned().collect())
    }

    fn person(&self, id: &PersonId) -> Result<Option<Person>, StoreError> {
        Ok(self.state()?.persons.get(id).cloned())
    }

    fn persons_in_school(&self, id: &SchoolId) -> Result<Vec<Person>, StoreError> {
        Ok(self
            .state()?
            .persons
            .values()
            .filter(|person| &person.school_id == id)
            .cloned()
            .collect())
    }

    fn persons(&self) -> Result<Vec<Person>, StoreError> {
        Ok(self.state()?.persons.values().cloned().collect())
    }
}
