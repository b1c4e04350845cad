use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::views::{
    ActivityDigest, ClassroomDashboard, ClassroomSummary, MapOverview, PersonStatus,
    SchoolDashboard, SchoolStatus, StatusCounts,
};
use crate::rollup::{
    combine_statuses, group_rows, group_status, person_risk, windowed_severities, RecencyWindow,
    RollupPolicy,
};
use crate::roster::{ClassroomKey, ClassroomLabel, Person, PersonId, School, SchoolId};
use crate::store::{ResponseStore, RosterDirectory, StoreError};
use crate::surveys::{
    AnswerSet, NewResponse, ResponseScorer, ScoredResponse, ScoringError, StoredResponse,
    SurveySubmission,
};
use crate::Severity;

/// Tunables shared by every dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringSettings {
    pub window: RecencyWindow,
    pub recent_activity_limit: usize,
    pub query_timeout: Duration,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            window: RecencyWindow::default(),
            recent_activity_limit: 20,
            query_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Service composing the scorer, the response store and the rollup engine.
pub struct MonitoringService<S> {
    store: Arc<S>,
    scorer: Arc<ResponseScorer>,
    settings: MonitoringSettings,
}

impl<S> MonitoringService<S>
where
    S: ResponseStore + RosterDirectory + 'static,
{
    pub fn new(store: Arc<S>, scorer: ResponseScorer, settings: MonitoringSettings) -> Self {
        Self {
            store,
            scorer: Arc::new(scorer),
            settings,
        }
    }

    pub fn settings(&self) -> &MonitoringSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current-window policy using the configured window size.
    pub fn current_policy(&self) -> RollupPolicy {
        RollupPolicy::CurrentWindow(self.settings.window)
    }

    /// Score and persist a response for a known person.
    pub fn submit(&self, submission: SurveySubmission) -> Result<StoredResponse, ServiceError> {
        let person = self.require_person(&submission.person_id)?;
        let scored = self.scorer.score(&submission.answers)?;

        let stored = self.store.insert(NewResponse {
            person_id: person.id.clone(),
            role: submission.answers.role,
            submitted_at: submission.submitted_at.unwrap_or_else(Utc::now),
            scored,
        })?;

        if stored.severity() == Severity::Critical {
            warn!(
                person_id = %stored.person_id,
                school_id = %person.school_id,
                classroom = %person.classroom,
                response_id = stored.id.0,
                flags = ?stored.scored.flags,
                "critical wellbeing response recorded"
            );
        } else {
            info!(
                person_id = %stored.person_id,
                response_id = stored.id.0,
                severity = %stored.severity(),
                "wellbeing response recorded"
            );
        }

        Ok(stored)
    }

    /// Score without persisting anything.
    pub fn preview(&self, answers: &AnswerSet) -> Result<ScoredResponse, ServiceError> {
        Ok(self.scorer.score(answers)?)
    }

    pub fn person_status(&self, person_id: &PersonId) -> Result<PersonStatus, ServiceError> {
        let person = self.require_person(person_id)?;
        let history = self.store.history(person_id)?;
        let windowed = windowed_severities(&history, self.settings.window);
        let current = Severity::max_of(windowed.iter().copied());

        Ok(PersonStatus {
            person_id: person.id,
            school_id: person.school_id,
            classroom: person.classroom,
            window: self.settings.window.size(),
            windowed,
            current,
            alerting: current.is_alerting(),
            total_responses: history.len(),
            last_submitted_at: history.first().map(|response| response.submitted_at),
        })
    }

    pub fn classroom_dashboard(
        &self,
        school_id: &SchoolId,
        classroom: &ClassroomLabel,
        policy: RollupPolicy,
    ) -> Result<ClassroomDashboard, ServiceError> {
        self.require_school(school_id)?;
        let key = ClassroomKey {
            school_id: school_id.clone(),
            label: classroom.clone(),
        };
        let members: Vec<PersonId> = self
            .store
            .persons_in_school(school_id)?
            .into_iter()
            .filter(|person| person.classroom_key() == key)
            .map(|person| person.id)
            .collect();
        if members.is_empty() {
            return Err(ServiceError::UnknownClassroom(key));
        }

        let severities = self.load_severities(&members, policy)?;
        let risks = severities
            .iter()
            .map(|(person, history)| person_risk(person, history, policy))
            .collect();
        let recent = self
            .store
            .recent_activity(&members, self.settings.recent_activity_limit)?;

        Ok(ClassroomDashboard {
            school_id: school_id.clone(),
            classroom: classroom.clone(),
            policy: policy.as_str(),
            status: group_status(&severities, policy),
            members: risks,
            activity: ActivityDigest::from_responses(&recent),
        })
    }

    pub fn school_dashboard(
        &self,
        school_id: &SchoolId,
        policy: RollupPolicy,
    ) -> Result<SchoolDashboard, ServiceError> {
        let school = self.require_school(school_id)?;
        let members = self.store.persons_in_school(school_id)?;
        let ids: Vec<PersonId> = members.iter().map(|person| person.id.clone()).collect();
        let severities = self.load_severities(&ids, policy)?;

        let mut by_classroom: BTreeMap<ClassroomLabel, BTreeMap<PersonId, Vec<Severity>>> =
            BTreeMap::new();
        for person in members {
            let history = severities.get(&person.id).cloned().unwrap_or_default();
            by_classroom
                .entry(person.classroom)
                .or_default()
                .insert(person.id, history);
        }

        let classrooms: Vec<ClassroomSummary> = by_classroom
            .into_iter()
            .map(|(classroom, group)| ClassroomSummary::summarize(classroom, &group, policy))
            .collect();
        let status = combine_statuses(classrooms.iter().map(|summary| summary.status));

        Ok(SchoolDashboard {
            school,
            policy: policy.as_str(),
            status,
            classrooms,
        })
    }

    /// Status of every school from a single query over the whole population.
    pub fn map_overview(&self, policy: RollupPolicy) -> Result<MapOverview, ServiceError> {
        let schools = self.store.schools()?;
        let persons = self.store.persons()?;
        let ids: Vec<PersonId> = persons.iter().map(|person| person.id.clone()).collect();
        let severities = self.load_severities(&ids, policy)?;

        let mut by_school: BTreeMap<SchoolId, BTreeMap<PersonId, Vec<Severity>>> = BTreeMap::new();
        for person in persons {
            let history = severities.get(&person.id).cloned().unwrap_or_default();
            by_school
                .entry(person.school_id)
                .or_default()
                .insert(person.id, history);
        }

        let statuses: Vec<SchoolStatus> = schools
            .into_iter()
            .map(|school| {
                let group = by_school.remove(&school.id).unwrap_or_default();
                SchoolStatus::summarize(school, &group, policy)
            })
            .collect();

        let counts = StatusCounts::tally(statuses.iter().map(|school| school.status));
        let status = combine_statuses(statuses.iter().map(|school| school.status));
        info!(
            policy = %policy,
            schools = statuses.len(),
            red = counts.red,
            orange = counts.orange,
            "map overview computed"
        );

        Ok(MapOverview {
            policy: policy.as_str(),
            status,
            counts,
            schools: statuses,
        })
    }

    fn load_severities(
        &self,
        persons: &[PersonId],
        policy: RollupPolicy,
    ) -> Result<BTreeMap<PersonId, Vec<Severity>>, ServiceError> {
        let rows = self.store.ranked_severities(persons, policy.row_limit())?;
        Ok(group_rows(persons, rows))
    }

    fn require_person(&self, id: &PersonId) -> Result<Person, ServiceError> {
        self.store
            .person(id)?
            .ok_or_else(|| ServiceError::UnknownPerson(id.clone()))
    }

    fn require_school(&self, id: &SchoolId) -> Result<School, ServiceError> {
        self.store
            .school(id)?
            .ok_or_else(|| ServiceError::UnknownSchool(id.clone()))
    }
}

/// Error raised by the monitoring service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown person '{0}'")]
    UnknownPerson(PersonId),
    #[error("unknown school '{0}'")]
    UnknownSchool(SchoolId),
    #[error("unknown classroom '{0}'")]
    UnknownClassroom(ClassroomKey),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Store(error) if error.is_retryable())
    }
}
