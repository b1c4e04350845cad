use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;
use wellbeing_monitor::config::{AppConfig, ConfigError, MonitoringConfig};
use wellbeing_monitor::error::AppError;
use wellbeing_monitor::import::RosterImport;
use wellbeing_monitor::monitoring::{MonitoringService, ServiceError};
use wellbeing_monitor::rollup::RollupPolicy;
use wellbeing_monitor::store::{ResponseStore, RosterDirectory, SqliteStore, StoreError};
use wellbeing_monitor::surveys::{ResponseScorer, ScoringConfig, SurveySubmission};
use wellbeing_monitor::Severity;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reference rules unless `APP_SCORING_CONFIG` points at a JSON rule set.
pub(crate) fn load_scorer(config: &MonitoringConfig) -> Result<ResponseScorer, AppError> {
    match &config.scoring_config {
        Some(path) => {
            let rules = ScoringConfig::from_path(path)?;
            Ok(ResponseScorer::new(rules)?)
        }
        None => Ok(ResponseScorer::reference()),
    }
}

/// Opens the SQLite store, using the query timeout as the busy timeout.
pub(crate) fn open_store(path: &Path, config: &MonitoringConfig) -> Result<SqliteStore, AppError> {
    Ok(SqliteStore::open(path, config.query_timeout())?)
}

/// Database for commands that cannot work without one: the flag wins over the environment.
pub(crate) fn require_database(
    flag: Option<PathBuf>,
    config: &AppConfig,
) -> Result<PathBuf, AppError> {
    flag.or_else(|| config.storage.database_path.clone())
        .ok_or(AppError::Config(ConfigError::Missing {
            name: "APP_DATABASE_PATH",
        }))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_policy(raw: &str) -> Result<RollupPolicy, String> {
    raw.parse::<RollupPolicy>().map_err(|err| err.to_string())
}

pub(crate) fn seed_roster<S>(store: &S, roster: RosterImport) -> Result<(), StoreError>
where
    S: RosterDirectory + ?Sized,
{
    for school in roster.schools {
        store.upsert_school(school)?;
    }
    for person in roster.persons {
        store.upsert_person(person)?;
    }
    Ok(())
}

/// Outcome of pushing a batch of submissions through the service.
#[derive(Debug, Default)]
pub(crate) struct IntakeSummary {
    pub(crate) accepted: usize,
    pub(crate) rejected: Vec<String>,
    pub(crate) by_severity: BTreeMap<Severity, usize>,
}

/// Submits every row; caller errors are collected per row, store errors abort the batch.
pub(crate) fn submit_all<S>(
    service: &MonitoringService<S>,
    submissions: Vec<SurveySubmission>,
) -> Result<IntakeSummary, AppError>
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let mut summary = IntakeSummary::default();
    for (index, submission) in submissions.into_iter().enumerate() {
        let person_id = submission.person_id.clone();
        match service.submit(submission) {
            Ok(stored) => {
                summary.accepted += 1;
                *summary.by_severity.entry(stored.severity()).or_default() += 1;
            }
            Err(ServiceError::Store(err)) => return Err(err.into()),
            Err(err) => {
                warn!(row = index + 1, %person_id, error = %err, "survey rejected");
                summary.rejected.push(format!("survey {} ({person_id}): {err}", index + 1));
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellbeing_monitor::import::{RosterImporter, SurveyImporter};
    use wellbeing_monitor::monitoring::MonitoringSettings;
    use wellbeing_monitor::store::InMemoryStore;

    #[test]
    fn submit_all_collects_rejections() {
        let roster = RosterImporter::from_reader(
            "school_id,school_name,center_code,latitude,longitude,person_id,classroom,display_name\n\
             sch-1,Harbor School,,,,p-1,1A,\n"
                .as_bytes(),
        )
        .expect("roster parses");
        let store = Arc::new(InMemoryStore::new());
        seed_roster(store.as_ref(), roster).expect("roster stored");
        let service = MonitoringService::new(
            store,
            ResponseScorer::reference(),
            MonitoringSettings::default(),
        );

        let submissions = SurveyImporter::from_reader(
            "person_id,submitted_at,role,p_item_2\n\
             p-1,2025-09-01,parent,3\n\
             p-2,2025-09-01,parent,0\n\
             p-1,2025-09-08,parent,6\n"
                .as_bytes(),
        )
        .expect("surveys parse");

        let summary = submit_all(&service, submissions).expect("batch completes");

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.by_severity.get(&Severity::Critical), Some(&1));
        assert_eq!(summary.rejected.len(), 2);
        assert!(summary.rejected[0].contains("unknown person 'p-2'"));
    }

    #[test]
    fn parses_policy_flags() {
        assert_eq!(parse_policy("historical"), Ok(RollupPolicy::FullHistory));
        assert!(parse_policy("monthly").is_err());
    }
}
