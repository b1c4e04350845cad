use crate::infra::{load_scorer, open_store, seed_roster, submit_all};
use crate::report::{render_map, render_severity_counts};
use clap::Args;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use wellbeing_monitor::config::AppConfig;
use wellbeing_monitor::error::AppError;
use wellbeing_monitor::import::{RosterImporter, SurveyImporter};
use wellbeing_monitor::monitoring::{MonitoringService, MonitoringSettings};
use wellbeing_monitor::store::{InMemoryStore, ResponseStore, RosterDirectory};
use wellbeing_monitor::surveys::{AnswerSet, ResponseScorer, SubmitterRole};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Respondent role for --item answers
    #[arg(long, default_value = "parent")]
    pub(crate) role: SubmitterRole,
    /// Item intensity as ITEM=VALUE, e.g. --item p_item_2=3 (repeatable)
    #[arg(long = "item", value_parser = parse_item)]
    pub(crate) items: Vec<(String, i32)>,
    /// JSON answer set ({"role": ..., "items": {...}}) instead of --role/--item
    #[arg(long, conflicts_with_all = ["role", "items"])]
    pub(crate) answers: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Roster CSV: school_id, school_name, center_code, latitude, longitude, person_id,
    /// classroom, display_name
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
    /// Survey CSV: person_id, submitted_at, role, then one column per item
    #[arg(long)]
    pub(crate) surveys: Option<PathBuf>,
    /// SQLite database to write into (defaults to APP_DATABASE_PATH); without one the import
    /// is scored in memory and discarded
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

fn parse_item(raw: &str) -> Result<(String, i32), String> {
    let (item, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ITEM=VALUE, got '{raw}'"))?;
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("'{value}' is not an integer intensity"))?;
    Ok((item.trim().to_string(), value))
}

fn invalid_data(err: serde_json::Error) -> AppError {
    AppError::Io(io::Error::new(io::ErrorKind::InvalidData, err))
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let scorer = load_scorer(&config.monitoring)?;

    let answers = match args.answers {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<AnswerSet>(&raw).map_err(invalid_data)?
        }
        None => args
            .items
            .into_iter()
            .fold(AnswerSet::new(args.role), |answers, (item, value)| {
                answers.with_item(item, value)
            }),
    };

    let scored = scorer.score(&answers)?;
    let rendered = serde_json::to_string_pretty(&scored).map_err(invalid_data)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let scorer = load_scorer(&config.monitoring)?;
    let settings = config.monitoring.settings();

    match args.database.clone().or(config.storage.database_path.clone()) {
        Some(path) => {
            println!("Importing into {}", path.display());
            let store = open_store(&path, &config.monitoring)?;
            import_into(store, scorer, settings, args)
        }
        None => {
            println!("No database configured; scoring in memory, nothing will be persisted");
            import_into(InMemoryStore::new(), scorer, settings, args)
        }
    }
}

fn import_into<S>(
    store: S,
    scorer: ResponseScorer,
    settings: MonitoringSettings,
    args: ImportArgs,
) -> Result<(), AppError>
where
    S: ResponseStore + RosterDirectory + 'static,
{
    if let Some(path) = &args.roster {
        let roster = RosterImporter::from_path(path)?;
        println!(
            "Roster: {} schools, {} persons",
            roster.schools.len(),
            roster.persons.len()
        );
        seed_roster(&store, roster)?;
    }

    let service = MonitoringService::new(Arc::new(store), scorer, settings);

    if let Some(path) = &args.surveys {
        let submissions = SurveyImporter::from_path(path)?;
        let summary = submit_all(&service, submissions)?;
        println!(
            "Surveys: {} accepted, {} rejected",
            summary.accepted,
            summary.rejected.len()
        );
        render_severity_counts(&summary.by_severity);
        for rejection in &summary.rejected {
            println!("  rejected {rejection}");
        }
    }

    let overview = service.map_overview(service.current_policy())?;
    render_map(&overview);
    Ok(())
}
