use crate::infra::{open_store, parse_policy, require_database};
use clap::Args;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use wellbeing_monitor::config::AppConfig;
use wellbeing_monitor::error::AppError;
use wellbeing_monitor::monitoring::{
    ActivityDigest, ClassroomDashboard, MapOverview, MonitoringService, SchoolDashboard,
};
use wellbeing_monitor::rollup::RollupPolicy;
use wellbeing_monitor::roster::{ClassroomLabel, SchoolId};
use wellbeing_monitor::Severity;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// SQLite database to read (defaults to APP_DATABASE_PATH)
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
    /// Report a single school instead of the whole map
    #[arg(long)]
    pub(crate) school: Option<String>,
    /// Report one classroom of --school
    #[arg(long, requires = "school")]
    pub(crate) classroom: Option<String>,
    /// `current` (recent responses) or `historical` (every response). Defaults to
    /// `historical` for the map and `current` for schools and classrooms.
    #[arg(long, value_parser = parse_policy)]
    pub(crate) policy: Option<RollupPolicy>,
    /// Print JSON (GeoJSON for the map) instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = require_database(args.database.clone(), &config)?;
    let store = open_store(&path, &config.monitoring)?;
    let service = MonitoringService::new(
        Arc::new(store),
        crate::infra::load_scorer(&config.monitoring)?,
        config.monitoring.settings(),
    );
    let window = service.settings().window;

    match (args.school, args.classroom) {
        (Some(school), Some(classroom)) => {
            let policy = args
                .policy
                .map_or(service.current_policy(), |policy| policy.with_window(window));
            let dashboard = service.classroom_dashboard(
                &SchoolId(school),
                &ClassroomLabel::new(classroom),
                policy,
            )?;
            if args.json {
                print_json(&dashboard)
            } else {
                render_classroom(&dashboard);
                Ok(())
            }
        }
        (Some(school), None) => {
            let policy = args
                .policy
                .map_or(service.current_policy(), |policy| policy.with_window(window));
            let dashboard = service.school_dashboard(&SchoolId(school), policy)?;
            if args.json {
                print_json(&dashboard)
            } else {
                render_school(&dashboard);
                Ok(())
            }
        }
        (None, _) => {
            let policy = args
                .policy
                .map_or(RollupPolicy::FullHistory, |policy| policy.with_window(window));
            let overview = service.map_overview(policy)?;
            if args.json {
                print_json(&overview.to_geojson())
            } else {
                render_map(&overview);
                Ok(())
            }
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn render_severity_counts(counts: &BTreeMap<Severity, usize>) {
    for severity in Severity::ordered() {
        let count = counts.get(&severity).copied().unwrap_or(0);
        println!("- {}: {}", severity.label(), count);
    }
}

pub(crate) fn render_map(overview: &MapOverview) {
    println!(
        "\nMap status ({} policy): {}",
        overview.policy,
        overview.status.as_str().to_uppercase()
    );
    println!(
        "{} red | {} orange | {} green",
        overview.counts.red, overview.counts.orange, overview.counts.green
    );
    for school in &overview.schools {
        println!(
            "- [{}] {} ({}): {} members, {} alerting, {} critical",
            school.status,
            school.name,
            school.school_id,
            school.members,
            school.alerting,
            school.critical
        );
    }
}

pub(crate) fn render_school(dashboard: &SchoolDashboard) {
    println!(
        "\n{} ({} policy): {}",
        dashboard.school.name,
        dashboard.policy,
        dashboard.status.as_str().to_uppercase()
    );
    for classroom in &dashboard.classrooms {
        println!(
            "- [{}] classroom {}: {} members, {} alerting, {} critical",
            classroom.status,
            classroom.classroom,
            classroom.members,
            classroom.alerting,
            classroom.critical
        );
    }
}

pub(crate) fn render_classroom(dashboard: &ClassroomDashboard) {
    println!(
        "\nClassroom {} at {} ({} policy): {}",
        dashboard.classroom,
        dashboard.school_id,
        dashboard.policy,
        dashboard.status.as_str().to_uppercase()
    );
    for member in &dashboard.members {
        let marker = if member.critical {
            "!!"
        } else if member.alerting {
            "!"
        } else {
            "-"
        };
        println!(
            "{marker} {}: {} ({} responses considered)",
            member.person_id,
            member.current.label(),
            member.responses_considered
        );
    }
    render_activity(&dashboard.activity);
}

fn render_activity(activity: &ActivityDigest) {
    println!(
        "Recent activity: {} responses, {} alerts, {}% healthy",
        activity.responses.len(),
        activity.alert_count,
        activity.healthy_percentage
    );
    for alert in &activity.alerts {
        println!(
            "  - {} {} {} (score {}) {}",
            alert.submitted_at.format("%Y-%m-%d"),
            alert.person_id,
            alert.severity.label(),
            alert.total_score,
            alert.flags.join(", ")
        );
    }
}
