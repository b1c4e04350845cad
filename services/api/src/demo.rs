use crate::infra::{parse_date, seed_roster, submit_all};
use crate::report::{render_classroom, render_map, render_school, render_severity_counts};
use chrono::{Duration, NaiveDate};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use wellbeing_monitor::config::AppConfig;
use wellbeing_monitor::error::AppError;
use wellbeing_monitor::import::RosterImport;
use wellbeing_monitor::monitoring::MonitoringService;
use wellbeing_monitor::rollup::RollupPolicy;
use wellbeing_monitor::roster::{ClassroomLabel, GeoPoint, Person, PersonId, School, SchoolId};
use wellbeing_monitor::store::InMemoryStore;
use wellbeing_monitor::surveys::{AnswerSet, ResponseScorer, SubmitterRole, SurveySubmission};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of schools in the synthetic population
    #[arg(long, default_value_t = 4)]
    pub(crate) schools: usize,
    /// Classrooms per school
    #[arg(long, default_value_t = 3)]
    pub(crate) classrooms: usize,
    /// Students per classroom
    #[arg(long, default_value_t = 8)]
    pub(crate) students: usize,
    /// Weekly survey rounds per student
    #[arg(long, default_value_t = 6)]
    pub(crate) weeks: usize,
    /// First survey week (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2025-09-01")]
    pub(crate) start: NaiveDate,
    /// Seed for the synthetic answers; the same seed reproduces the same population
    #[arg(long, default_value_t = 7)]
    pub(crate) seed: u64,
}

/// Long-run tendency of a synthetic student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RiskProfile {
    Calm,
    Strained,
    Distressed,
}

impl RiskProfile {
    /// 40% calm, 30% strained, 30% distressed.
    fn draw(rng: &mut StdRng) -> Self {
        match rng.gen_range(0..10) {
            0..=2 => RiskProfile::Distressed,
            3..=5 => RiskProfile::Strained,
            _ => RiskProfile::Calm,
        }
    }

    fn ceiling(self) -> i32 {
        match self {
            RiskProfile::Calm => 1,
            RiskProfile::Strained => 2,
            RiskProfile::Distressed => 3,
        }
    }
}

fn synthetic_roster(schools: usize, classrooms: usize, students: usize) -> RosterImport {
    let mut roster = RosterImport::default();
    for school in 0..schools {
        let school_id = SchoolId(format!("sch-{:02}", school + 1));
        roster.schools.push(School {
            id: school_id.clone(),
            name: format!("Demo School {}", school + 1),
            center_code: Some(format!("{}", 46_000_001 + school)),
            location: Some(GeoPoint {
                latitude: 39.40 + 0.03 * school as f64,
                longitude: -0.42 + 0.025 * (school % 3) as f64,
            }),
        });
        for classroom in 0..classrooms {
            let label = format!("{}{}", classroom / 2 + 1, ['A', 'B'][classroom % 2]);
            for student in 0..students {
                roster.persons.push(Person {
                    id: PersonId(format!(
                        "stu-{:02}-{:02}-{:02}",
                        school + 1,
                        classroom + 1,
                        student + 1
                    )),
                    school_id: school_id.clone(),
                    classroom: ClassroomLabel::new(&label),
                    display_name: None,
                });
            }
        }
    }
    roster
}

/// One parent or teacher survey per student per week. Distressed students report a critical
/// injury or coercion marker in some early weeks only, so the two policies disagree.
fn synthetic_surveys(
    persons: &[Person],
    weeks: usize,
    start: NaiveDate,
    seed: u64,
) -> Vec<SurveySubmission> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut submissions = Vec::with_capacity(persons.len() * weeks);
    for (index, person) in persons.iter().enumerate() {
        let profile = RiskProfile::draw(&mut rng);
        for week in 0..weeks {
            let role = if week % 2 == 0 {
                SubmitterRole::Parent
            } else {
                SubmitterRole::Teacher
            };
            let items: Vec<String> = match role {
                SubmitterRole::Parent => (1..=13).map(|item| format!("p_item_{item}")).collect(),
                SubmitterRole::Teacher => [
                    "t_vic_insults",
                    "t_vic_exclusion",
                    "t_vic_physical",
                    "t_vic_rumors",
                    "t_agg_insults",
                    "t_agg_physical",
                    "t_cyber_messages",
                    "t_cyber_anxiety",
                ]
                .iter()
                .map(|item| item.to_string())
                .collect(),
            };

            let mut answers = AnswerSet::new(role);
            for item in items {
                let mut value = rng.gen_range(0..=profile.ceiling());
                // the override items stay below the trigger unless a marker is planted
                if item == "p_item_2" || item == "p_item_5" {
                    value = value.min(2);
                }
                answers = answers.with_item(item, value);
            }
            let planted_marker = profile == RiskProfile::Distressed
                && role == SubmitterRole::Parent
                && week + 2 < weeks
                && rng.gen_bool(1.0 / 3.0);
            if planted_marker {
                answers = answers.with_item("p_item_2", 3);
            }

            let submitted_on = start + Duration::days(7 * week as i64 + (index % 5) as i64);
            submissions.push(SurveySubmission {
                person_id: person.id.clone(),
                answers,
                submitted_at: submitted_on
                    .and_hms_opt(9, 0, 0)
                    .map(|naive| naive.and_utc()),
            });
        }
    }
    submissions
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let settings = config.monitoring.settings();

    println!("Wellbeing monitor demo");
    println!(
        "{} schools x {} classrooms x {} students, {} weekly rounds from {}",
        args.schools, args.classrooms, args.students, args.weeks, args.start
    );

    let roster = synthetic_roster(args.schools, args.classrooms, args.students);
    let surveys = synthetic_surveys(&roster.persons, args.weeks, args.start, args.seed);
    let first_school = roster.schools.first().map(|school| school.id.clone());
    let first_classroom = roster.persons.first().map(|person| person.classroom.clone());

    let store = InMemoryStore::new();
    seed_roster(&store, roster)?;
    let service = MonitoringService::new(Arc::new(store), ResponseScorer::reference(), settings);

    let summary = submit_all(&service, surveys)?;
    println!("\nScored {} surveys", summary.accepted);
    render_severity_counts(&summary.by_severity);

    println!(
        "\nCurrent window: the {} most recent responses of each student",
        settings.window.size()
    );
    render_map(&service.map_overview(service.current_policy())?);
    println!("\nFull history: every response ever recorded");
    render_map(&service.map_overview(RollupPolicy::FullHistory)?);

    if let (Some(school), Some(classroom)) = (first_school, first_classroom) {
        render_school(&service.school_dashboard(&school, service.current_policy())?);
        render_classroom(&service.classroom_dashboard(
            &school,
            &classroom,
            service.current_policy(),
        )?);
    }

    Ok(())
}
