use super::common::*;
use crate::monitoring::ServiceError;
use crate::rollup::{GroupStatus, RollupPolicy};
use crate::roster::{ClassroomLabel, PersonId, SchoolId};
use crate::store::{ResponseStore, StoreError};
use crate::surveys::{AnswerSet, ScoringError, SubmitterRole};
use crate::Severity;

#[test]
fn submit_rejects_unknown_person() {
    let service = build_service();

    match service.submit(submission("ghost", low_answers(), 1)) {
        Err(ServiceError::UnknownPerson(person)) => assert_eq!(person, PersonId::from("ghost")),
        other => panic!("expected unknown person, got {other:?}"),
    }
}

#[test]
fn submit_scores_and_persists() {
    let service = build_service();

    let stored = service
        .submit(submission("n-1", critical_answers(), 2))
        .expect("submission accepted");

    assert_eq!(stored.severity(), Severity::Critical);
    assert_eq!(stored.submitted_at, day(2));
    let history = service
        .store()
        .history(&PersonId::from("n-1"))
        .expect("history");
    assert_eq!(history, vec![stored]);
}

#[test]
fn submit_without_timestamp_uses_now() {
    let service = build_service();
    let mut pending = submission("s-1", low_answers(), 1);
    pending.submitted_at = None;

    let before = chrono::Utc::now();
    let stored = service.submit(pending).expect("submission accepted");

    assert!(stored.submitted_at >= before);
}

#[test]
fn scoring_errors_store_nothing() {
    let service = build_service();
    let invalid = AnswerSet::new(SubmitterRole::Parent).with_item("p_item_1", 7);

    match service.submit(submission("n-1", invalid, 1)) {
        Err(ServiceError::Scoring(ScoringError::IntensityOutOfRange { item, value })) => {
            assert_eq!(item, "p_item_1");
            assert_eq!(value, 7);
        }
        other => panic!("expected scoring error, got {other:?}"),
    }
    assert!(service
        .store()
        .history(&PersonId::from("n-1"))
        .expect("history")
        .is_empty());
}

#[test]
fn preview_does_not_persist() {
    let service = build_service();

    let scored = service.preview(&high_answers()).expect("preview scores");

    assert_eq!(scored.total_score, 20);
    assert_eq!(scored.severity, Severity::High);
    assert!(service
        .store()
        .recent_activity(&[PersonId::from("n-1")], 10)
        .expect("activity")
        .is_empty());
}

#[test]
fn person_status_uses_recency_window() {
    let service = seeded_service();

    let status = service
        .person_status(&PersonId::from("n-1"))
        .expect("person status");

    assert_eq!(status.windowed, vec![Severity::Low, Severity::Low]);
    assert_eq!(status.current, Severity::Low);
    assert!(!status.alerting);
    assert_eq!(status.total_responses, 3);
    assert_eq!(status.last_submitted_at, Some(day(3)));

    let quiet = service
        .person_status(&PersonId::from("n-2"))
        .expect("person status");
    assert_eq!(quiet.windowed, vec![Severity::Low]);
}

#[test]
fn classroom_status_depends_on_policy() {
    let service = seeded_service();
    let school = SchoolId::from("north");
    let classroom = ClassroomLabel::new("3A");

    let current = service
        .classroom_dashboard(&school, &classroom, service.current_policy())
        .expect("dashboard");
    assert_eq!(current.status, GroupStatus::Green);
    assert_eq!(current.policy, "current");
    assert_eq!(current.members.len(), 2);
    assert!(current.members.iter().all(|risk| !risk.alerting));

    let historical = service
        .classroom_dashboard(&school, &classroom, RollupPolicy::FullHistory)
        .expect("dashboard");
    assert_eq!(historical.status, GroupStatus::Red);
    let n1 = historical
        .members
        .iter()
        .find(|risk| risk.person_id == PersonId::from("n-1"))
        .expect("member listed");
    assert!(n1.critical);
}

#[test]
fn classroom_activity_digest() {
    let service = seeded_service();

    let dashboard = service
        .classroom_dashboard(
            &SchoolId::from("north"),
            &ClassroomLabel::new("3A"),
            service.current_policy(),
        )
        .expect("dashboard");

    let activity = &dashboard.activity;
    assert_eq!(activity.responses.len(), 4);
    assert_eq!(activity.responses[0].person_id, PersonId::from("n-2"));
    assert_eq!(activity.alert_count, 1);
    assert_eq!(activity.alerts[0].severity, Severity::Critical);
    assert_eq!(activity.healthy_percentage, 75);
}

#[test]
fn healthy_percentage_truncates_and_alerts_stay_recent() {
    let service = build_service();
    let school = SchoolId::from("north");
    let classroom = ClassroomLabel::new("3A");
    for submission in [
        submission("n-1", low_answers(), 1),
        submission("n-2", high_answers(), 2),
        submission("n-1", low_answers(), 3),
    ] {
        service.submit(submission).expect("submission accepted");
    }

    let activity = service
        .classroom_dashboard(&school, &classroom, service.current_policy())
        .expect("dashboard")
        .activity;
    assert_eq!(activity.responses.len(), 3);
    assert_eq!(activity.alert_count, 1);
    assert_eq!(activity.healthy_percentage, 66);

    for on in 4..=8 {
        let person = if on % 2 == 0 { "n-1" } else { "n-2" };
        service
            .submit(submission(person, low_answers(), on))
            .expect("submission accepted");
    }

    let activity = service
        .classroom_dashboard(&school, &classroom, service.current_policy())
        .expect("dashboard")
        .activity;
    assert_eq!(activity.responses.len(), 5);
    assert_eq!(activity.alert_count, 0);
    assert_eq!(activity.healthy_percentage, 100);
}

#[test]
fn unknown_school_and_classroom() {
    let service = seeded_service();

    assert!(matches!(
        service.school_dashboard(&SchoolId::from("west"), service.current_policy()),
        Err(ServiceError::UnknownSchool(_))
    ));
    assert!(matches!(
        service.classroom_dashboard(
            &SchoolId::from("north"),
            &ClassroomLabel::new("9Z"),
            service.current_policy()
        ),
        Err(ServiceError::UnknownClassroom(_))
    ));
}

#[test]
fn school_status_combines_classrooms() {
    let service = seeded_service();
    let school = SchoolId::from("north");

    let current = service
        .school_dashboard(&school, service.current_policy())
        .expect("dashboard");
    let statuses: Vec<(&str, GroupStatus)> = current
        .classrooms
        .iter()
        .map(|summary| (summary.classroom.as_str(), summary.status))
        .collect();
    assert_eq!(
        statuses,
        vec![("3A", GroupStatus::Green), ("4B", GroupStatus::Orange)]
    );
    assert_eq!(current.status, GroupStatus::Orange);

    let historical = service
        .school_dashboard(&school, RollupPolicy::FullHistory)
        .expect("dashboard");
    assert_eq!(historical.status, GroupStatus::Red);
    assert_eq!(historical.classrooms[0].critical, 1);
}

#[test]
fn map_overview_counts_every_school() {
    let service = seeded_service();

    let overview = service
        .map_overview(RollupPolicy::FullHistory)
        .expect("overview");

    assert_eq!(overview.status, GroupStatus::Red);
    assert_eq!(overview.schools.len(), 3);
    assert_eq!(
        (overview.counts.red, overview.counts.orange, overview.counts.green),
        (1, 0, 2)
    );
    let east = overview
        .schools
        .iter()
        .find(|school| school.school_id == SchoolId::from("east"))
        .expect("school listed");
    assert_eq!(east.status, GroupStatus::Green);
    assert_eq!(east.members, 0);

    let current = service
        .map_overview(service.current_policy())
        .expect("overview");
    assert_eq!(current.status, GroupStatus::Orange);
}

#[test]
fn geojson_lists_located_schools() {
    let service = seeded_service();
    let overview = service
        .map_overview(RollupPolicy::FullHistory)
        .expect("overview");

    let geojson = overview.to_geojson();

    assert_eq!(geojson["type"], "FeatureCollection");
    let features = geojson["features"].as_array().expect("features array");
    assert_eq!(features.len(), 2);
    let north = &features[0];
    assert_eq!(north["properties"]["school_id"], "north");
    assert_eq!(north["properties"]["status"], "red");
    assert_eq!(north["geometry"]["coordinates"][0], -0.38);
    assert_eq!(north["geometry"]["coordinates"][1], 39.48);
}

#[test]
fn store_failures_are_never_green() {
    let service = service_with(UnavailableStore);

    let err = service
        .map_overview(RollupPolicy::FullHistory)
        .expect_err("store offline");

    assert!(err.is_retryable());
    assert_eq!(
        err,
        ServiceError::Store(StoreError::Unavailable("database offline".to_string()))
    );
}
