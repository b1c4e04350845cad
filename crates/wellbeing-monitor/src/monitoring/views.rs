use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::rollup::{group_status, person_risk, GroupStatus, PersonRisk, RollupPolicy};
use crate::roster::{ClassroomLabel, GeoPoint, PersonId, School, SchoolId};
use crate::surveys::{ResponseId, StoredResponse, SubmitterRole};
use crate::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonStatus {
    pub person_id: PersonId,
    pub school_id: SchoolId,
    pub classroom: ClassroomLabel,
    pub window: usize,
    /// Severities inside the recency window, most recent first.
    pub windowed: Vec<Severity>,
    pub current: Severity,
    pub alerting: bool,
    pub total_responses: usize,
    pub last_submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub response_id: ResponseId,
    pub person_id: PersonId,
    pub role: SubmitterRole,
    pub submitted_at: DateTime<Utc>,
    pub total_score: u32,
    pub severity: Severity,
    pub flags: Vec<String>,
}

impl From<&StoredResponse> for ActivityEntry {
    fn from(response: &StoredResponse) -> Self {
        Self {
            response_id: response.id,
            person_id: response.person_id.clone(),
            role: response.role,
            submitted_at: response.submitted_at,
            total_score: response.scored.total_score,
            severity: response.severity(),
            flags: response.scored.flags.clone(),
        }
    }
}

/// Latest responses of a group with the alert list and the share of low-severity responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDigest {
    pub responses: Vec<ActivityEntry>,
    pub alerts: Vec<ActivityEntry>,
    pub alert_count: usize,
    pub healthy_percentage: u8,
}

impl ActivityDigest {
    /// `recent` is expected most recent first. Alerts are counted within `recent` only. The
    /// healthy percentage is truncated to a whole number; with no responses it is 100.
    pub fn from_responses(recent: &[StoredResponse]) -> Self {
        let responses: Vec<ActivityEntry> = recent.iter().map(ActivityEntry::from).collect();
        let alerts: Vec<ActivityEntry> = responses
            .iter()
            .filter(|entry| entry.severity.is_alerting())
            .cloned()
            .collect();

        let healthy_percentage = if responses.is_empty() {
            100
        } else {
            let healthy = responses
                .iter()
                .filter(|entry| entry.severity == Severity::Low)
                .count();
            (healthy * 100 / responses.len()) as u8
        };

        Self {
            responses,
            alert_count: alerts.len(),
            alerts,
            healthy_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassroomDashboard {
    pub school_id: SchoolId,
    pub classroom: ClassroomLabel,
    pub policy: &'static str,
    pub status: GroupStatus,
    pub members: Vec<PersonRisk>,
    pub activity: ActivityDigest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassroomSummary {
    pub classroom: ClassroomLabel,
    pub status: GroupStatus,
    pub members: usize,
    pub alerting: usize,
    pub critical: usize,
}

impl ClassroomSummary {
    pub(crate) fn summarize(
        classroom: ClassroomLabel,
        group: &BTreeMap<PersonId, Vec<Severity>>,
        policy: RollupPolicy,
    ) -> Self {
        let (alerting, critical) = count_risks(group, policy);
        Self {
            classroom,
            status: group_status(group, policy),
            members: group.len(),
            alerting,
            critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolDashboard {
    pub school: School,
    pub policy: &'static str,
    pub status: GroupStatus,
    pub classrooms: Vec<ClassroomSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub red: usize,
    pub orange: usize,
    pub green: usize,
}

impl StatusCounts {
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = GroupStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                match status {
                    GroupStatus::Red => counts.red += 1,
                    GroupStatus::Orange => counts.orange += 1,
                    GroupStatus::Green => counts.green += 1,
                }
                counts
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolStatus {
    pub school_id: SchoolId,
    pub name: String,
    pub center_code: Option<String>,
    pub location: Option<GeoPoint>,
    pub status: GroupStatus,
    pub members: usize,
    pub alerting: usize,
    pub critical: usize,
}

impl SchoolStatus {
    pub(crate) fn summarize(
        school: School,
        group: &BTreeMap<PersonId, Vec<Severity>>,
        policy: RollupPolicy,
    ) -> Self {
        let (alerting, critical) = count_risks(group, policy);
        Self {
            school_id: school.id,
            name: school.name,
            center_code: school.center_code,
            location: school.location,
            status: group_status(group, policy),
            members: group.len(),
            alerting,
            critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapOverview {
    pub policy: &'static str,
    pub status: GroupStatus,
    pub counts: StatusCounts,
    pub schools: Vec<SchoolStatus>,
}

impl MapOverview {
    /// GeoJSON `FeatureCollection` of the schools that have a location. Coordinates are
    /// `[longitude, latitude]`.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .schools
            .iter()
            .filter_map(|school| {
                let location = school.location?;
                Some(json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [location.longitude, location.latitude],
                    },
                    "properties": {
                        "school_id": school.school_id,
                        "name": school.name,
                        "center_code": school.center_code,
                        "status": school.status,
                        "members": school.members,
                        "alerting": school.alerting,
                        "critical": school.critical,
                    },
                }))
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "policy": self.policy,
            "status": self.status,
            "counts": self.counts,
            "features": features,
        })
    }
}

fn count_risks(group: &BTreeMap<PersonId, Vec<Severity>>, policy: RollupPolicy) -> (usize, usize) {
    group
        .iter()
        .map(|(person, severities)| person_risk(person, severities, policy))
        .fold((0, 0), |(alerting, critical), risk| {
            (
                alerting + usize::from(risk.alerting),
                critical + usize::from(risk.critical),
            )
        })
}
