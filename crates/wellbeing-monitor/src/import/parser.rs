use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::roster::{ClassroomLabel, GeoPoint, Person, PersonId, School, SchoolId};

pub(crate) const PERSON_COLUMN: &str = "person_id";
pub(crate) const SUBMITTED_AT_COLUMN: &str = "submitted_at";
pub(crate) const ROLE_COLUMN: &str = "role";

#[derive(Debug, Deserialize)]
pub(crate) struct RosterRow {
    school_id: String,
    school_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    center_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    latitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    longitude: Option<String>,
    person_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    classroom: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    display_name: Option<String>,
}

impl RosterRow {
    pub(crate) fn school(&self) -> Result<School, String> {
        let location = match (self.latitude.as_deref(), self.longitude.as_deref()) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude: parse_coordinate(latitude)?,
                longitude: parse_coordinate(longitude)?,
            }),
            _ => None,
        };

        Ok(School {
            id: SchoolId(self.school_id.clone()),
            name: self.school_name.clone(),
            center_code: self.center_code.clone(),
            location,
        })
    }

    pub(crate) fn person(&self) -> Person {
        Person {
            id: PersonId(self.person_id.clone()),
            school_id: SchoolId(self.school_id.clone()),
            classroom: ClassroomLabel::from(self.classroom.clone()),
            display_name: self.display_name.clone(),
        }
    }
}

fn parse_coordinate(raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("'{raw}' is not a valid coordinate"))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn parse_intensity(item: &str, raw: &str) -> Result<Option<i32>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i32>()
        .map(Some)
        .map_err(|_| format!("column '{item}' holds non-integer value '{trimmed}'"))
}
