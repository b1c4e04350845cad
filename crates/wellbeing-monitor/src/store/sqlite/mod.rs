mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{ResponseStore, RosterDirectory, SeverityRow, StoreError};
use crate::roster::{ClassroomLabel, GeoPoint, Person, PersonId, School, SchoolId};
use crate::surveys::{NewResponse, ResponseId, ScoredResponse, StoredResponse, SubmitterRole};
use crate::Severity;

const RESPONSE_COLUMNS: &str =
    "id, person_id, role, submitted_at, total_score, severity, flags, recommendation, blocks";

/// SQLite-backed store. The connection is shared behind a mutex; every call is a single
/// statement or transaction so writes are visible to the next query.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Timeout
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt(format!("timestamp '{raw}': {err}")))
}

fn decode_severity(raw: &str) -> Result<Severity, StoreError> {
    raw.parse()
        .map_err(|err: crate::ParseSeverityError| StoreError::Corrupt(err.to_string()))
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::Corrupt(err.to_string()))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|err| StoreError::Corrupt(err.to_string()))
}

fn person_ids_json(persons: &[PersonId]) -> Result<String, StoreError> {
    let ids: Vec<&str> = persons.iter().map(|person| person.0.as_str()).collect();
    encode_json(&ids)
}

/// Raw column values; decoded outside rusqlite's row callback.
struct ResponseRow {
    id: i64,
    person_id: String,
    role: String,
    submitted_at: String,
    total_score: u32,
    severity: String,
    flags: String,
    recommendation: String,
    blocks: String,
}

impl ResponseRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            person_id: row.get(1)?,
            role: row.get(2)?,
            submitted_at: row.get(3)?,
            total_score: row.get(4)?,
            severity: row.get(5)?,
            flags: row.get(6)?,
            recommendation: row.get(7)?,
            blocks: row.get(8)?,
        })
    }

    fn decode(self) -> Result<StoredResponse, StoreError> {
        let role: SubmitterRole = self
            .role
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("role '{}'", self.role)))?;

        Ok(StoredResponse {
            id: ResponseId(self.id),
            person_id: PersonId(self.person_id),
            role,
            submitted_at: decode_timestamp(&self.submitted_at)?,
            scored: ScoredResponse {
                total_score: self.total_score,
                severity: decode_severity(&self.severity)?,
                flags: decode_json(&self.flags)?,
                recommendation: self.recommendation,
                blocks: decode_json(&self.blocks)?,
            },
        })
    }
}

fn read_school(row: &Row<'_>) -> rusqlite::Result<School> {
    let latitude: Option<f64> = row.get(3)?;
    let longitude: Option<f64> = row.get(4)?;
    Ok(School {
        id: SchoolId(row.get(0)?),
        name: row.get(1)?,
        center_code: row.get(2)?,
        location: latitude
            .zip(longitude)
            .map(|(latitude, longitude)| GeoPoint {
                latitude,
                longitude,
            }),
    })
}

fn read_person(row: &Row<'_>) -> rusqlite::Result<Person> {
    let classroom: String = row.get(2)?;
    Ok(Person {
        id: PersonId(row.get(0)?),
        school_id: SchoolId(row.get(1)?),
        classroom: ClassroomLabel::new(classroom),
        display_name: row.get(3)?,
    })
}

impl ResponseStore for SqliteStore {
    fn insert(&self, response: NewResponse) -> Result<StoredResponse, StoreError> {
        let conn = self.conn()?;
        let NewResponse {
            person_id,
            role,
            submitted_at,
            scored,
        } = response;

        conn.execute(
            "INSERT INTO responses
                (person_id, role, submitted_at, total_score, severity, flags, recommendation, blocks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                person_id.0,
                role.as_str(),
                encode_timestamp(&submitted_at),
                scored.total_score,
                scored.severity.as_str(),
                encode_json(&scored.flags)?,
                scored.recommendation,
                encode_json(&scored.blocks)?,
            ],
        )?;

        Ok(StoredResponse {
            id: ResponseId(conn.last_insert_rowid()),
            person_id,
            role,
            submitted_at,
            scored,
        })
    }

    fn history(&self, person: &PersonId) -> Result<Vec<StoredResponse>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses
             WHERE person_id = ?1
             ORDER BY submitted_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map(params![person.0], ResponseRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ResponseRow::decode).collect()
    }

    fn ranked_severities(
        &self,
        persons: &[PersonId],
        limit: Option<usize>,
    ) -> Result<Vec<SeverityRow>, StoreError> {
        if persons.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT person_id, id, submitted_at, severity FROM (
                SELECT person_id, id, submitted_at, severity,
                       ROW_NUMBER() OVER (
                           PARTITION BY person_id
                           ORDER BY submitted_at DESC, id DESC
                       ) AS recency_rank
                FROM responses
                WHERE person_id IN (SELECT value FROM json_each(?1))
             )
             WHERE ?2 IS NULL OR recency_rank <= ?2
             ORDER BY person_id, recency_rank",
        )?;

        let limit = limit.map(|value| i64::try_from(value).unwrap_or(i64::MAX));
        let raw = stmt
            .query_map(params![person_ids_json(persons)?, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(person_id, id, submitted_at, severity)| {
                Ok(SeverityRow {
                    person_id: PersonId(person_id),
                    response_id: ResponseId(id),
                    submitted_at: decode_timestamp(&submitted_at)?,
                    severity: decode_severity(&severity)?,
                })
            })
            .collect()
    }

    fn recent_activity(
        &self,
        persons: &[PersonId],
        limit: usize,
    ) -> Result<Vec<StoredResponse>, StoreError> {
        if persons.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses
             WHERE person_id IN (SELECT value FROM json_each(?1))
             ORDER BY submitted_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(
                params![person_ids_json(persons)?, limit],
                ResponseRow::read,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ResponseRow::decode).collect()
    }
}

impl RosterDirectory for SqliteStore {
    fn upsert_school(&self, school: School) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO schools (id, name, center_code, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                center_code = excluded.center_code,
                latitude = excluded.latitude,
                longitude = excluded.longitude",
            params![
                school.id.0,
                school.name,
                school.center_code,
                school.location.map(|point| point.latitude),
                school.location.map(|point| point.longitude),
            ],
        )?;
        Ok(())
    }

    fn upsert_person(&self, person: Person) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO persons (id, school_id, classroom, display_name)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                school_id = excluded.school_id,
                classroom = excluded.classroom,
                display_name = excluded.display_name",
            params![
                person.id.0,
                person.school_id.0,
                person.classroom.as_str(),
                person.display_name,
            ],
        )?;
        Ok(())
    }

    fn school(&self, id: &SchoolId) -> Result<Option<School>, StoreError> {
        let conn = self.conn()?;
        let school = conn
            .query_row(
                "SELECT id, name, center_code, latitude, longitude FROM schools WHERE id = ?1",
                params![id.0],
                read_school,
            )
            .optional()?;
        Ok(school)
    }

    fn schools(&self) -> Result<Vec<School>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, center_code, latitude, longitude FROM schools ORDER BY id",
        )?;
        let schools = stmt
            .query_map([], read_school)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(schools)
    }

    fn person(&self, id: &PersonId) -> Result<Option<Person>, StoreError> {
        let conn = self.conn()?;
        let person = conn
            .query_row(
                "SELECT id, school_id, classroom, display_name FROM persons WHERE id = ?1",
                params![id.0],
                read_person,
            )
            .optional()?;
        Ok(person)
    }

    fn persons_in_school(&self, id: &SchoolId) -> Result<Vec<Person>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, school_id, classroom, display_name FROM persons
             WHERE school_id = ?1 ORDER BY id",
        )?;
        let persons = stmt
            .query_map(params![id.0], read_person)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(persons)
    }

    fn persons(&self) -> Result<Vec<Person>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, school_id, classroom, display_name FROM persons ORDER BY id")?;
        let persons = stmt
            .query_map([], read_person)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(persons)
    }
}
