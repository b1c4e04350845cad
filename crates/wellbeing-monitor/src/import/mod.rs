//! CSV ingestion for rosters and bulk survey exports.

mod parser;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::roster::{Person, PersonId, School};
use crate::surveys::{AnswerSet, SubmitterRole, SurveySubmission};
use parser::{PERSON_COLUMN, ROLE_COLUMN, SUBMITTED_AT_COLUMN};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
}

/// Schools and persons read from a roster export.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RosterImport {
    pub schools: Vec<School>,
    pub persons: Vec<Person>,
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RosterImport, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Columns: `school_id, school_name, center_code, latitude, longitude, person_id,
    /// classroom, display_name`. A school row repeats for every person; the first
    /// occurrence of a school id wins.
    pub fn from_reader<R: Read>(reader: R) -> Result<RosterImport, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut schools = BTreeMap::new();
        let mut persons = Vec::new();
        for (index, record) in csv_reader.deserialize::<parser::RosterRow>().enumerate() {
            let row = record?;
            let school = row.school().map_err(|reason| ImportError::Row {
                row: index + 2,
                reason,
            })?;
            schools.entry(school.id.clone()).or_insert(school);
            persons.push(row.person());
        }

        debug!(
            schools = schools.len(),
            persons = persons.len(),
            "parsed roster import"
        );

        Ok(RosterImport {
            schools: schools.into_values().collect(),
            persons,
        })
    }
}

pub struct SurveyImporter;

impl SurveyImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<SurveySubmission>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Columns `person_id, submitted_at, role` are required; every other column is an item
    /// identifier. Blank cells are absent items.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<SurveySubmission>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let position = |column: &'static str| {
            headers
                .iter()
                .position(|header| header == column)
                .ok_or(ImportError::MissingColumn(column))
        };
        let person_at = position(PERSON_COLUMN)?;
        let submitted_at = position(SUBMITTED_AT_COLUMN)?;
        let role_at = position(ROLE_COLUMN)?;
        let fixed: BTreeSet<usize> = [person_at, submitted_at, role_at].into_iter().collect();

        let mut submissions = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = index + 2;
            let row_error = |reason: String| ImportError::Row { row, reason };
            let cell = |at: usize| record.get(at).unwrap_or_default();

            let person_id = cell(person_at);
            if person_id.is_empty() {
                return Err(row_error("person_id is blank".to_string()));
            }
            let role: SubmitterRole = cell(role_at)
                .parse()
                .map_err(|err: crate::surveys::ScoringError| row_error(err.to_string()))?;
            let stamp = parser::parse_timestamp(cell(submitted_at)).ok_or_else(|| {
                row_error(format!(
                    "submitted_at '{}' is not RFC 3339 or YYYY-MM-DD",
                    cell(submitted_at)
                ))
            })?;

            let mut answers = AnswerSet::new(role);
            for (at, header) in headers.iter().enumerate() {
                if fixed.contains(&at) {
                    continue;
                }
                let value = parser::parse_intensity(header, cell(at)).map_err(row_error)?;
                if value.is_some() {
                    answers.items.insert(header.to_string(), value);
                }
            }

            submissions.push(SurveySubmission {
                person_id: PersonId(person_id.to_string()),
                answers,
                submitted_at: Some(stamp),
            });
        }

        debug!(rows = submissions.len(), "parsed survey import");
        Ok(submissions)
    }
}
