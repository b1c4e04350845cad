//! Survey scoring and red/orange/green rollups for school wellbeing monitoring.
//!
//! Parent and teacher questionnaires are scored by [`surveys::ResponseScorer`] into a
//! [`Severity`]; [`rollup`] turns the scored history of a classroom, a school or the whole
//! population into a [`rollup::GroupStatus`]. [`monitoring`] composes both behind a service
//! facade and an axum router.

pub mod config;
pub mod error;
pub mod import;
pub mod monitoring;
pub mod rollup;
pub mod roster;
mod severity;
pub mod store;
pub mod surveys;
pub mod telemetry;

pub use severity::{ParseSeverityError, Severity};
