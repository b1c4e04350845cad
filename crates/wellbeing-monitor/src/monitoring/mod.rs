//! Service facade, dashboard views and HTTP endpoints over the scorer, the store and the
//! rollup engine.

pub mod router;
mod service;
mod views;

#[cfg(test)]
mod tests;

pub use router::monitoring_router;
pub use service::{MonitoringService, MonitoringSettings, ServiceError};
pub use views::{
    ActivityDigest, ActivityEntry, ClassroomDashboard, ClassroomSummary, MapOverview,
    PersonStatus, SchoolDashboard, SchoolStatus, StatusCounts,
};
