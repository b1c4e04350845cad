//! Recency windowing and red/orange/green rollups over scored responses.
//!
//! The window decides which responses describe a person "now"; the policy decides whether a
//! group is judged on that window or on every response ever recorded.

mod query;
mod status;
mod window;

#[cfg(test)]
mod tests;

pub use query::{bulk_histories, bulk_windowed_severities, group_rows, top_k_per_person};
pub use status::{
    combine_statuses, group_status, person_risk, GroupStatus, ParsePolicyError, PersonRisk,
    RollupPolicy,
};
pub use window::{rank_history, windowed_severities, RecencyWindow};
