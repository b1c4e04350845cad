use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::service::{MonitoringService, ServiceError};
use crate::rollup::RollupPolicy;
use crate::roster::{ClassroomLabel, PersonId, SchoolId};
use crate::store::{ResponseStore, RosterDirectory, StoreError};
use crate::surveys::{AnswerSet, SurveySubmission};

const RETRY_AFTER_SECONDS: &str = "1";

/// Router exposing survey intake, previews and the dashboards.
pub fn monitoring_router<S>(service: Arc<MonitoringService<S>>) -> Router
where
    S: ResponseStore + RosterDirectory + 'static,
{
    Router::new()
        .route("/api/v1/surveys", post(submit_handler::<S>))
        .route("/api/v1/surveys/score", post(preview_handler::<S>))
        .route(
            "/api/v1/persons/:person_id/status",
            get(person_status_handler::<S>),
        )
        .route(
            "/api/v1/schools/:school_id/dashboard",
            get(school_dashboard_handler::<S>),
        )
        .route(
            "/api/v1/schools/:school_id/classrooms/:label",
            get(classroom_dashboard_handler::<S>),
        )
        .route("/api/v1/map/schools", get(map_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PolicyQuery {
    policy: Option<String>,
}

impl PolicyQuery {
    /// Requested policy, or `fallback` when absent; current-window requests use the
    /// service's configured window.
    fn resolve<S>(
        &self,
        service: &MonitoringService<S>,
        fallback: RollupPolicy,
    ) -> Result<RollupPolicy, Response>
    where
        S: ResponseStore + RosterDirectory + 'static,
    {
        match self.policy.as_deref() {
            None => Ok(fallback),
            Some(raw) => raw
                .parse::<RollupPolicy>()
                .map(|policy| policy.with_window(service.settings().window))
                .map_err(|err| {
                    let payload = json!({ "error": err.to_string(), "retryable": false });
                    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
                }),
        }
    }
}

/// Runs a read on the blocking pool, bounded by the configured query timeout.
async fn run_blocking<S, T, F>(
    service: Arc<MonitoringService<S>>,
    job: F,
) -> Result<T, ServiceError>
where
    S: ResponseStore + RosterDirectory + 'static,
    T: Send + 'static,
    F: FnOnce(&MonitoringService<S>) -> Result<T, ServiceError> + Send + 'static,
{
    let timeout = service.settings().query_timeout;
    let task = tokio::task::spawn_blocking(move || job(&service));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ServiceError::Store(StoreError::Unavailable(format!(
            "query task failed: {join_error}"
        )))),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "store query timed out");
            Err(ServiceError::Store(StoreError::Timeout))
        }
    }
}

/// Runs a write on the blocking pool, outside the query timeout.
async fn run_write<S, T, F>(service: Arc<MonitoringService<S>>, job: F) -> Result<T, ServiceError>
where
    S: ResponseStore + RosterDirectory + 'static,
    T: Send + 'static,
    F: FnOnce(&MonitoringService<S>) -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&service))
        .await
        .unwrap_or_else(|join_error| {
            Err(ServiceError::Store(StoreError::Unavailable(format!(
                "write task failed: {join_error}"
            ))))
        })
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text(), "retryable": false });
    (rejection.status(), axum::Json(payload)).into_response()
}

pub(crate) fn error_response(err: ServiceError) -> Response {
    let payload = json!({
        "error": err.to_string(),
        "retryable": err.is_retryable(),
    });
    match &err {
        ServiceError::Scoring(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ServiceError::UnknownPerson(_)
        | ServiceError::UnknownSchool(_)
        | ServiceError::UnknownClassroom(_) => {
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        ServiceError::Store(store_error) if store_error.is_retryable() => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, RETRY_AFTER_SECONDS)],
            axum::Json(payload),
        )
            .into_response(),
        ServiceError::Store(_) => {
            error!(error = %err, "store returned unreadable data");
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<MonitoringService<S>>>,
    payload: Result<axum::Json<SurveySubmission>, JsonRejection>,
) -> Response
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let axum::Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    match run_write(service, move |service| service.submit(submission)).await {
        Ok(stored) => (StatusCode::CREATED, axum::Json(stored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn preview_handler<S>(
    State(service): State<Arc<MonitoringService<S>>>,
    payload: Result<axum::Json<AnswerSet>, JsonRejection>,
) -> Response
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let axum::Json(answers) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.preview(&answers) {
        Ok(scored) => (StatusCode::OK, axum::Json(scored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn person_status_handler<S>(
    State(service): State<Arc<MonitoringService<S>>>,
    Path(person_id): Path<String>,
) -> Response
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let person_id = PersonId(person_id);
    match run_blocking(service, move |service| service.person_status(&person_id)).await {
        Ok(status) => (StatusCode::OK, axum::Json(status)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn school_dashboard_handler<S>(
    State(service): State<Arc<MonitoringService<S>>>,
    Path(school_id): Path<String>,
    Query(query): Query<PolicyQuery>,
) -> Response
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let policy = match query.resolve(service.as_ref(), service.current_policy()) {
        Ok(policy) => policy,
        Err(response) => return response,
    };
    let school_id = SchoolId(school_id);
    match run_blocking(service, move |service| {
        service.school_dashboard(&school_id, policy)
    })
    .await
    {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn classroom_dashboard_handler<S>(
    State(service): State<Arc<MonitoringService<S>>>,
    Path((school_id, label)): Path<(String, String)>,
    Query(query): Query<PolicyQuery>,
) -> Response
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let policy = match query.resolve(service.as_ref(), service.current_policy()) {
        Ok(policy) => policy,
        Err(response) => return response,
    };
    let school_id = SchoolId(school_id);
    let classroom = ClassroomLabel::new(label);
    match run_blocking(service, move |service| {
        service.classroom_dashboard(&school_id, &classroom, policy)
    })
    .await
    {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn map_handler<S>(
    State(service): State<Arc<MonitoringService<S>>>,
    Query(query): Query<PolicyQuery>,
) -> Response
where
    S: ResponseStore + RosterDirectory + 'static,
{
    let policy = match query.resolve(service.as_ref(), RollupPolicy::FullHistory) {
        Ok(policy) => policy,
        Err(response) => return response,
    };
    match run_blocking(service, move |service| service.map_overview(policy)).await {
        Ok(overview) => (StatusCode::OK, axum::Json(overview.to_geojson())).into_response(),
        Err(err) => error_response(err),
    }
}
