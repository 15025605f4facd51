use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::resolver::{PeriodViewResolver, ResolveError};
use super::view::{ViewModeError, ViewQuery};
use crate::feed::MetricsGateway;
use crate::snapshots::{SnapshotError, SnapshotStore};
use crate::tiers::{Criterion, TierCatalog};

/// Router builder exposing the tier board, period close, and catalog endpoints.
pub fn period_router<G, S>(resolver: Arc<PeriodViewResolver<G, S>>) -> Router
where
    G: MetricsGateway + 'static,
    S: SnapshotStore + 'static,
{
    Router::new()
        .route("/api/v1/catalog", get(catalog_handler))
        .route(
            "/api/v1/branches/:branch_key/board",
            get(board_handler::<G, S>),
        )
        .route(
            "/api/v1/branches/:branch_key/representatives/:representative",
            get(representative_handler::<G, S>),
        )
        .route(
            "/api/v1/branches/:branch_key/periods",
            get(list_periods_handler::<G, S>).post(close_period_handler::<G, S>),
        )
        .with_state(resolver)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClosePeriodRequest {
    #[serde(default, alias = "period_year")]
    year: Option<i32>,
    #[serde(default, alias = "period_month")]
    month: Option<u32>,
    #[serde(default)]
    context: Option<Value>,
}

pub(crate) async fn catalog_handler() -> Json<Value> {
    let catalog = TierCatalog::standard();
    let points: Vec<Value> = Criterion::ordered()
        .into_iter()
        .map(|criterion| {
            json!({
                "criterion": criterion,
                "label": criterion.label(),
                "points": criterion.points(),
            })
        })
        .collect();

    Json(json!({
        "tiers": catalog.tiers_ordered_by_rank(),
        "fallback": catalog.fallback_tier(),
        "criteria": points,
    }))
}

pub(crate) async fn board_handler<G, S>(
    State(resolver): State<Arc<PeriodViewResolver<G, S>>>,
    Path(branch_key): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Response
where
    G: MetricsGateway + 'static,
    S: SnapshotStore + 'static,
{
    let mode = match query.view_mode() {
        Ok(mode) => mode,
        Err(err) => return view_mode_rejection(err),
    };

    match resolver.resolve(&branch_key, mode).await {
        Ok(board) => (StatusCode::OK, Json(board)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn representative_handler<G, S>(
    State(resolver): State<Arc<PeriodViewResolver<G, S>>>,
    Path((branch_key, representative)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
) -> Response
where
    G: MetricsGateway + 'static,
    S: SnapshotStore + 'static,
{
    let mode = match query.view_mode() {
        Ok(mode) => mode,
        Err(err) => return view_mode_rejection(err),
    };

    match resolver
        .representative(&branch_key, &representative, mode)
        .await
    {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_periods_handler<G, S>(
    State(resolver): State<Arc<PeriodViewResolver<G, S>>>,
    Path(branch_key): Path<String>,
) -> Response
where
    G: MetricsGateway + 'static,
    S: SnapshotStore + 'static,
{
    match resolver.list_periods(&branch_key).await {
        Ok(periods) => (StatusCode::OK, Json(periods)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn close_period_handler<G, S>(
    State(resolver): State<Arc<PeriodViewResolver<G, S>>>,
    Path(branch_key): Path<String>,
    Json(request): Json<ClosePeriodRequest>,
) -> Response
where
    G: MetricsGateway + 'static,
    S: SnapshotStore + 'static,
{
    let (year, month) = match (request.year, request.month) {
        (Some(year), Some(month)) => (year, month),
        (year, month) => {
            let missing = [("period_year", year.is_none()), ("period_month", month.is_none())]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
            return ResolveError::from(SnapshotError::Validation { missing }).into_response();
        }
    };

    match resolver
        .close_period(&branch_key, year, month, request.context)
        .await
    {
        Ok(closed) => (StatusCode::CREATED, Json(closed)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn view_mode_rejection(err: ViewModeError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, payload) = match &self {
            ResolveError::UnknownBranch(_) | ResolveError::UnknownRepresentative { .. } => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            ResolveError::NoSnapshot {
                branch_key,
                year,
                month,
            } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": message,
                    "outcome": "no_snapshot",
                    "branch_key": branch_key,
                    "period_year": year,
                    "period_month": month,
                }),
            ),
            ResolveError::Fetch { source, .. } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": message, "code": source.code() }),
            ),
            ResolveError::Snapshot(SnapshotError::Validation { missing }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "missing": missing }),
            ),
            ResolveError::Snapshot(SnapshotError::InvalidField { field, .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "field": field }),
            ),
            ResolveError::Snapshot(SnapshotError::Persistence(failure)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": message,
                    "code": failure.code,
                    "detail": failure.detail,
                    "hint": failure.hint,
                }),
            ),
            ResolveError::UnreadablePayload { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };

        (status, Json(payload)).into_response()
    }
}
