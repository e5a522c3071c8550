use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;

use super::{done, ApiPath, ApiQuery, ApiState};
use crate::auth::Principal;
use crate::errors::Result;
use crate::models::ReportRecord;
use crate::reporting::{
    self, ActivityReport, ActivityReportQuery, FinancialReportQuery, FinancialRow,
    GeneratedReport, SponsorshipReport, SponsorshipReportQuery,
};

async fn sponsorship_report(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiQuery(query): ApiQuery<SponsorshipReportQuery>,
) -> Result<Json<GeneratedReport<SponsorshipReport>>> {
    Ok(Json(
        reporting::sponsorship_report(&state.pool, &principal, query).await?,
    ))
}

async fn financial_report(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiQuery(query): ApiQuery<FinancialReportQuery>,
) -> Result<Json<GeneratedReport<Vec<FinancialRow>>>> {
    Ok(Json(
        reporting::financial_report(&state.pool, &principal, query).await?,
    ))
}

async fn activity_report(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiQuery(query): ApiQuery<ActivityReportQuery>,
) -> Result<Json<GeneratedReport<ActivityReport>>> {
    Ok(Json(
        reporting::activity_report(&state.pool, &principal, query).await?,
    ))
}

async fn list_reports(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
) -> Result<Json<Vec<ReportRecord>>> {
    Ok(Json(reporting::list_reports(&state.pool, &principal).await?))
}

async fn get_report(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ReportRecord>> {
    Ok(Json(reporting::get_report(&state.pool, id, &principal).await?))
}

async fn delete_report(
    State(state): State<Arc<ApiState>>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>> {
    reporting::delete_report(&state.pool, id, &principal).await?;
    Ok(done("Report deleted"))
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_reports))
        .route("/sponsorship", get(sponsorship_report))
        .route("/financial", get(financial_report))
        .route("/activity", get(activity_report))
        .route("/:id", get(get_report).delete(delete_report))
}
