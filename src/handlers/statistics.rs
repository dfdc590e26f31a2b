use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::services::boundaries::Period;
use crate::services::statistics::{CategoryBreakdown, SummaryStats};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PeriodQuery {
    /// Reporting period token, defaults to ALL_TIME.
    pub period: Option<String>,
}

fn parse_period(query: PeriodQuery) -> Result<Period, crate::errors::ServiceError> {
    match query.period {
        Some(token) => Period::parse(&token),
        None => Ok(Period::AllTime),
    }
}

/// Headline dashboard figures for a period.
#[utoipa::path(
    get,
    path = "/api/v1/statistics/summary",
    params(("period" = Option<String>, Query, description = "Reporting period token")),
    responses(
        (status = 200, description = "Summary statistics", body = SummaryStats),
        (status = 400, description = "Unknown period token")
    ),
    tag = "statistics"
)]
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<SummaryStats> {
    let period = parse_period(query)?;
    let ctx = state.services.restaurant.context().await?;
    let stats = state.services.statistics.summary(&ctx, period).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Sold quantities per category and per product for a period.
#[utoipa::path(
    get,
    path = "/api/v1/statistics/breakdown",
    params(("period" = Option<String>, Query, description = "Reporting period token")),
    responses(
        (status = 200, description = "Category breakdown", body = CategoryBreakdown),
        (status = 400, description = "Unknown period token")
    ),
    tag = "statistics"
)]
pub async fn breakdown(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<CategoryBreakdown> {
    let period = parse_period(query)?;
    let ctx = state.services.restaurant.context().await?;
    let breakdown = state
        .services
        .statistics
        .category_breakdown(&ctx, period)
        .await?;
    Ok(Json(ApiResponse::success(breakdown)))
}

/// Free-text reading of the period's breakdown from the external
/// summarizer.
#[utoipa::path(
    get,
    path = "/api/v1/statistics/insights",
    params(("period" = Option<String>, Query, description = "Reporting period token")),
    responses(
        (status = 200, description = "Analysis text"),
        (status = 502, description = "Summarizer unreachable"),
        (status = 503, description = "Summarizer not configured")
    ),
    tag = "statistics"
)]
pub async fn insights(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<serde_json::Value> {
    let period = parse_period(query)?;
    let ctx = state.services.restaurant.context().await?;
    let breakdown = state
        .services
        .statistics
        .category_breakdown(&ctx, period)
        .await?;
    let summary = state.services.insights.summarize(period, &breakdown).await?;
    Ok(Json(ApiResponse::success(json!({
        "period": period,
        "summary": summary,
    }))))
}
