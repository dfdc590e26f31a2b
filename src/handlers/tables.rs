use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::boundaries::{Period, TimeRange};
use crate::services::tables::TableSummary;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableResponse {
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub order_count: u64,
    pub revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTableRequest {
    #[validate(length(min = 1, message = "Table name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RenameTableRequest {
    #[validate(length(min = 1, message = "Table name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TableListQuery {
    /// Optional reporting period restricting the activity figures.
    pub period: Option<String>,
}

fn to_response(summary: TableSummary) -> TableResponse {
    TableResponse {
        id: summary.table.id,
        name: summary.table.name,
        is_default: summary.table.is_default,
        order_count: summary.order_count,
        revenue: summary.revenue,
        created_at: summary.table.created_at,
        updated_at: summary.table.updated_at,
    }
}

/// List tables with their order activity.
#[utoipa::path(
    get,
    path = "/api/v1/tables",
    params(("period" = Option<String>, Query, description = "Reporting period token")),
    responses((status = 200, description = "Tables with activity", body = [TableResponse])),
    tag = "tables"
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Query(query): Query<TableListQuery>,
) -> ApiResult<Vec<TableResponse>> {
    let ctx = state.services.restaurant.context().await?;

    let range = match query.period {
        Some(token) => Some(TimeRange::resolve(Period::parse(&token)?)),
        None => None,
    };

    let summaries = state.services.tables.list_with_activity(&ctx, range).await?;
    Ok(Json(ApiResponse::success(
        summaries.into_iter().map(to_response).collect(),
    )))
}

/// Create a table.
#[utoipa::path(
    post,
    path = "/api/v1/tables",
    request_body = CreateTableRequest,
    responses((status = 200, description = "Created table", body = TableResponse)),
    tag = "tables"
)]
pub async fn create_table(
    State(state): State<AppState>,
    Json(request): Json<CreateTableRequest>,
) -> ApiResult<TableResponse> {
    request.validate()?;
    let ctx = state.services.restaurant.context().await?;
    let table = state.services.tables.create(&ctx, request.name).await?;
    Ok(Json(ApiResponse::success(to_response(TableSummary {
        table,
        order_count: 0,
        revenue: Decimal::ZERO,
    }))))
}

/// Rename a table. The default table is exempt.
#[utoipa::path(
    put,
    path = "/api/v1/tables/{id}",
    request_body = RenameTableRequest,
    responses(
        (status = 200, description = "Renamed table", body = TableResponse),
        (status = 400, description = "Default table cannot be renamed")
    ),
    tag = "tables"
)]
pub async fn rename_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameTableRequest>,
) -> ApiResult<TableResponse> {
    request.validate()?;
    let table = state.services.tables.rename(id, request.name).await?;
    Ok(Json(ApiResponse::success(to_response(TableSummary {
        table,
        order_count: 0,
        revenue: Decimal::ZERO,
    }))))
}

/// Delete a table. The default table is exempt.
#[utoipa::path(
    delete,
    path = "/api/v1/tables/{id}",
    responses(
        (status = 200, description = "Table deleted"),
        (status = 400, description = "Default table cannot be deleted")
    ),
    tag = "tables"
)]
pub async fn delete_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.tables.delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}
