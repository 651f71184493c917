use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{
    activity_log::{self, Action, Entity as ActivityLog},
    asset, user,
};
use crate::error::AppError;
use crate::extract::{AppJson, ClientMeta};
use crate::middleware::auth::AuthUser;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::routes::assets::find_visible;
use crate::scope;
use crate::services::activity;
use crate::AppState;

pub const DEFAULT_RECENT_LIMIT: u64 = 10;
pub const MAX_RECENT_LIMIT: u64 = 50;

/// `limit` for the recent feed: missing, non-numeric or below 1 gives the
/// default; anything larger than the cap is capped.
pub fn clamp_recent_limit(raw: Option<&str>) -> u64 {
    match raw.map(str::trim).and_then(|r| r.parse::<i64>().ok()) {
        Some(n) if n >= 1 => (n as u64).min(MAX_RECENT_LIMIT),
        _ => DEFAULT_RECENT_LIMIT,
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ActivityLogResponse {
    pub id: Uuid,
    pub asset: Uuid,
    pub asset_title: Option<String>,
    pub user: i32,
    pub username: Option<String>,
    pub action: Action,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: chrono::NaiveDateTime,
}

async fn build_responses<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<activity_log::Model>,
) -> Result<Vec<ActivityLogResponse>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let titles: HashMap<Uuid, String> = asset::Entity::find()
        .select_only()
        .column(asset::Column::Id)
        .column(asset::Column::Title)
        .filter(asset::Column::Id.is_in(rows.iter().map(|r| r.asset_id)))
        .into_tuple::<(Uuid, String)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let usernames: HashMap<i32, String> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Username)
        .filter(user::Column::Id.is_in(rows.iter().map(|r| r.user_id)))
        .into_tuple::<(i32, String)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| ActivityLogResponse {
            asset_title: titles.get(&row.asset_id).cloned(),
            username: usernames.get(&row.user_id).cloned(),
            id: row.id,
            asset: row.asset_id,
            user: row.user_id,
            action: row.action,
            details: row.details,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            timestamp: row.timestamp,
        })
        .collect())
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ActivityFilters {
    pub action: Option<Action>,
    /// User id.
    pub user: Option<i32>,
    /// Asset id.
    pub asset: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/activity/logs",
    params(Pagination, ActivityFilters),
    responses(
        (status = 200, description = "Activity on visible assets, newest first", body = PaginatedResponse<ActivityLogResponse>)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Activity"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<ActivityFilters>,
) -> Result<Json<PaginatedResponse<ActivityLogResponse>>, AppError> {
    let mut condition =
        Condition::all().add(scope::through_asset(&actor, activity_log::Column::AssetId));
    if let Some(action) = filters.action {
        condition = condition.add(activity_log::Column::Action.eq(action));
    }
    if let Some(user_id) = filters.user {
        condition = condition.add(activity_log::Column::UserId.eq(user_id));
    }
    if let Some(asset_id) = filters.asset {
        condition = condition.add(activity_log::Column::AssetId.eq(asset_id));
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginator = ActivityLog::find()
        .filter(condition)
        .order_by_desc(activity_log::Column::Timestamp)
        .paginate(&state.db, limit);

    let total_items = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;
    let data = build_responses(&state.db, rows).await?;

    Ok(Json(PaginatedResponse::new(data, total_items, page, limit)))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateLogRequest {
    pub asset: Uuid,
    pub action: Action,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

#[utoipa::path(
    post,
    path = "/api/activity/logs",
    request_body = CreateLogRequest,
    responses(
        (status = 201, description = "Activity recorded", body = ActivityLogResponse),
        (status = 400, description = "Invalid asset or action")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Activity"
)]
pub async fn create_log(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    client: ClientMeta,
    AppJson(payload): AppJson<CreateLogRequest>,
) -> Result<(StatusCode, Json<ActivityLogResponse>), AppError> {
    let asset = find_visible(&state.db, &actor, payload.asset)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => {
                AppError::field("asset", "Invalid asset - object does not exist.")
            }
            other => other,
        })?;

    let entry = activity::record(
        &state.db,
        asset.id,
        actor.id,
        payload.action,
        payload.details.unwrap_or_else(|| serde_json::json!({})),
        &client,
    )
    .await?;

    let mut built = build_responses(&state.db, vec![entry]).await?;
    let response = built
        .pop()
        .ok_or_else(|| AppError::InternalServerError("activity response went missing".to_string()))?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/activity/logs/{id}",
    params(
        ("id" = Uuid, Path, description = "Activity log ID")
    ),
    responses(
        (status = 200, description = "Activity entry", body = ActivityLogResponse),
        (status = 404, description = "Not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Activity"
)]
pub async fn get_log(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityLogResponse>, AppError> {
    let row = ActivityLog::find_by_id(id)
        .filter(scope::through_asset(&actor, activity_log::Column::AssetId))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Activity log not found".to_string()))?;

    let mut built = build_responses(&state.db, vec![row]).await?;
    built
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::InternalServerError("activity response went missing".to_string()))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RecentQuery {
    /// Default 10, at most 50.
    pub limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/activity/recent",
    params(RecentQuery),
    responses(
        (status = 200, description = "Latest activity on visible assets", body = [ActivityLogResponse])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Activity"
)]
pub async fn recent_activity(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ActivityLogResponse>>, AppError> {
    let limit = clamp_recent_limit(query.limit.as_deref());

    let rows = ActivityLog::find()
        .filter(scope::through_asset(&actor, activity_log::Column::AssetId))
        .order_by_desc(activity_log::Column::Timestamp)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(build_responses(&state.db, rows).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_limit_defaults_and_caps() {
        assert_eq!(clamp_recent_limit(None), 10);
        assert_eq!(clamp_recent_limit(Some("abc")), 10);
        assert_eq!(clamp_recent_limit(Some("0")), 10);
        assert_eq!(clamp_recent_limit(Some("-3")), 10);
        assert_eq!(clamp_recent_limit(Some("25")), 25);
        assert_eq!(clamp_recent_limit(Some("999")), 50);
    }
}
