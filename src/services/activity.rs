use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::activity_log::{self, Action};
use crate::extract::ClientMeta;

/// Append one entry to the activity log.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    asset_id: Uuid,
    user_id: i32,
    action: Action,
    details: Value,
    client: &ClientMeta,
) -> Result<activity_log::Model, DbErr> {
    let details = if details.is_object() {
        details
    } else {
        serde_json::json!({})
    };

    let entry = activity_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        asset_id: Set(asset_id),
        user_id: Set(user_id),
        action: Set(action),
        details: Set(details),
        ip_address: Set(client.ip.clone()),
        user_agent: Set(client.user_agent.clone()),
        timestamp: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(conn)
    .await?;

    tracing::debug!(asset_id = %asset_id, user_id, action = ?action, "activity recorded");
    Ok(entry)
}
