use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use infohero_common::model::badge::Badge;
use infohero_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(list_badges)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/badges", rejection(ServerError))]
struct ListBadgesPath();

async fn list_badges(
    ListBadgesPath(): ListBadgesPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Badge>>> {
    let badges = db.fetch_badges().await?;

    Ok(Json(badges))
}
