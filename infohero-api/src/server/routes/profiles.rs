use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, feed, json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use infohero_common::model::{
    Id,
    feed::PostView,
    profile::{Profile, ProfileMarker},
};
use infohero_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_profile)
        .typed_get(get_profile_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profiles/{id}", rejection(ServerError))]
struct GetProfilePath {
    id: Id<ProfileMarker>,
}

async fn get_profile(
    GetProfilePath { id }: GetProfilePath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Profile>> {
    let profile = db
        .fetch_profile(id)
        .await?
        .ok_or(ServerError::ProfileByIdNotFound(id))?;

    Ok(Json(profile))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profiles/{id}/posts", rejection(ServerError))]
struct GetProfilePostsPath {
    id: Id<ProfileMarker>,
}

async fn get_profile_posts(
    GetProfilePostsPath { id }: GetProfilePostsPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<Vec<PostView>>> {
    if !db.profile_exists(id).await? {
        return Err(ServerError::ProfileByIdNotFound(id));
    }

    let posts = db.fetch_posts_by_author(id).await?;
    let views = feed::load_views(&db, posts, viewer.map(AuthenticatedUser::profile_id)).await?;

    Ok(Json(views))
}
