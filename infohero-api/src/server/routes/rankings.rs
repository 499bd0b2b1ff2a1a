use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, feed, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use infohero_common::model::{
    feed::{PostView, sort_by_net_score},
    profile::Hero,
};
use infohero_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

const LEADERBOARD_SIZE: i64 = 10;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(top_posts)
        .typed_get(top_heroes)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/rankings/posts", rejection(ServerError))]
struct TopPostsPath();

async fn top_posts(
    TopPostsPath(): TopPostsPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<Vec<PostView>>> {
    let posts = db.fetch_top_posts(LEADERBOARD_SIZE).await?;
    let mut views =
        feed::load_views(&db, posts, viewer.map(AuthenticatedUser::profile_id)).await?;

    // The aggregate already orders by net score; re-sorting over the
    // assembled counts pins the final order to the same criterion.
    sort_by_net_score(&mut views);

    Ok(Json(views))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/rankings/heroes", rejection(ServerError))]
struct TopHeroesPath();

async fn top_heroes(
    TopHeroesPath(): TopHeroesPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Hero>>> {
    let heroes = db.fetch_top_heroes(LEADERBOARD_SIZE).await?;

    Ok(Json(heroes))
}
