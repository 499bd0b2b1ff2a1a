use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    feed,
    json::Json,
    moderation::{GateVerdict, ModerationClient},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use infohero_common::model::{
    Id,
    feed::PostView,
    post::{PostDraft, PostMarker},
    reaction::{Polarity, ReactionCounts},
};
use infohero_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_feed)
        .typed_get(get_post)
        .typed_get(get_tag_feed)
        .typed_post(create_post)
        .typed_post(like_post)
        .typed_post(unlike_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed", rejection(ServerError))]
struct FeedPath();

async fn get_feed(
    FeedPath(): FeedPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<Vec<PostView>>> {
    let posts = db.fetch_posts_newest_first().await?;
    let views = feed::load_views(&db, posts, viewer.map(AuthenticatedUser::profile_id)).await?;

    Ok(Json(views))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<PostView>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let mut views =
        feed::load_views(&db, vec![post], viewer.map(AuthenticatedUser::profile_id)).await?;
    let view = views.pop().ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(view))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tags/{name}/posts", rejection(ServerError))]
struct TagFeedPath {
    name: String,
}

async fn get_tag_feed(
    TagFeedPath { name }: TagFeedPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<Vec<PostView>>> {
    let badge = db
        .fetch_badge_by_name(&name)
        .await?
        .ok_or(ServerError::BadgeByNameNotFound(name))?;

    let posts = db.fetch_posts_with_badge(badge.id).await?;
    let views = feed::load_views(&db, posts, viewer.map(AuthenticatedUser::profile_id)).await?;

    Ok(Json(views))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct CreatedPost {
    id: Id<PostMarker>,
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    State(moderation): State<Arc<ModerationClient>>,
    user: AuthenticatedUser,
    Json(draft): Json<PostDraft>,
) -> Result<Json<CreatedPost>> {
    let verdict = moderation.screen(&draft.moderation_text()).await;
    let GateVerdict::Cleared { fake_detection } = verdict else {
        return Err(ServerError::ModerationBlocked);
    };

    let badges = draft.badges.clone();
    let new_post = draft.into_new_post(user.profile_id(), fake_detection);

    let post_id = db.create_post(&new_post).await?;
    if let Err(err) = db.insert_post_badges(post_id, &badges).await {
        // Two-phase write: take the post back out instead of leaving it
        // around without its badges.
        if let Err(cleanup_err) = db.delete_post(post_id).await {
            error!(
                error = %cleanup_err,
                %post_id,
                "Could not delete post after its badge associations failed"
            );
        }
        return Err(err.into());
    }

    Ok(Json(CreatedPost { id: post_id }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/unlike", rejection(ServerError))]
struct UnlikePostPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub(super) struct ReactionResponse {
    pub active: bool,
    #[serde(flatten)]
    pub counts: ReactionCounts,
}

async fn like_post(
    LikePostPath { id }: LikePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<ReactionResponse>> {
    toggle_reaction(&db, user, id, Polarity::Like).await
}

async fn unlike_post(
    UnlikePostPath { id }: UnlikePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<ReactionResponse>> {
    toggle_reaction(&db, user, id, Polarity::Unlike).await
}

async fn toggle_reaction(
    db: &DbClient,
    user: AuthenticatedUser,
    id: Id<PostMarker>,
    polarity: Polarity,
) -> Result<Json<ReactionResponse>> {
    if !db.post_exists(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let active = db
        .toggle_post_reaction(user.profile_id(), id, polarity)
        .await?;
    let counts = db.count_post_reactions(id).await?;

    Ok(Json(ReactionResponse { active, counts }))
}
