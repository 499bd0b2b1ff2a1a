use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json,
    routes::posts::ReactionResponse,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use infohero_common::model::{
    Id,
    comment::{CommentMarker, CreateComment},
    post::PostMarker,
    reaction::Polarity,
};
use infohero_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_comment)
        .typed_delete(delete_comment)
        .typed_post(like_comment)
        .typed_post(unlike_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct CreateCommentPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct CreatedComment {
    id: Id<CommentMarker>,
}

async fn create_comment(
    CreateCommentPath { id }: CreateCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(comment): Json<CreateComment>,
) -> Result<Json<CreatedComment>> {
    if !db.post_exists(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let comment_id = db
        .create_comment(id, user.profile_id(), &comment.content)
        .await?;

    Ok(Json(CreatedComment { id: comment_id }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id }: DeleteCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<()>> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    if comment.author.id != user.profile_id() {
        return Err(ServerError::NotCommentAuthor);
    }

    db.delete_comment(id).await?;

    Ok(Json(()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/like", rejection(ServerError))]
struct LikeCommentPath {
    id: Id<CommentMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/unlike", rejection(ServerError))]
struct UnlikeCommentPath {
    id: Id<CommentMarker>,
}

async fn like_comment(
    LikeCommentPath { id }: LikeCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<ReactionResponse>> {
    toggle_reaction(&db, user, id, Polarity::Like).await
}

async fn unlike_comment(
    UnlikeCommentPath { id }: UnlikeCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<ReactionResponse>> {
    toggle_reaction(&db, user, id, Polarity::Unlike).await
}

async fn toggle_reaction(
    db: &DbClient,
    user: AuthenticatedUser,
    id: Id<CommentMarker>,
    polarity: Polarity,
) -> Result<Json<ReactionResponse>> {
    if !db.comment_exists(id).await? {
        return Err(ServerError::CommentByIdNotFound(id));
    }

    let active = db
        .toggle_comment_reaction(user.profile_id(), id, polarity)
        .await?;
    let counts = db.count_comment_reactions(id).await?;

    Ok(Json(ReactionResponse { active, counts }))
}
