//! Batched reads behind the feed view-models.
//!
//! Every scope hands its base post rows in here; the dependent
//! reaction/comment/badge rows are fetched in independent queries and the
//! assembly itself happens in `infohero_common::model::feed`. The first
//! failing fetch aborts the whole chain, so partial aggregates never reach
//! a response.

use infohero_common::model::{
    Id,
    feed::{FeedRows, PostView, assemble_feed},
    post::Post,
    profile::ProfileMarker,
};
use infohero_db::client::{DbClient, Result};

pub async fn load_views(
    db: &DbClient,
    posts: Vec<Post>,
    viewer: Option<Id<ProfileMarker>>,
) -> Result<Vec<PostView>> {
    let post_ids: Vec<_> = posts.iter().map(|post| post.id).collect();

    let post_reactions = db.fetch_post_reactions(&post_ids).await?;
    let comments = db.fetch_comments_for_posts(&post_ids).await?;
    let badge_links = db.fetch_badge_links(&post_ids).await?;

    let badge_ids: Vec<_> = badge_links.iter().map(|link| link.badge).collect();
    let badges = db.fetch_badges_by_ids(&badge_ids).await?;

    let comment_ids: Vec<_> = comments.iter().map(|comment| comment.id).collect();
    let comment_reactions = db.fetch_comment_reactions(&comment_ids).await?;

    Ok(assemble_feed(
        FeedRows {
            posts,
            post_reactions,
            comments,
            comment_reactions,
            badge_links,
            badges,
        },
        viewer,
    ))
}
