//! Assembly of denormalized post view-models.
//!
//! Every read scope (main feed, single post, tag feed, author feed) fetches
//! its base post rows plus the related reaction/comment/badge rows and runs
//! them through [`assemble_feed`]. Counts are always derived here by
//! counting rows; nothing is read from stored counters.

use crate::model::{
    Id,
    badge::{Badge, BadgeLink, BadgeMarker},
    comment::{Comment, CommentMarker},
    post::{Post, PostMarker},
    profile::ProfileMarker,
    reaction::{CommentReaction, Polarity, PostReaction},
};
use serde::Serialize;
use std::collections::HashMap;

/// The row sets one aggregation pass works over, fetched through
/// independent per-table queries.
#[derive(Clone, Debug, Default)]
pub struct FeedRows {
    pub posts: Vec<Post>,
    pub post_reactions: Vec<PostReaction>,
    pub comments: Vec<Comment>,
    pub comment_reactions: Vec<CommentReaction>,
    pub badge_links: Vec<BadgeLink>,
    pub badges: Vec<Badge>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub likes: u64,
    pub unlikes: u64,
    pub viewer_has_liked: bool,
    pub viewer_has_unliked: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub likes: u64,
    pub unlikes: u64,
    pub viewer_has_liked: bool,
    pub viewer_has_unliked: bool,
    pub badges: Vec<Badge>,
    pub comments: Vec<CommentView>,
}

impl PostView {
    /// Likes minus unlikes, the ranking criterion.
    #[must_use]
    pub fn net_score(&self) -> i64 {
        self.likes.cast_signed() - self.unlikes.cast_signed()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
struct Tally {
    likes: u64,
    unlikes: u64,
    viewer_has_liked: bool,
    viewer_has_unliked: bool,
}

impl Tally {
    fn record(&mut self, polarity: Polarity, is_viewer: bool) {
        match polarity {
            Polarity::Like => {
                self.likes += 1;
                self.viewer_has_liked |= is_viewer;
            }
            Polarity::Unlike => {
                self.unlikes += 1;
                self.viewer_has_unliked |= is_viewer;
            }
        }
    }
}

/// Builds one view-model per post, preserving the order of the post rows.
///
/// Reaction and comment rows whose target is not in the post set are
/// ignored, as are badge links pointing at unknown badges.
#[must_use]
pub fn assemble_feed(rows: FeedRows, viewer: Option<Id<ProfileMarker>>) -> Vec<PostView> {
    let FeedRows {
        posts,
        post_reactions,
        comments,
        comment_reactions,
        badge_links,
        badges,
    } = rows;

    let mut post_tallies: HashMap<Id<PostMarker>, Tally> = HashMap::new();
    for reaction in post_reactions {
        let is_viewer = viewer == Some(reaction.profile);
        post_tallies
            .entry(reaction.post)
            .or_default()
            .record(reaction.polarity, is_viewer);
    }

    let mut comment_tallies: HashMap<Id<CommentMarker>, Tally> = HashMap::new();
    for reaction in comment_reactions {
        let is_viewer = viewer == Some(reaction.profile);
        comment_tallies
            .entry(reaction.comment)
            .or_default()
            .record(reaction.polarity, is_viewer);
    }

    let mut comments_by_post: HashMap<Id<PostMarker>, Vec<Comment>> = HashMap::new();
    for comment in comments {
        comments_by_post.entry(comment.post).or_default().push(comment);
    }

    let badge_lookup: HashMap<Id<BadgeMarker>, Badge> =
        badges.into_iter().map(|badge| (badge.id, badge)).collect();

    let mut badges_by_post: HashMap<Id<PostMarker>, Vec<Badge>> = HashMap::new();
    for link in badge_links {
        if let Some(badge) = badge_lookup.get(&link.badge) {
            badges_by_post
                .entry(link.post)
                .or_default()
                .push(badge.clone());
        }
    }

    posts
        .into_iter()
        .map(|post| {
            let tally = post_tallies.get(&post.id).copied().unwrap_or_default();
            let comments = comments_by_post
                .remove(&post.id)
                .unwrap_or_default()
                .into_iter()
                .map(|comment| {
                    let tally = comment_tallies.get(&comment.id).copied().unwrap_or_default();
                    CommentView {
                        comment,
                        likes: tally.likes,
                        unlikes: tally.unlikes,
                        viewer_has_liked: tally.viewer_has_liked,
                        viewer_has_unliked: tally.viewer_has_unliked,
                    }
                })
                .collect();
            let badges = badges_by_post.remove(&post.id).unwrap_or_default();

            PostView {
                likes: tally.likes,
                unlikes: tally.unlikes,
                viewer_has_liked: tally.viewer_has_liked,
                viewer_has_unliked: tally.viewer_has_unliked,
                badges,
                comments,
                post,
            }
        })
        .collect()
}

/// Re-sorts a leaderboard page by net score, descending. The top-posts
/// aggregate already orders server-side; this guards the final order in
/// case the two criteria ever drift apart.
pub fn sort_by_net_score(views: &mut [PostView]) {
    views.sort_by_key(|view| std::cmp::Reverse(view.net_score()));
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        badge::{Badge, BadgeLink},
        comment::{Comment, CommentMarker},
        feed::{FeedRows, assemble_feed, sort_by_net_score},
        post::{Post, PostMarker, PostTitle},
        profile::{Author, ProfileMarker, Username},
        reaction::{CommentReaction, Polarity, PostReaction},
    };
    use time::macros::utc_datetime;

    fn author(id: u64) -> Author {
        Author {
            id: id.into(),
            username: Username::new(format!("user{id}")).unwrap(),
            avatar_url: None,
        }
    }

    fn post(id: u64) -> Post {
        Post {
            id: id.into(),
            author: author(1),
            title: PostTitle::new(format!("Post {id}")).unwrap(),
            content: "content".to_owned(),
            image_url: None,
            source: None,
            hashtags: Vec::new(),
            fake_detection: false,
            created_at: utc_datetime!(2025-05-01 12:00),
        }
    }

    fn comment(id: u64, post: u64) -> Comment {
        Comment {
            id: id.into(),
            post: post.into(),
            author: author(2),
            content: "a comment".to_owned(),
            created_at: utc_datetime!(2025-05-01 13:00),
        }
    }

    fn like(profile: u64, target: u64) -> PostReaction {
        PostReaction {
            profile: profile.into(),
            post: target.into(),
            polarity: Polarity::Like,
        }
    }

    fn unlike(profile: u64, target: u64) -> PostReaction {
        PostReaction {
            profile: profile.into(),
            post: target.into(),
            polarity: Polarity::Unlike,
        }
    }

    #[test]
    fn counts_are_derived_per_post() {
        let rows = FeedRows {
            posts: vec![post(1), post(2)],
            post_reactions: vec![like(10, 1), like(11, 1), unlike(12, 1), like(10, 2)],
            ..FeedRows::default()
        };

        let views = assemble_feed(rows, None);

        assert_eq!(views[0].likes, 2);
        assert_eq!(views[0].unlikes, 1);
        assert_eq!(views[1].likes, 1);
        assert_eq!(views[1].unlikes, 0);
    }

    #[test]
    fn counts_are_independent_of_row_order() {
        let reactions = vec![like(10, 1), unlike(11, 1), like(12, 1)];
        let mut reversed = reactions.clone();
        reversed.reverse();

        let forward = assemble_feed(
            FeedRows {
                posts: vec![post(1)],
                post_reactions: reactions,
                ..FeedRows::default()
            },
            None,
        );
        let backward = assemble_feed(
            FeedRows {
                posts: vec![post(1)],
                post_reactions: reversed,
                ..FeedRows::default()
            },
            None,
        );

        assert_eq!(forward, backward);
    }

    #[test]
    fn removing_a_reaction_restores_the_original_count() {
        let base = FeedRows {
            posts: vec![post(1)],
            post_reactions: vec![like(10, 1)],
            ..FeedRows::default()
        };
        let toggled_on = FeedRows {
            posts: vec![post(1)],
            post_reactions: vec![like(10, 1), like(11, 1)],
            ..FeedRows::default()
        };

        let before = assemble_feed(base.clone(), None)[0].likes;
        let during = assemble_feed(toggled_on, None)[0].likes;
        let after = assemble_feed(base, None)[0].likes;

        assert_eq!(during, before + 1);
        assert_eq!(after, before);
    }

    #[test]
    fn viewer_flags_only_apply_to_the_viewer() {
        let rows = || FeedRows {
            posts: vec![post(1)],
            post_reactions: vec![like(10, 1), unlike(11, 1)],
            ..FeedRows::default()
        };

        let anonymous = assemble_feed(rows(), None);
        assert!(!anonymous[0].viewer_has_liked);
        assert!(!anonymous[0].viewer_has_unliked);

        let as_liker = assemble_feed(rows(), Some(Id::<ProfileMarker>::from(10_u64)));
        assert!(as_liker[0].viewer_has_liked);
        assert!(!as_liker[0].viewer_has_unliked);
    }

    #[test]
    fn comments_are_grouped_and_enriched() {
        let rows = FeedRows {
            posts: vec![post(1), post(2)],
            comments: vec![comment(100, 1), comment(101, 1), comment(102, 2)],
            comment_reactions: vec![CommentReaction {
                profile: 10_u64.into(),
                comment: Id::<CommentMarker>::from(100_u64),
                polarity: Polarity::Like,
            }],
            ..FeedRows::default()
        };

        let views = assemble_feed(rows, Some(Id::<ProfileMarker>::from(10_u64)));

        assert_eq!(views[0].comments.len(), 2);
        assert_eq!(views[1].comments.len(), 1);
        assert_eq!(views[0].comments[0].likes, 1);
        assert!(views[0].comments[0].viewer_has_liked);
        assert_eq!(views[0].comments[1].likes, 0);
    }

    #[test]
    fn badges_resolve_through_the_link_table() {
        let badge = Badge {
            id: 7_u64.into(),
            name: "news".to_owned(),
            color: "#ff0000".to_owned(),
        };
        let rows = FeedRows {
            posts: vec![post(1)],
            badge_links: vec![
                BadgeLink {
                    post: 1_u64.into(),
                    badge: 7_u64.into(),
                },
                // dangling link, no matching badge row
                BadgeLink {
                    post: 1_u64.into(),
                    badge: 8_u64.into(),
                },
            ],
            badges: vec![badge.clone()],
            ..FeedRows::default()
        };

        let views = assemble_feed(rows, None);

        assert_eq!(views[0].badges, vec![badge]);
    }

    #[test]
    fn output_preserves_post_order() {
        let rows = FeedRows {
            posts: vec![post(3), post(1), post(2)],
            ..FeedRows::default()
        };

        let ids: Vec<Id<PostMarker>> = assemble_feed(rows, None)
            .into_iter()
            .map(|view| view.post.id)
            .collect();

        assert_eq!(ids, vec![3_u64.into(), 1_u64.into(), 2_u64.into()]);
    }

    #[test]
    fn net_score_orders_strictly() {
        let rows = FeedRows {
            posts: vec![post(1), post(2), post(3)],
            post_reactions: vec![
                // post 1: net 0 (1 like, 1 unlike)
                like(10, 1),
                unlike(11, 1),
                // post 2: net 2
                like(10, 2),
                like(11, 2),
                // post 3: net -1
                unlike(10, 3),
            ],
            ..FeedRows::default()
        };

        let mut views = assemble_feed(rows, None);
        sort_by_net_score(&mut views);

        let ids: Vec<Id<PostMarker>> = views.iter().map(|view| view.post.id).collect();
        assert_eq!(ids, vec![2_u64.into(), 1_u64.into(), 3_u64.into()]);

        for pair in views.windows(2) {
            assert!(pair[0].net_score() >= pair[1].net_score());
        }
    }
}
