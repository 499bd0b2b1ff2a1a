use crate::record::{
    BadgeLinkRecord, BadgeRecord, CommentReactionRecord, CommentRecord, CredentialsRecord,
    HeroRecord, PostReactionRecord, PostRecord, ProfileRecord, ReactionCountsRecord, SessionRecord,
};
use infohero_common::model::{
    Id, InfoHeroSnowflake, InfoHeroSnowflakeGenerator, ModelValidationError,
    auth::{AuthTokenHash, NewSession, Session},
    badge::{Badge, BadgeLink, BadgeMarker, BadgeSelection},
    comment::{Comment, CommentMarker},
    post::{NewPost, Post, PostMarker},
    profile::{Hero, Profile, ProfileMarker, Username},
    reaction::{CommentReaction, Polarity, PostReaction, ReactionCounts},
};
use infohero_common::snowflake::{ProcessId, WorkerId};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use std::{
    str::FromStr,
    sync::{Mutex, PoisonError},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A uniqueness constraint was violated")]
    UniqueViolation,
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const SELECT_POSTS: &str = "
    SELECT
        posts.post_snowflake,
        posts.title,
        posts.content,
        posts.image_url,
        posts.source,
        posts.hashtags,
        posts.fake_detection,
        posts.created_at,
        profiles.profile_snowflake AS author_snowflake,
        profiles.username,
        profiles.avatar_url
    FROM
        posts JOIN profiles ON profiles.profile_snowflake = posts.author_snowflake
";

const SELECT_COMMENTS: &str = "
    SELECT
        comments.comment_snowflake,
        comments.post_snowflake,
        comments.content,
        comments.created_at,
        profiles.profile_snowflake AS author_snowflake,
        profiles.username,
        profiles.avatar_url
    FROM
        comments JOIN profiles ON profiles.profile_snowflake = comments.author_snowflake
";

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<InfoHeroSnowflakeGenerator>,
}

fn db_id<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

fn db_ids<Marker: Copy>(ids: &[Id<Marker>]) -> Vec<i64> {
    ids.iter().copied().map(db_id).collect()
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(InfoHeroSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Connects to the database and brings the schema up to date.
    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        sqlx::migrate!().run(&pool).await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    fn generate_snowflake(&self) -> InfoHeroSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    // ---- profiles & sessions ----

    pub async fn create_profile(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Id<ProfileMarker>> {
        let profile_snowflake = self.generate_snowflake();

        let returned: i64 = query_scalar(
            "
            INSERT INTO profiles (profile_snowflake, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING profile_snowflake
            ",
        )
        .bind(profile_snowflake.get().cast_signed())
        .bind(username.get())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation)?;

        Ok(returned.cast_unsigned().into())
    }

    pub async fn fetch_profile(&self, profile_id: Id<ProfileMarker>) -> Result<Option<Profile>> {
        let record = query_as::<_, ProfileRecord>(
            "
            SELECT
                profiles.profile_snowflake,
                profiles.username,
                profiles.avatar_url,
                profiles.created_at
            FROM
                profiles
            WHERE
                profiles.profile_snowflake = $1
            ",
        )
        .bind(db_id(profile_id))
        .fetch_optional(&self.pool)
        .await?;

        let profile = record.map(Profile::try_from).transpose()?;
        Ok(profile)
    }

    pub async fn profile_exists(&self, profile_id: Id<ProfileMarker>) -> Result<bool> {
        let exists: bool =
            query_scalar("SELECT EXISTS (SELECT 1 FROM profiles WHERE profile_snowflake = $1)")
                .bind(db_id(profile_id))
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// The stored password hash for a username, for login verification.
    pub async fn fetch_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(Id<ProfileMarker>, String)>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                profiles.profile_snowflake,
                profiles.password_hash
            FROM
                profiles
            WHERE
                profiles.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|record| {
            (
                record.profile_snowflake.cast_unsigned().into(),
                record.password_hash,
            )
        }))
    }

    pub async fn insert_session(&self, session: &NewSession) -> Result<()> {
        query(
            "
            INSERT INTO auth_sessions (token_hash, profile_snowflake, expires_after_seconds)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&session.token_hash.0[..])
        .bind(db_id(session.profile))
        .bind(
            session
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_session(&self, token_hash: &AuthTokenHash) -> Result<Option<Session>> {
        let record = query_as::<_, SessionRecord>(
            "
            SELECT
                auth_sessions.profile_snowflake,
                auth_sessions.token_hash,
                auth_sessions.created_at,
                auth_sessions.expires_after_seconds
            FROM
                auth_sessions
            WHERE
                auth_sessions.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(Session::try_from).transpose()?;
        Ok(session)
    }

    // ---- posts ----

    pub async fn create_post(&self, post: &NewPost) -> Result<Id<PostMarker>> {
        let post_snowflake = self.generate_snowflake();

        let returned: i64 = query_scalar(
            "
            INSERT INTO posts
                (post_snowflake, author_snowflake, title, content, image_url, source,
                 hashtags, fake_detection)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING post_snowflake
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(db_id(post.author))
        .bind(post.title.get())
        .bind(&post.content)
        .bind(post.image_url.as_deref())
        .bind(post.source.as_deref())
        .bind(&post.hashtags)
        .bind(post.fake_detection)
        .fetch_one(&self.pool)
        .await?;

        Ok(returned.cast_unsigned().into())
    }

    /// Compensating deletion for a post whose badge associations could not
    /// be written.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        query("DELETE FROM posts WHERE post_snowflake = $1")
            .bind(db_id(post_id))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_post_badges(
        &self,
        post_id: Id<PostMarker>,
        badges: &BadgeSelection,
    ) -> Result<()> {
        query(
            "
            INSERT INTO post_badges (post_snowflake, badge_snowflake)
            SELECT $1, unnested FROM UNNEST($2::BIGINT[]) AS unnested
            ",
        )
        .bind(db_id(post_id))
        .bind(db_ids(badges.get()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn post_exists(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let exists: bool =
            query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE post_snowflake = $1)")
                .bind(db_id(post_id))
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{SELECT_POSTS} WHERE posts.post_snowflake = $1");
        let record = query_as::<_, PostRecord>(&sql)
            .bind(db_id(post_id))
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn fetch_posts_newest_first(&self) -> Result<Vec<Post>> {
        let sql = format!("{SELECT_POSTS} ORDER BY posts.created_at DESC");
        let records = query_as::<_, PostRecord>(&sql).fetch_all(&self.pool).await?;

        collect_records(records)
    }

    pub async fn fetch_posts_by_author(
        &self,
        author_id: Id<ProfileMarker>,
    ) -> Result<Vec<Post>> {
        let sql = format!(
            "{SELECT_POSTS} WHERE posts.author_snowflake = $1 ORDER BY posts.created_at DESC"
        );
        let records = query_as::<_, PostRecord>(&sql)
            .bind(db_id(author_id))
            .fetch_all(&self.pool)
            .await?;

        collect_records(records)
    }

    pub async fn fetch_posts_with_badge(&self, badge_id: Id<BadgeMarker>) -> Result<Vec<Post>> {
        let sql = format!(
            "
            {SELECT_POSTS}
            JOIN post_badges ON post_badges.post_snowflake = posts.post_snowflake
            WHERE post_badges.badge_snowflake = $1
            ORDER BY posts.created_at DESC
            "
        );
        let records = query_as::<_, PostRecord>(&sql)
            .bind(db_id(badge_id))
            .fetch_all(&self.pool)
            .await?;

        collect_records(records)
    }

    /// Server-side top-posts aggregate, ordered by net like score.
    pub async fn fetch_top_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "
            {SELECT_POSTS}
            LEFT JOIN post_reactions ON post_reactions.post_snowflake = posts.post_snowflake
            GROUP BY posts.post_snowflake, profiles.profile_snowflake
            ORDER BY
                COUNT(*) FILTER (WHERE post_reactions.polarity = 'like')
                    - COUNT(*) FILTER (WHERE post_reactions.polarity = 'unlike') DESC
            LIMIT $1
            "
        );
        let records = query_as::<_, PostRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        collect_records(records)
    }

    /// Server-side top-profiles aggregate, ordered by total likes received.
    pub async fn fetch_top_heroes(&self, limit: i64) -> Result<Vec<Hero>> {
        let records = query_as::<_, HeroRecord>(
            "
            SELECT
                profiles.profile_snowflake,
                profiles.username,
                profiles.avatar_url,
                COUNT(post_reactions.profile_snowflake) AS likes
            FROM
                profiles
                LEFT JOIN posts ON posts.author_snowflake = profiles.profile_snowflake
                LEFT JOIN post_reactions ON post_reactions.post_snowflake = posts.post_snowflake
                    AND post_reactions.polarity = 'like'
            GROUP BY profiles.profile_snowflake
            ORDER BY likes DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }

    // ---- comments ----

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author_id: Id<ProfileMarker>,
        content: &str,
    ) -> Result<Id<CommentMarker>> {
        let comment_snowflake = self.generate_snowflake();

        let returned: i64 = query_scalar(
            "
            INSERT INTO comments (comment_snowflake, post_snowflake, author_snowflake, content)
            VALUES ($1, $2, $3, $4)
            RETURNING comment_snowflake
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(db_id(post_id))
        .bind(db_id(author_id))
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(returned.cast_unsigned().into())
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let sql = format!("{SELECT_COMMENTS} WHERE comments.comment_snowflake = $1");
        let record = query_as::<_, CommentRecord>(&sql)
            .bind(db_id(comment_id))
            .fetch_optional(&self.pool)
            .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn fetch_comments_for_posts(
        &self,
        post_ids: &[Id<PostMarker>],
    ) -> Result<Vec<Comment>> {
        let sql = format!(
            "{SELECT_COMMENTS} WHERE comments.post_snowflake = ANY($1) ORDER BY comments.created_at"
        );
        let records = query_as::<_, CommentRecord>(&sql)
            .bind(db_ids(post_ids))
            .fetch_all(&self.pool)
            .await?;

        collect_records(records)
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<()> {
        query("DELETE FROM comments WHERE comment_snowflake = $1")
            .bind(db_id(comment_id))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn comment_exists(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let exists: bool =
            query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE comment_snowflake = $1)")
                .bind(db_id(comment_id))
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    // ---- reactions ----

    pub async fn fetch_post_reactions(
        &self,
        post_ids: &[Id<PostMarker>],
    ) -> Result<Vec<PostReaction>> {
        let records = query_as::<_, PostReactionRecord>(
            "
            SELECT
                post_reactions.profile_snowflake,
                post_reactions.post_snowflake,
                post_reactions.polarity
            FROM
                post_reactions
            WHERE
                post_reactions.post_snowflake = ANY($1)
            ",
        )
        .bind(db_ids(post_ids))
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }

    pub async fn fetch_comment_reactions(
        &self,
        comment_ids: &[Id<CommentMarker>],
    ) -> Result<Vec<CommentReaction>> {
        let records = query_as::<_, CommentReactionRecord>(
            "
            SELECT
                comment_reactions.profile_snowflake,
                comment_reactions.comment_snowflake,
                comment_reactions.polarity
            FROM
                comment_reactions
            WHERE
                comment_reactions.comment_snowflake = ANY($1)
            ",
        )
        .bind(db_ids(comment_ids))
        .fetch_all(&self.pool)
        .await?;

        collect_records(records)
    }

    /// Toggles one polarity for (user, post). Returns whether the reaction
    /// is active after the toggle. An existing opposite-polarity row is
    /// replaced rather than kept alongside.
    pub async fn toggle_post_reaction(
        &self,
        profile_id: Id<ProfileMarker>,
        post_id: Id<PostMarker>,
        polarity: Polarity,
    ) -> Result<bool> {
        let existing: Option<String> = query_scalar(
            "
            SELECT polarity FROM post_reactions
            WHERE profile_snowflake = $1 AND post_snowflake = $2
            ",
        )
        .bind(db_id(profile_id))
        .bind(db_id(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let existing = existing
            .as_deref()
            .map(Polarity::from_str)
            .transpose()
            .map_err(ModelValidationError::from)?;

        match existing {
            Some(current) if current == polarity => {
                query(
                    "
                    DELETE FROM post_reactions
                    WHERE profile_snowflake = $1 AND post_snowflake = $2
                    ",
                )
                .bind(db_id(profile_id))
                .bind(db_id(post_id))
                .execute(&self.pool)
                .await?;

                Ok(false)
            }
            Some(_) => {
                query(
                    "
                    UPDATE post_reactions SET polarity = $3
                    WHERE profile_snowflake = $1 AND post_snowflake = $2
                    ",
                )
                .bind(db_id(profile_id))
                .bind(db_id(post_id))
                .bind(polarity.as_str())
                .execute(&self.pool)
                .await?;

                Ok(true)
            }
            None => {
                query(
                    "
                    INSERT INTO post_reactions (profile_snowflake, post_snowflake, polarity)
                    VALUES ($1, $2, $3)
                    ",
                )
                .bind(db_id(profile_id))
                .bind(db_id(post_id))
                .bind(polarity.as_str())
                .execute(&self.pool)
                .await?;

                Ok(true)
            }
        }
    }

    pub async fn toggle_comment_reaction(
        &self,
        profile_id: Id<ProfileMarker>,
        comment_id: Id<CommentMarker>,
        polarity: Polarity,
    ) -> Result<bool> {
        let existing: Option<String> = query_scalar(
            "
            SELECT polarity FROM comment_reactions
            WHERE profile_snowflake = $1 AND comment_snowflake = $2
            ",
        )
        .bind(db_id(profile_id))
        .bind(db_id(comment_id))
        .fetch_optional(&self.pool)
        .await?;

        let existing = existing
            .as_deref()
            .map(Polarity::from_str)
            .transpose()
            .map_err(ModelValidationError::from)?;

        match existing {
            Some(current) if current == polarity => {
                query(
                    "
                    DELETE FROM comment_reactions
                    WHERE profile_snowflake = $1 AND comment_snowflake = $2
                    ",
                )
                .bind(db_id(profile_id))
                .bind(db_id(comment_id))
                .execute(&self.pool)
                .await?;

                Ok(false)
            }
            Some(_) => {
                query(
                    "
                    UPDATE comment_reactions SET polarity = $3
                    WHERE profile_snowflake = $1 AND comment_snowflake = $2
                    ",
                )
                .bind(db_id(profile_id))
                .bind(db_id(comment_id))
                .bind(polarity.as_str())
                .execute(&self.pool)
                .await?;

                Ok(true)
            }
            None => {
                query(
                    "
                    INSERT INTO comment_reactions (profile_snowflake, comment_snowflake, polarity)
                    VALUES ($1, $2, $3)
                    ",
                )
                .bind(db_id(profile_id))
                .bind(db_id(comment_id))
                .bind(polarity.as_str())
                .execute(&self.pool)
                .await?;

                Ok(true)
            }
        }
    }

    pub async fn count_post_reactions(&self, post_id: Id<PostMarker>) -> Result<ReactionCounts> {
        let record = query_as::<_, ReactionCountsRecord>(
            "
            SELECT
                COUNT(*) FILTER (WHERE polarity = 'like') AS likes,
                COUNT(*) FILTER (WHERE polarity = 'unlike') AS unlikes
            FROM post_reactions
            WHERE post_snowflake = $1
            ",
        )
        .bind(db_id(post_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    pub async fn count_comment_reactions(
        &self,
        comment_id: Id<CommentMarker>,
    ) -> Result<ReactionCounts> {
        let record = query_as::<_, ReactionCountsRecord>(
            "
            SELECT
                COUNT(*) FILTER (WHERE polarity = 'like') AS likes,
                COUNT(*) FILTER (WHERE polarity = 'unlike') AS unlikes
            FROM comment_reactions
            WHERE comment_snowflake = $1
            ",
        )
        .bind(db_id(comment_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    // ---- badges ----

    pub async fn fetch_badges(&self) -> Result<Vec<Badge>> {
        let records = query_as::<_, BadgeRecord>(
            "SELECT badge_snowflake, name, color FROM badges ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Badge::from).collect())
    }

    pub async fn fetch_badge_by_name(&self, name: &str) -> Result<Option<Badge>> {
        let record = query_as::<_, BadgeRecord>(
            "SELECT badge_snowflake, name, color FROM badges WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Badge::from))
    }

    pub async fn fetch_badge_links(
        &self,
        post_ids: &[Id<PostMarker>],
    ) -> Result<Vec<BadgeLink>> {
        let records = query_as::<_, BadgeLinkRecord>(
            "
            SELECT post_snowflake, badge_snowflake
            FROM post_badges
            WHERE post_snowflake = ANY($1)
            ",
        )
        .bind(db_ids(post_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(BadgeLink::from).collect())
    }

    pub async fn fetch_badges_by_ids(&self, badge_ids: &[Id<BadgeMarker>]) -> Result<Vec<Badge>> {
        let records = query_as::<_, BadgeRecord>(
            "SELECT badge_snowflake, name, color FROM badges WHERE badge_snowflake = ANY($1)",
        )
        .bind(db_ids(badge_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Badge::from).collect())
    }
}

fn collect_records<Record, Model>(records: Vec<Record>) -> Result<Vec<Model>>
where
    Model: TryFrom<Record, Error = ModelValidationError>,
{
    records
        .into_iter()
        .map(|record| Model::try_from(record).map_err(DbError::from))
        .collect()
}

fn unique_violation(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::UniqueViolation,
        _ => DbError::Sqlx(err),
    }
}
