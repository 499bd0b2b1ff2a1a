use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use infohero_common::model::{
    Id,
    auth::{AuthToken, NewSession, PositiveDuration, hash_password, verify_password},
    profile::{ProfileMarker, Username},
};
use infohero_db::client::{DbClient, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration;

const SESSION_LIFETIME: Duration = Duration::days(30);

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(register).typed_post(login)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CredentialsRequest {
    username: Username,
    password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct SessionResponse {
    profile_id: Id<ProfileMarker>,
    token: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    let password_hash = hash_password(&request.password)?;

    let profile_id = db
        .create_profile(&request.username, &password_hash)
        .await
        .map_err(|err| match err {
            DbError::UniqueViolation => ServerError::UsernameTaken,
            other => ServerError::Database(other),
        })?;

    issue_session(&db, profile_id).await
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    let (profile_id, stored_hash) = db
        .fetch_credentials(&request.username)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !verify_password(&request.password, &stored_hash)? {
        return Err(ServerError::InvalidCredentials);
    }

    issue_session(&db, profile_id).await
}

async fn issue_session(
    db: &DbClient,
    profile_id: Id<ProfileMarker>,
) -> Result<Json<SessionResponse>> {
    let token = AuthToken::generate_random(profile_id);
    let session = NewSession {
        profile: profile_id,
        token_hash: token.hash()?,
        expires_after: PositiveDuration::new(SESSION_LIFETIME),
    };

    db.insert_session(&session).await?;

    Ok(Json(SessionResponse {
        profile_id,
        token: token.as_token_str(),
    }))
}
