use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use infohero_common::model::{
    Id,
    auth::{AuthTokenDecodeError, AuthTokenHashError, PasswordHashingError},
    comment::CommentMarker,
    post::PostMarker,
    profile::ProfileMarker,
};
use infohero_db::client::{DbClient, DbError};
use json::Json;
use moderation::ModerationClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod auth;
mod feed;
mod json;
pub mod moderation;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub moderation: Arc<ModerationClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    PasswordHashing(#[from] PasswordHashingError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("The username is already taken")]
    UsernameTaken,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("The draft was rejected by the moderation gate")]
    ModerationBlocked,
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("Profile with id {0} was not found.")]
    ProfileByIdNotFound(Id<ProfileMarker>),
    #[error("No badge is named {0:?}.")]
    BadgeByNameNotFound(String),
    #[error("Only the author may delete a comment")]
    NotCommentAuthor,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::ProfileByIdNotFound(_)
            | ServerError::BadgeByNameNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::NotCommentAuthor => StatusCode::FORBIDDEN,
            ServerError::UsernameTaken => StatusCode::CONFLICT,
            ServerError::ModerationBlocked => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::PasswordHashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
