use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use infohero_common::model::{Id, auth::AuthToken, profile::ProfileMarker};
use infohero_db::client::DbClient;
use std::sync::Arc;
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The session owner, resolved from the bearer token. Extracting this is
/// the only way a handler gets hold of a caller identity.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<ProfileMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn profile_id(self) -> Id<ProfileMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken =
            <AuthorizationHeader as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let session = Arc::<DbClient>::from_ref(state)
            .fetch_session(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if session.profile != request_token.profile_id
            || session.is_expired_at(UtcDateTime::now())
        {
            return Err(ServerError::InvalidToken);
        }

        Ok(Self {
            id: session.profile,
        })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <Self as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            // No header at all means an anonymous caller; a present but
            // broken header is still rejected.
            Err(ServerError::InvalidAuthorizationHeader(rejection))
                if rejection.is_missing() =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
