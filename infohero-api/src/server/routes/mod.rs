use crate::server::ServerRouter;
use axum::Router;

mod accounts;
mod badges;
mod comments;
mod posts;
mod profiles;
mod rankings;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(accounts::routes())
        .merge(badges::routes())
        .merge(comments::routes())
        .merge(posts::routes())
        .merge(profiles::routes())
        .merge(rankings::routes())
}
