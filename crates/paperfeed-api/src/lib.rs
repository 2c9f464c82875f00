pub mod access;
pub mod auth;
pub mod comments;
pub mod error;
pub mod feeds;
pub mod middleware;
pub mod shares;
pub mod topics;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AppState;

/// Full application router: anonymous auth + public-share routes, and
/// everything else behind the bearer-token middleware. The server
/// binary and the integration tests both serve exactly this.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/share/public/{token}", get(shares::get_shared_feed))
        .route(
            "/share/public/{token}/comments",
            get(shares::list_invited_comments).post(shares::post_invited_comment),
        )
        .with_state(state.clone());

    let protected = Router::new()
        .route("/auth/user/me", get(auth::me))
        .route("/users", get(users::list_users))
        .route("/users/profile", put(users::update_profile))
        .route("/users/{user_id}", get(users::get_user))
        .route("/topics", get(topics::list_topics).post(topics::create_topic))
        .route("/topics/{topic_id}", get(topics::get_topic))
        .route("/feeds", get(feeds::list_feeds).post(feeds::create_feed))
        .route("/feeds/search", get(feeds::search_feeds))
        .route(
            "/feeds/{feed_id}",
            get(feeds::get_feed)
                .put(feeds::update_feed)
                .delete(feeds::delete_feed),
        )
        .route("/feeds/{feed_id}/download", get(feeds::download_feed))
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/{comment_id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/share/public", post(shares::create_public_share))
        .route("/share/public/id/{share_id}", delete(shares::revoke_public_share))
        .route(
            "/share/user",
            get(shares::shared_with_me).post(shares::share_with_user),
        )
        .route("/share/user/{share_id}", delete(shares::revoke_user_share))
        .route("/share/user/feed/{feed_id}", get(shares::list_feed_shares))
        // Room for the PDF itself plus multipart framing.
        .layer(DefaultBodyLimit::max(52 * 1024 * 1024))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
