use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod comments;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod follows;
pub mod likes;
pub mod pagination;
pub mod posts;
pub mod profiles;
pub mod response;

use config::settings::Settings;
use response::ApiResponse;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Settings,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> PgPool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

pub fn router(app_state: AppState) -> Router {
    let auth_router = Router::new()
        .route("/register", post(auth::handler::register))
        .route("/login", post(auth::handler::login))
        .route("/me", get(auth::handler::get_me));

    let profile_router = Router::new()
        .route("/", get(profiles::handler::list_profiles))
        .route(
            "/:id",
            get(profiles::handler::get_profile)
                .put(profiles::handler::update_profile)
                .delete(profiles::handler::delete_profile),
        )
        .route("/:id/followers", get(follows::handler::get_followers))
        .route("/:id/following", get(follows::handler::get_following));

    let follow_router = Router::new().route(
        "/:id",
        post(follows::handler::follow_profile).delete(follows::handler::unfollow_profile),
    );

    let follows_router = Router::new()
        .route("/", get(follows::handler::list_follows))
        .route(
            "/:id",
            get(follows::handler::get_follow).delete(follows::handler::delete_follow),
        );

    let post_router = Router::new()
        .route(
            "/",
            post(posts::handler::create_post).get(posts::handler::list_posts),
        )
        .route(
            "/:id",
            get(posts::handler::get_post)
                .put(posts::handler::update_post)
                .delete(posts::handler::delete_post),
        )
        .route(
            "/:id/like",
            post(likes::handler::like_post).delete(likes::handler::unlike_post),
        )
        .route("/:id/likes", get(likes::handler::get_post_likes))
        .route(
            "/:id/comments",
            get(comments::handler::get_post_comments).post(comments::handler::create_comment),
        );

    let comment_router = Router::new().route(
        "/:id",
        get(comments::handler::get_comment)
            .put(comments::handler::update_comment)
            .delete(comments::handler::delete_comment),
    );

    Router::new()
        .route("/health", get(|| async { ApiResponse::ok("ok") }))
        .nest("/api/auth", auth_router)
        .nest("/api/profiles", profile_router)
        .nest("/api/follow", follow_router)
        .nest("/api/follows", follows_router)
        .nest("/api/posts", post_router)
        .nest("/api/comments", comment_router)
        .route("/api/feed", get(posts::handler::get_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
