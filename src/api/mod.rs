use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TOKEN_HEADER;

mod comments;
mod error;
mod friends;
mod images;
mod likes;
mod messages;
mod posts;
mod session;
mod state;
mod users;

pub mod validate;

pub use error::*;
pub use posts::{PostView, RecountReport};
pub use state::{App, Counts};

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Every route lives under `/api`. Apart from login and registration they all need a token.
pub fn create_router(app: App) -> Router {
    let api = Router::new()
        .route("/auth", post(session::login))
        .route("/auth/logout", post(session::logout))
        .route("/users", get(users::list))
        .route("/users/register", post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/search/:name", get(users::search))
        .route("/users/:id/profile-picture", patch(users::set_profile_picture))
        .route("/posts", get(posts::list).post(posts::create))
        .route("/posts/:id", patch(posts::edit).delete(posts::remove))
        .route("/posts/:id/like", post(posts::toggle_like))
        .route("/posts/:id/counts", get(posts::counts))
        .route("/posts/:id/recount", post(posts::recount))
        .route("/comments", post(comments::create))
        .route("/comments/post/:id", get(comments::of_post))
        .route("/comments/:id", axum::routing::delete(comments::remove))
        .route("/likes", get(likes::list).post(likes::create))
        .route("/likes/:post_id", axum::routing::delete(likes::remove))
        .route("/friends", get(friends::list).post(friends::send))
        .route("/friends/notifications", get(friends::notifications))
        .route("/friends/:id", patch(friends::set_status).delete(friends::remove))
        .route("/images", get(images::list).post(images::create))
        .route("/images/:id", get(images::get))
        .route("/messages", post(messages::send))
        .route("/messages/:user_id", get(messages::conversation));

    Router::new().nest("/api", api).with_state(app).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors())
            .layer(CompressionLayer::new()),
    )
}

/// Any origin may call the API and read the token header of the login response.
fn cors() -> CorsLayer {
    let token = HeaderName::from_static(TOKEN_HEADER);

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, token.clone()])
        .expose_headers([token])
        .max_age(Duration::from_secs(60 * 60))
}
