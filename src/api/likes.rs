use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use super::validate::{required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::counter::CounterKind;
use crate::model::{self, Like, NewLike, Post};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeBody {
    pub post_id: String,
}

impl Validate for LikeBody {
    fn validate(&self) -> Result<(), String> {
        required("postId", &self.post_id)
    }
}

/// Likes a post. Liking it again returns the existing like and counts nothing.
#[instrument(skip(app))]
pub async fn create(State(app): State<App>, user: AuthUser, Valid(body): Valid<LikeBody>) -> Result<Json<Like>> {
    if model::find::<Post>(&body.post_id, &app.database).await?.is_none() {
        return Err(ApiError::InvalidReference {
            entity: "post",
            id: body.post_id,
        });
    }

    Ok(Json(like(&app, &body.post_id, user.id()).await?))
}

/// Stores the like of `user_id` on `post_id` unless the pair is already liked, in which case the existing like is
/// returned. Only a newly stored like is counted.
pub(super) async fn like(app: &App, post_id: &str, user_id: &str) -> Result<Like> {
    if let Some(like) = Like::find_pair(post_id, user_id, &app.database).await? {
        return Ok(like);
    }

    let new_like = NewLike::new(post_id.to_string(), user_id.to_string());

    match model::insert::<Like, _>(&new_like, &app.database).await {
        Ok(like) => {
            app.child_created(CounterKind::Likes, post_id).await;
            Ok(like)
        }
        // a concurrent request stored the same pair first
        Err(error) if error.is_duplicate() => Like::find_pair(post_id, user_id, &app.database)
            .await?
            .ok_or_else(|| ApiError::from(error)),
        Err(error) => Err(error.into()),
    }
}

#[instrument(skip(app))]
pub async fn list(State(app): State<App>, _user: AuthUser) -> Result<Json<Vec<Like>>> {
    Ok(Json(model::list::<Like>(&app.database).await?))
}

/// Takes back the caller's like of a post.
#[instrument(skip(app))]
pub async fn remove(State(app): State<App>, user: AuthUser, Path(post_id): Path<String>) -> Result<Json<Like>> {
    let removed = Like::remove_pair(&post_id, user.id(), &app.database).await?;

    for _ in &removed {
        app.child_deleted(CounterKind::Likes, &post_id).await;
    }

    removed
        .into_iter()
        .next()
        .map(Json)
        .ok_or(ApiError::InvalidReference {
            entity: "like",
            id: post_id,
        })
}
