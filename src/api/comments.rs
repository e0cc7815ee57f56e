use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use super::validate::{required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::counter::CounterKind;
use crate::model::{self, Comment, NewComment, Post, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    #[serde(alias = "post")]
    pub post_id: String,
    pub comment: String,
}

impl Validate for CommentBody {
    fn validate(&self) -> Result<(), String> {
        required("postId", &self.post_id)?;
        required("comment", &self.comment)
    }
}

#[instrument(skip(app))]
pub async fn create(State(app): State<App>, user: AuthUser, Valid(body): Valid<CommentBody>) -> Result<Json<Comment>> {
    let author = model::find::<User>(user.id(), &app.database)
        .await?
        .ok_or_else(|| ApiError::InvalidReference {
            entity: "user",
            id: user.id().to_string(),
        })?;

    if model::find::<Post>(&body.post_id, &app.database).await?.is_none() {
        return Err(ApiError::InvalidReference {
            entity: "post",
            id: body.post_id,
        });
    }

    let new_comment = NewComment::new(body.post_id, body.comment, author.author());
    let comment: Comment = model::insert(&new_comment, &app.database).await?;

    app.child_created(CounterKind::Comments, &comment.post_id).await;

    Ok(Json(comment))
}

/// Comments of a post, oldest first.
#[instrument(skip(app))]
pub async fn of_post(State(app): State<App>, _user: AuthUser, Path(id): Path<String>) -> Result<Json<Vec<Comment>>> {
    Ok(Json(Comment::of_post(&id, &app.database).await?))
}

#[instrument(skip(app))]
pub async fn remove(State(app): State<App>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Comment>> {
    let not_found = || ApiError::NotFound {
        entity: "comment",
        id: id.clone(),
    };

    let comment = model::find::<Comment>(&id, &app.database)
        .await?
        .ok_or_else(not_found)?;

    if comment.created_by.id != user.id() {
        return Err(ApiError::Forbidden {
            entity: "comment",
            id: id.clone(),
        });
    }

    // only the request that actually removed the record accounts for it
    let removed = model::remove::<Comment>(&id, &app.database)
        .await?
        .ok_or_else(not_found)?;

    app.child_deleted(CounterKind::Comments, &removed.post_id).await;

    Ok(Json(removed))
}
