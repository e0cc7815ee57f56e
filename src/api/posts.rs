use axum::extract::{Path, State};
use axum::Json;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::state::Counts;
use super::likes;
use super::validate::{required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::counter::{CounterKind, Recount};
use crate::model::{self, now, Comment, ImageData, Like, NewImage, NewPost, Post, User};

/// A post together with its derived counts.
#[derive(Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(flatten)]
    pub counts: Counts,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    pub post: String,
    #[serde(default, alias = "imageData")]
    pub images: Vec<ImageData>,
}

impl Validate for PostBody {
    fn validate(&self) -> Result<(), String> {
        required("post", &self.post)?;
        self.images.iter().try_for_each(Validate::validate)
    }
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    #[serde(alias = "newPost")]
    pub post: String,
}

impl Validate for EditBody {
    fn validate(&self) -> Result<(), String> {
        required("post", &self.post)
    }
}

#[derive(Debug, Serialize)]
pub struct RecountReport {
    pub comments: Recount,
    pub likes: Recount,
}

async fn existing(app: &App, id: &str) -> Result<Post> {
    model::find::<Post>(id, &app.database)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            entity: "post",
            id: id.to_string(),
        })
}

async fn authored(app: &App, id: &str, user: &AuthUser) -> Result<Post> {
    let post = existing(app, id).await?;

    if !post.is_authored_by(user.id()) {
        return Err(ApiError::Forbidden {
            entity: "post",
            id: id.to_string(),
        });
    }

    Ok(post)
}

async fn view(app: &App, post: Post) -> Result<PostView> {
    let counts = app.counts(&post.id).await?;
    Ok(PostView { post, counts })
}

#[instrument(skip(app))]
pub async fn create(State(app): State<App>, user: AuthUser, Valid(body): Valid<PostBody>) -> Result<Json<PostView>> {
    let author = model::find::<User>(user.id(), &app.database)
        .await?
        .ok_or_else(|| ApiError::InvalidReference {
            entity: "user",
            id: user.id().to_string(),
        })?;

    let new_post = NewPost::new(body.post, author.author(), body.images.clone());
    let post: Post = model::insert(&new_post, &app.database).await?;

    if !body.images.is_empty() {
        let images = NewImage::new(body.images, Some(post.id.clone()), author.id);

        // the post is already stored, a missing gallery entry does not undo it
        if let Err(error) = model::insert::<model::Image, _>(&images, &app.database).await {
            tracing::warn!(post = %post.id, %error, "could not record the images of a new post");
        }
    }

    Ok(Json(PostView {
        post,
        counts: Counts::default(),
    }))
}

/// Every post, newest first, with its comment and like counts.
#[instrument(skip(app))]
pub async fn list(State(app): State<App>, _user: AuthUser) -> Result<Json<Vec<PostView>>> {
    let posts = Post::all(&app.database).await?;
    let views = try_join_all(posts.into_iter().map(|post| view(&app, post))).await?;

    Ok(Json(views))
}

#[instrument(skip(app))]
pub async fn edit(
    State(app): State<App>,
    user: AuthUser,
    Path(id): Path<String>,
    Valid(body): Valid<EditBody>,
) -> Result<Json<PostView>> {
    authored(&app, &id, &user).await?;

    let post = Post::edit(&id, &body.post, now(), &app.database)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            entity: "post",
            id: id.clone(),
        })?;

    Ok(Json(view(&app, post).await?))
}

/// Deletes the post with all of its comments and likes. The counters go with them.
#[instrument(skip(app))]
pub async fn remove(State(app): State<App>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Post>> {
    let post = authored(&app, &id, &user).await?;

    model::remove::<Post>(&id, &app.database).await?;
    let comments = Comment::remove_of_post(&id, &app.database).await?;
    let likes = Like::remove_of_post(&id, &app.database).await?;

    app.forget(CounterKind::Comments, &id).await;
    app.forget(CounterKind::Likes, &id).await;

    tracing::info!(post = %id, comments = comments.len(), likes = likes.len(), "deleted post");

    Ok(Json(post))
}

/// Likes the post, or takes the like back when the caller already liked it.
#[instrument(skip(app))]
pub async fn toggle_like(State(app): State<App>, user: AuthUser, Path(id): Path<String>) -> Result<Json<PostView>> {
    let post = existing(&app, &id).await?;

    match Like::find_pair(&id, user.id(), &app.database).await? {
        Some(_) => {
            let removed = Like::remove_pair(&id, user.id(), &app.database).await?;
            for _ in &removed {
                app.child_deleted(CounterKind::Likes, &id).await;
            }
        }
        None => {
            likes::like(&app, &id, user.id()).await?;
        }
    }

    Ok(Json(view(&app, post).await?))
}

#[instrument(skip(app))]
pub async fn counts(State(app): State<App>, _user: AuthUser, Path(id): Path<String>) -> Result<Json<Counts>> {
    existing(&app, &id).await?;

    Ok(Json(app.counts(&id).await?))
}

/// Recomputes both counters of a post from its comments and likes. Works for removed posts too, which clears
/// whatever counters they left behind.
#[instrument(skip(app))]
pub async fn recount(State(app): State<App>, _user: AuthUser, Path(id): Path<String>) -> Result<Json<RecountReport>> {
    let children = app.children();

    let (comments, likes) = tokio::try_join!(
        app.comments.recount(&id, &children),
        app.likes.recount(&id, &children)
    )?;

    Ok(Json(RecountReport { comments, likes }))
}
