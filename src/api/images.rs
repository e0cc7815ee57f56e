use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use super::validate::Valid;
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::model::{self, Image, ImageData, NewImage};

#[instrument(skip(app))]
pub async fn create(State(app): State<App>, user: AuthUser, Valid(data): Valid<ImageData>) -> Result<Json<Image>> {
    let image = NewImage::new(vec![data], None, user.id().to_string());
    Ok(Json(model::insert(&image, &app.database).await?))
}

#[instrument(skip(app))]
pub async fn list(State(app): State<App>, _user: AuthUser) -> Result<Json<Vec<Image>>> {
    Ok(Json(model::list::<Image>(&app.database).await?))
}

#[instrument(skip(app))]
pub async fn get(State(app): State<App>, _user: AuthUser, Path(id): Path<String>) -> Result<Json<Image>> {
    model::find::<Image>(&id, &app.database)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound { entity: "image", id })
}
