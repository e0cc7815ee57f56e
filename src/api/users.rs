use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use super::validate::{email, length, max_length, required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::model::{self, ImageData, NewImage, NewUser, User, UserStatus};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub contact_number: String,
    pub password: String,
    pub address: String,
    #[serde(default)]
    pub address_two: String,
    pub state: String,
    pub city: String,
    pub zip: String,
    #[serde(default)]
    pub status: UserStatus,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), String> {
        email("email", &self.email)?;
        required("firstName", &self.first_name)?;
        required("lastName", &self.last_name)?;
        length("contactNumber", &self.contact_number, 10..=20)?;
        required("gender", &self.gender)?;
        length("password", &self.password, 5..=1000)?;
        length("address", &self.address, 3..=255)?;
        required("state", &self.state)?;
        max_length("state", &self.state, 255)?;
        max_length("addressTwo", &self.address_two, 10)?;
        length("city", &self.city, 3..=255)?;
        length("zip", &self.zip, 6..=255)
    }
}

#[instrument(skip(app))]
pub async fn register(State(app): State<App>, Valid(registration): Valid<Registration>) -> Result<Json<User>> {
    if User::by_email(&registration.email, &app.database).await?.is_some() {
        return Err(ApiError::UserExists {
            email: registration.email,
        });
    }

    let password = User::hash_password(&registration.password, &app.database).await?;
    let full_name = format!("{} {}", registration.first_name, registration.last_name);

    let new_user = NewUser::new(
        registration.email,
        registration.first_name,
        registration.last_name,
        full_name,
        registration.gender,
        registration.birth_date,
        registration.contact_number,
        registration.address,
        registration.address_two,
        registration.state,
        registration.city,
        registration.zip,
        registration.status,
        password,
    );

    let user: User = model::insert(&new_user, &app.database).await?;
    tracing::info!(user = %user.id, "registered");

    Ok(Json(user))
}

#[instrument(skip(app))]
pub async fn me(State(app): State<App>, user: AuthUser) -> Result<Json<User>> {
    let found = model::find::<User>(user.id(), &app.database).await?;

    found.map(Json).ok_or_else(|| ApiError::NotFound {
        entity: "user",
        id: user.id().to_string(),
    })
}

#[instrument(skip(app))]
pub async fn list(State(app): State<App>, _user: AuthUser) -> Result<Json<Vec<User>>> {
    Ok(Json(User::all(&app.database).await?))
}

/// Case-insensitive match anywhere in the full name.
#[instrument(skip(app))]
pub async fn search(State(app): State<App>, _user: AuthUser, Path(name): Path<String>) -> Result<Json<Vec<User>>> {
    Ok(Json(User::search(&name, &app.database).await?))
}

/// Sets the caller's profile picture and keeps a copy in the image collection.
#[instrument(skip(app))]
pub async fn set_profile_picture(
    State(app): State<App>,
    user: AuthUser,
    Path(id): Path<String>,
    Valid(picture): Valid<ImageData>,
) -> Result<Json<User>> {
    if id != user.id() {
        return Err(ApiError::Forbidden { entity: "user", id });
    }

    let updated = User::set_profile_picture(&id, &picture, &app.database)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            entity: "user",
            id: id.clone(),
        })?;

    let image = NewImage::new(vec![picture], None, updated.id.clone());
    let _: model::Image = model::insert(&image, &app.database).await?;

    Ok(Json(updated))
}
