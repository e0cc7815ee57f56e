use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use super::validate::{required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::model::{self, FriendRequest, FriendStatus, NewFriendRequest, User};

#[derive(Debug, Deserialize)]
pub struct RequestBody {
    pub recipient: String,
}

impl Validate for RequestBody {
    fn validate(&self) -> Result<(), String> {
        required("recipient", &self.recipient)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: FriendStatus,
}

impl Validate for StatusBody {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Fetches a request the caller takes part in.
async fn involved(app: &App, id: &str, user: &AuthUser) -> Result<FriendRequest> {
    let request = model::find::<FriendRequest>(id, &app.database)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            entity: "friend request",
            id: id.to_string(),
        })?;

    if request.requester != user.id() && request.recipient != user.id() {
        return Err(ApiError::Forbidden {
            entity: "friend request",
            id: id.to_string(),
        });
    }

    Ok(request)
}

/// Requests the caller sent or received, rejected ones excluded.
#[instrument(skip(app))]
pub async fn list(State(app): State<App>, user: AuthUser) -> Result<Json<Vec<FriendRequest>>> {
    Ok(Json(FriendRequest::involving(user.id(), &app.database).await?))
}

/// Requests addressed to the caller, rejected ones excluded.
#[instrument(skip(app))]
pub async fn notifications(State(app): State<App>, user: AuthUser) -> Result<Json<Vec<FriendRequest>>> {
    Ok(Json(FriendRequest::addressed_to(user.id(), &app.database).await?))
}

#[instrument(skip(app))]
pub async fn send(State(app): State<App>, user: AuthUser, Valid(body): Valid<RequestBody>) -> Result<Json<FriendRequest>> {
    if body.recipient == user.id() {
        return Err(ApiError::InvalidInput {
            message: "You cannot send a friend request to yourself".to_string(),
        });
    }

    if model::find::<User>(&body.recipient, &app.database).await?.is_none() {
        return Err(ApiError::InvalidReference {
            entity: "user",
            id: body.recipient,
        });
    }

    if FriendRequest::between(user.id(), &body.recipient, &app.database)
        .await?
        .is_some()
    {
        return Err(ApiError::AlreadyRequested {
            recipient: body.recipient,
        });
    }

    let request = NewFriendRequest::new(user.id().to_string(), body.recipient, FriendStatus::Requested);
    let request: FriendRequest = model::insert(&request, &app.database).await?;

    Ok(Json(request))
}

/// Sets the status of a request to any of the three values.
#[instrument(skip(app))]
pub async fn set_status(
    State(app): State<App>,
    user: AuthUser,
    Path(id): Path<String>,
    Valid(body): Valid<StatusBody>,
) -> Result<Json<FriendRequest>> {
    involved(&app, &id, &user).await?;

    let request = FriendRequest::set_status(&id, body.status, &app.database)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            entity: "friend request",
            id: id.clone(),
        })?;

    Ok(Json(request))
}

#[instrument(skip(app))]
pub async fn remove(State(app): State<App>, user: AuthUser, Path(id): Path<String>) -> Result<Json<FriendRequest>> {
    let request = involved(&app, &id, &user).await?;
    model::remove::<FriendRequest>(&id, &app.database).await?;

    Ok(Json(request))
}
