//! Shape checks on request bodies, run before a handler sees them.

use std::ops::RangeInclusive;

use axum::extract::{FromRequest, Request};
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::de::DeserializeOwned;

use super::ApiError;
use crate::model::ImageData;

/// A request body that can check its own fields. The error is the message shown to the client.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// JSON body extractor that rejects malformed or invalid payloads with `400 Bad Request`.
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let WithRejection(Json(value), _) =
            WithRejection::<Json<T>, ApiError>::from_request(request, state).await?;

        value
            .validate()
            .map_err(|message| ApiError::InvalidInput { message })?;

        Ok(Valid(value))
    }
}

pub fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("\"{field}\" is not allowed to be empty"));
    }

    Ok(())
}

pub fn length(field: &str, value: &str, bounds: RangeInclusive<usize>) -> Result<(), String> {
    required(field, value)?;
    max_length(field, value, *bounds.end())?;

    if value.chars().count() < *bounds.start() {
        return Err(format!(
            "\"{field}\" length must be at least {} characters long",
            bounds.start()
        ));
    }

    Ok(())
}

/// Like [length] with no lower bound, so an empty value passes.
pub fn max_length(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!(
            "\"{field}\" length must be less than or equal to {max} characters long"
        ));
    }

    Ok(())
}

pub fn email(field: &str, value: &str) -> Result<(), String> {
    length(field, value, 5..=255)?;

    let valid = match value.split_once('@') {
        Some((user, domain)) => {
            !user.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid || value.chars().any(char::is_whitespace) {
        return Err(format!("\"{field}\" must be a valid email"));
    }

    Ok(())
}

impl Validate for ImageData {
    fn validate(&self) -> Result<(), String> {
        required("name", &self.name)?;
        required("url", &self.url)
    }
}
