use serde::{Deserialize, Deserializer, Serialize};
use surrealdb::sql::Thing;

use crate::database::macros::Table;
use crate::database::{Database, DatabaseQueryError, Sql};

pub mod comment;
pub mod friend;
pub mod image;
pub mod like;
pub mod message;
pub mod post;
pub mod timestamp;
pub mod user;

pub use comment::*;
pub use friend::*;
pub use image::*;
pub use like::*;
pub use message::*;
pub use post::*;
pub use timestamp::*;
pub use user::*;

/// Deserializes a SurrealDB record id into its plain key, so `posts:abc` is exposed as `"abc"`.
pub fn record_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let thing = Thing::deserialize(deserializer)?;
    Ok(thing.id.to_raw())
}

/// A named link to a picture, as attached to posts, images and profiles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageData {
    pub name: String,
    pub url: String,
}

/// The denormalized author of a post or a comment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Author {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

/// Fetches the record with the given key from `T`'s table.
pub async fn find<T>(key: &str, db: &Database) -> Result<Option<T>, DatabaseQueryError>
where
    T: Table + serde::de::DeserializeOwned,
{
    db.sql("SELECT * FROM type::thing($table, $key)")
        .bind(("table", T::table()))
        .bind(("key", key))
        .fetch_first()
        .await
}

/// Removes the record with the given key from `T`'s table and returns it as it was before the deletion.
pub async fn remove<T>(key: &str, db: &Database) -> Result<Option<T>, DatabaseQueryError>
where
    T: Table + serde::de::DeserializeOwned,
{
    db.sql("DELETE type::thing($table, $key) RETURN BEFORE")
        .bind(("table", T::table()))
        .bind(("key", key))
        .fetch_first()
        .await
}

/// Inserts `content` as a new record of `T`'s table and returns the stored record.
pub async fn insert<T, C>(content: &C, db: &Database) -> Result<T, DatabaseQueryError>
where
    T: Table + serde::de::DeserializeOwned,
    C: Serialize,
{
    db.sql("CREATE type::table($table) CONTENT $content RETURN AFTER")
        .bind(("table", T::table()))
        .bind(("content", content))
        .fetch_one()
        .await
}

/// Lists every record of `T`'s table, oldest first.
pub async fn list<T>(db: &Database) -> Result<Vec<T>, DatabaseQueryError>
where
    T: Table + serde::de::DeserializeOwned,
{
    db.sql("SELECT * FROM type::table($table) ORDER BY createdAt ASC")
        .bind(("table", T::table()))
        .fetch_first()
        .await
}
