use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, Author, ImageData, Timestamp};
use crate::{define_query, table};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub post: String,
    pub posted_by: Author,
    #[serde(default)]
    pub images: Vec<ImageData>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

table!("posts": Post);

#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub post: String,
    pub posted_by: Author,
    pub images: Vec<ImageData>,
    #[new(default)]
    pub created_at: Timestamp,
    #[new(default)]
    pub updated_at: Timestamp,
}

define_query! {
    Post > all() > Vec<Post>
        where "SELECT * FROM posts ORDER BY createdAt DESC"
}

define_query! {
    Post > edit(id: &str, text: &str, updated_at: Timestamp) > Option<Post>
        where "UPDATE posts SET post = $text, updatedAt = $updated_at WHERE id = type::thing('posts', $id) RETURN AFTER"
}

impl Post {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.posted_by.id == user_id
    }
}
