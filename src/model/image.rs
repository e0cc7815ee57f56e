use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, ImageData, Timestamp};
use crate::table;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub image_data: Vec<ImageData>,
    #[serde(default)]
    pub post_id: Option<String>,
    pub user_id: String,
    pub created_at: Timestamp,
}

table!("images": Image);

#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewImage {
    pub image_data: Vec<ImageData>,
    pub post_id: Option<String>,
    pub user_id: String,
    #[new(default)]
    pub created_at: Timestamp,
}
