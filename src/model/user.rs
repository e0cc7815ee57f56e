use chrono::NaiveDate;
use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, ImageData, Timestamp};
use crate::database::{Database, DatabaseQueryError, Sql};
use crate::{define_query, table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Deactivated,
    Unverified,
}

/// A registered account. The password hash lives in the same record but is never deserialized into this type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub contact_number: String,
    pub address: String,
    #[serde(default)]
    pub address_two: String,
    pub state: String,
    pub city: String,
    pub zip: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub profile_picture: Option<ImageData>,
    pub created_at: Timestamp,
}

table!("users": User);

/// The content of a new `users` record, `password` already hashed.
#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub contact_number: String,
    pub address: String,
    pub address_two: String,
    pub state: String,
    pub city: String,
    pub zip: String,
    pub status: UserStatus,
    pub password: String,
    #[new(value = "false")]
    pub online: bool,
    #[new(default)]
    pub created_at: Timestamp,
}

define_query! {
    User > by_email(email: &str) > Option<User>
        where "SELECT * FROM users WHERE email = $email LIMIT 1"
}

define_query! {
    User > sign_in(email: &str, password: &str) > Option<User>
        where "SELECT * FROM users WHERE email = $email AND crypto::argon2::compare(password, $password) LIMIT 1"
}

define_query! {
    User > set_online(id: &str, online: bool) > Option<User>
        where "UPDATE users SET online = $online WHERE id = type::thing('users', $id) RETURN AFTER"
}

define_query! {
    User > set_profile_picture(id: &str, picture: &ImageData) > Option<User>
        where "UPDATE users SET profilePicture = $picture WHERE id = type::thing('users', $id) RETURN AFTER"
}

define_query! {
    User > search(name: &str) > Vec<User>
        where "SELECT * FROM users WHERE string::lowercase(fullName) CONTAINS string::lowercase($name) ORDER BY fullName ASC"
}

define_query! {
    User > all() > Vec<User>
        where "SELECT * FROM users ORDER BY createdAt ASC"
}

impl User {
    pub fn author(&self) -> super::Author {
        self.into()
    }

    /// Hashes `password` with argon2 inside the database, the same function [User::sign_in] verifies against.
    pub async fn hash_password(password: &str, db: &Database) -> Result<String, DatabaseQueryError> {
        db.sql("RETURN crypto::argon2::generate($password)")
            .bind(("password", password))
            .fetch_one()
            .await
    }
}
