use derive_new::new;
use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt};
use surrealdb::opt::QueryResult;

use super::{Database, DatabaseQueryError, DeserializeSnafu, MalformedQuerySnafu, NoResultsSnafu};

/// An extension trait that allows you to execute raw SQL queries. Parameters can be bound using the [Bindings::bind] method which takes any serializable data structure.
///
/// # Example
/// ```ignore
/// let posts_by_ada: Vec<Post> = database.sql("SELECT * FROM posts WHERE postedBy.id = $user")
///     .bind(("user", "ada"))
///     .fetch_first()
///     .await?;
/// ```
pub trait Sql {
    fn sql(&self, query: &str) -> Bindings<'_>;
}

impl Sql for Database {
    fn sql(&self, query: &str) -> Bindings<'_> {
        Bindings::new(self.query(query))
    }
}

#[derive(Debug, new)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, surrealdb::engine::any::Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return a [surrealdb::Response] which is SurrealDB's way to represent a list of statements returned from the database.
    pub async fn execute(self) -> Result<surrealdb::Response, DatabaseQueryError> {
        let response = self.query.await.context(MalformedQuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T, DatabaseQueryError>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DeserializeSnafu)?;
        Ok(result)
    }

    /// Same as [Bindings::fetch_first] but fails with [DatabaseQueryError::NoResults] when the statement returned nothing.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, DatabaseQueryError> {
        self.fetch_first::<Option<T>>()
            .await?
            .context(NoResultsSnafu)
    }
}
