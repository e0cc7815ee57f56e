use serde::Deserialize;
use snafu::{Location, ResultExt, Snafu};
use surrealdb::engine::any::Any;
use surrealdb::error::Db;
use surrealdb::opt::auth;
use surrealdb::Surreal;
use url::Url;

/// Helper trait for executing arbitrary SurrealQL queries.
pub mod query;

/// Macros for defining table methods.
pub mod macros;

pub use query::{Bindings, Sql};

pub type Database = Surreal<Any>;

const SETUP: &str = include_str!("../../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    Connect {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot sign in to the database `{url}` at {location}: {source}"))]
    SignIn {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot select namespace `{namespace}` and database `{database}`: {source}"))]
    UseNamespace {
        namespace: String,
        database: String,
        source: surrealdb::Error,
    },

    #[snafu(display("failed to apply the database schema at {location}: {source}"))]
    Setup {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseQueryError {
    #[snafu(display("failed to execute query at {location}: {source}"))]
    MalformedQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    Deserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("expected exactly one result at {location}, but got none"))]
    NoResults {
        #[snafu(implicit)]
        location: Location,
    },
}

/// Whether SurrealDB refused a write because the record id or a unique index entry is already taken.
pub fn is_duplicate(error: &surrealdb::Error) -> bool {
    match error {
        surrealdb::Error::Db(Db::RecordExists { .. } | Db::IndexExists { .. }) => true,
        // remote engines only hand back the message
        other => {
            let message = other.to_string();
            message.contains("already exists") || message.contains("already contains")
        }
    }
}

impl DatabaseQueryError {
    /// See [is_duplicate].
    pub fn is_duplicate(&self) -> bool {
        match self {
            DatabaseQueryError::MalformedQuery { source, .. } | DatabaseQueryError::Deserialize { source, .. } => {
                is_duplicate(source)
            }
            DatabaseQueryError::NoResults { .. } => false,
        }
    }
}

/// Connects to the configured database, signs in when credentials are present and applies `schema.surrealql`.
#[tracing::instrument(skip(config), fields(url = %config.url))]
pub async fn connect(config: &DatabaseConfig) -> Result<Database, DatabaseError> {
    let database = surrealdb::engine::any::connect(config.url.as_str())
        .await
        .context(ConnectSnafu {
            url: config.url.clone(),
        })?;

    if let Some(credentials) = &config.credentials {
        database
            .signin(credentials.auth(&config.namespace, &config.database))
            .await
            .context(SignInSnafu {
                url: config.url.clone(),
            })?;
    }

    database
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .context(UseNamespaceSnafu {
            namespace: config.namespace.clone(),
            database: config.database.clone(),
        })?;

    database
        .query(SETUP)
        .await
        .and_then(|response| response.check())
        .context(SetupSnafu)?;

    tracing::info!(namespace = %config.namespace, database = %config.database, "connected to database");

    Ok(database)
}

/// An in-memory database with the schema applied, handy for tests and local runs.
pub async fn memory() -> Result<Database, DatabaseError> {
    let config = DatabaseConfig {
        url: default_url(),
        namespace: default_name(),
        database: default_name(),
        credentials: None,
    };

    connect(&config).await
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url", default = "default_url")]
    pub url: Url,
    #[serde(rename = "surreal_ns", default = "default_name")]
    pub namespace: String,
    #[serde(rename = "surreal_db", default = "default_name")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_user")]
    username: String,
    #[serde(rename = "surreal_pass")]
    password: String,
}

impl DatabaseCredentials {
    fn auth<'a>(
        &'a self,
        namespace: &'a str,
        database: &'a str,
    ) -> impl auth::Credentials<auth::Signin, auth::Jwt> + 'a {
        auth::Database {
            namespace,
            database,
            username: &self.username,
            password: &self.password,
        }
    }
}

fn default_url() -> Url {
    Url::parse("mem://").expect("static url is valid")
}

fn default_name() -> String {
    "agora".to_string()
}
