use agora::api::{self, App};
use agora::config::Config;
use agora::counter::{Reconciler, SurrealStore};
use agora::database;
use agora::error::{ApplicationError, BindAddressSnafu, ConnectDatabaseSnafu, WebServerSnafu};
use agora::logger;
use dotenvy::dotenv;
use snafu::ResultExt;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let database = database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;

    let app = App::new(database.clone(), config.authenticator(), config.store_timeout());

    let sweeper = config.recount_interval().map(|period| {
        Reconciler::new(vec![app.comments.clone(), app.likes.clone()], SurrealStore::new(database)).spawn(period)
    });

    let listener = TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu { address: config.host })?;
    tracing::info!(address = %config.host, "listening");

    axum::serve(listener, api::create_router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(WebServerSnafu)?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    tracing::info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = ctrl_c().await {
            tracing::error!(%error, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }

        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(error) => {
                tracing::error!(%error, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
