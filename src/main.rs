use std::{process, sync::Arc};

use orgatlas::{
    application::{
        directory::DirectoryService,
        error::AppError,
        import, regenerate,
        repos::{OrganizationsRepo, OrganizationsWriteRepo},
        snapshots::SnapshotService,
    },
    cache::{CacheConfig, CachedQuery, TaggedStore},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};
use futures::FutureExt;
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Regenerate(_) => run_regenerate(settings).await,
        config::Command::Import(args) => run_import(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let store = cache_config
        .enabled
        .then(|| Arc::new(TaggedStore::new(&cache_config)));
    let cache = CachedQuery::new(store.clone());

    let organizations: Arc<dyn OrganizationsRepo> = repositories.clone();
    let http_state = HttpState {
        directory: DirectoryService::new(organizations, cache.clone()),
        snapshots: SnapshotService::new(settings.snapshots.directory.clone(), cache),
        health: repositories.clone(),
    };
    let admin_state = AdminState {
        store,
        token: settings.admin.token.clone().map(Arc::new),
    };

    if admin_state.token.is_none() {
        info!("no admin token configured; the invalidation endpoint will refuse all requests");
    }

    serve_http(&settings, http_state, admin_state).await
}

async fn run_regenerate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    info!(
        target = "orgatlas::regenerate",
        directory = %settings.snapshots.directory.display(),
        "Starting snapshot regeneration"
    );

    let report = regenerate::run(repositories.as_ref(), &settings.snapshots.directory)
        .await
        .map_err(regenerate_error)?;

    info!(
        target = "orgatlas::regenerate",
        organizations = report.organizations,
        tech_tags = report.tech_tags,
        topic_tags = report.topic_tags,
        files = report.files_written,
        "Regeneration completed"
    );
    Ok(())
}

async fn run_import(settings: config::Settings, args: config::ImportArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let writer: Arc<dyn OrganizationsWriteRepo> = repositories;

    info!(
        target = "orgatlas::import",
        path = %args.file.display(),
        "Starting archive import"
    );

    let report = import::run(
        writer,
        &args.file,
        settings.import.chunk_size,
        settings.import.concurrency,
    )
    .await
    .map_err(|err| AppError::unexpected(err.to_string()))?;

    info!(
        target = "orgatlas::import",
        imported = report.imported,
        "Import completed. Run regenerate to refresh snapshot files."
    );
    Ok(())
}

fn regenerate_error(err: regenerate::RegenerateError) -> AppError {
    match err {
        regenerate::RegenerateError::Repo(repo) => AppError::Repo(repo),
        other => AppError::unexpected(other.to_string()),
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(error = %error, "failed to install shutdown handler");
        }
    }
    .shared();

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown.clone());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown.clone());

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        shutdown.await;
        info!(grace_seconds = grace.as_secs(), "shutdown signal received, draining connections");
        tokio::time::sleep(grace).await;
    };

    let servers = async {
        try_join!(public_server, admin_server).map(|_| ())
    };
    race_drain(servers, deadline).await
}

/// Run `servers` until they finish draining, or until `deadline` fires with
/// connections still open. A forced abort is a failure: the process must not
/// exit zero after dropping in-flight requests.
async fn race_drain(
    servers: impl Future<Output = std::io::Result<()>>,
    deadline: impl Future<Output = ()>,
) -> Result<(), AppError> {
    tokio::select! {
        result = servers => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        () = deadline => {
            error!("connections still open after the graceful shutdown period, aborting");
            Err(AppError::unexpected(
                "graceful shutdown period elapsed with connections still open",
            ))
        }
    }
}
