use std::{process, sync::Arc, time::Duration};

use roster::{
    application::{
        cache::CacheStore,
        clients::ClientService,
        error::AppError,
        events::EventPublisher,
        repos::{ClientsRepo, ClientsWriteRepo},
    },
    config,
    infra::{
        cache::{DisabledCache, LruTtlCache},
        db::PostgresRepositories,
        error::InfraError,
        events::{
            ClientEventsConsumer, InProcessEventBus, PgNotifyPublisher, run_bus_listener,
            run_pg_listener,
        },
        http::{self, ApiState},
        memory::InMemoryClientsRepo,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Consume(_) => run_consume(settings).await,
    }
}

/// Store and publisher wiring selected from configuration.
struct Backends {
    reader: Arc<dyn ClientsRepo>,
    writer: Arc<dyn ClientsWriteRepo>,
    events: Arc<dyn EventPublisher>,
    db: Option<Arc<PostgresRepositories>>,
    bus: Option<Arc<InProcessEventBus>>,
}

async fn connect_database(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(PostgresRepositories::new(pool))
}

async fn init_backends(settings: &config::Settings) -> Result<Backends, AppError> {
    if settings.database.url.is_some() {
        let repositories = connect_database(settings).await?;
        PostgresRepositories::run_migrations(repositories.pool())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

        let repositories = Arc::new(repositories);
        let publisher = Arc::new(PgNotifyPublisher::new(repositories.pool().clone()));
        return Ok(Backends {
            reader: repositories.clone(),
            writer: repositories.clone(),
            events: publisher,
            db: Some(repositories),
            bus: None,
        });
    }

    warn!("database url is not configured; using in-memory store and event bus");
    let store = Arc::new(InMemoryClientsRepo::new());
    let bus = Arc::new(InProcessEventBus::new(settings.events.bus_capacity));
    Ok(Backends {
        reader: store.clone(),
        writer: store,
        events: bus.clone(),
        db: None,
        bus: Some(bus),
    })
}

fn build_cache(settings: &config::CacheSettings) -> Arc<dyn CacheStore> {
    if settings.enabled {
        Arc::new(LruTtlCache::new(settings.capacity))
    } else {
        info!("client cache disabled");
        Arc::new(DisabledCache)
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backends = init_backends(&settings).await?;
    let cache = build_cache(&settings.cache);

    let service = ClientService::new(
        backends.reader.clone(),
        backends.writer.clone(),
        cache,
        backends.events.clone(),
    )
    .with_ttl(settings.cache.ttl)
    .with_side_effect_policy(settings.clients.side_effects);

    info!(
        cache_ttl_secs = settings.cache.ttl.as_secs(),
        side_effects = %settings.clients.side_effects,
        "client service ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let consumer_handle = if settings.events.consume_in_process {
        Some(spawn_consumer(&backends, shutdown_rx.clone()))
    } else {
        None
    };

    let mut state = ApiState::new(Arc::new(service));
    if let Some(db) = backends.db.clone() {
        state = state.with_database(db);
    }

    let result = serve_http(&settings.server, state, shutdown_tx, shutdown_rx).await;

    if let Some(handle) = consumer_handle {
        let _ = handle.await;
    }

    result
}

fn spawn_consumer(
    backends: &Backends,
    shutdown: watch::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let consumer = ClientEventsConsumer::new();
    if let Some(db) = backends.db.clone() {
        tokio::spawn(async move {
            if let Err(err) = run_pg_listener(db.pool(), consumer, wait_for(shutdown)).await {
                error!(error = %err, "client event listener failed");
            }
        })
    } else if let Some(bus) = backends.bus.as_ref() {
        let receiver = bus.subscribe();
        tokio::spawn(run_bus_listener(receiver, consumer, wait_for(shutdown)))
    } else {
        tokio::spawn(async {})
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = connect_database(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!("database migrations applied");
    Ok(())
}

async fn run_consume(settings: config::Settings) -> Result<(), AppError> {
    let repositories = connect_database(&settings).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    run_pg_listener(
        repositories.pool(),
        ClientEventsConsumer::new(),
        wait_for(shutdown_rx),
    )
    .await
    .map_err(AppError::from)
}

async fn serve_http(
    server: &config::ServerSettings,
    state: ApiState,
    shutdown_tx: watch::Sender<()>,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %server.addr, "http listener bound");

    let serve = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(wait_for(shutdown_rx))
        .into_future();
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = shutdown_signal() => {
            info!(
                grace_secs = server.graceful_shutdown.as_secs(),
                "shutdown requested; draining connections"
            );
            let _ = shutdown_tx.send(());
        }
    }

    drain(serve, server.graceful_shutdown).await
}

async fn drain<F>(serve: F, grace: Duration) -> Result<(), AppError>
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match tokio::time::timeout(grace, serve).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!("graceful shutdown timed out; exiting with open connections");
            Ok(())
        }
    }
}

async fn wait_for(mut shutdown: watch::Receiver<()>) {
    // A dropped sender also ends the wait.
    let _ = shutdown.changed().await;
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
