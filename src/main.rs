use std::{process, sync::Arc};

use crema::{
    application::{
        api_keys::{ApiKeyService, IssueApiKeyCommand},
        error::AppError,
        fixtures,
        products::{ListingSettings, ProductService},
        repos::{ApiKeysRepo, ProductsRepo, ProductsWriteRepo, StoreHealth},
        version::AcceptHeaderVersionResolver,
    },
    cache::{CacheConfig, ListingCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::sync::Notify;
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
        config::Command::Serve(args) => run_serve(settings, args.seed).await,
        config::Command::Seed(_) => run_seed(settings).await,
        config::Command::IssueKey(args) => run_issue_key(settings, args).await,
        config::Command::RevokeKey(args) => run_revoke_key(settings, args).await,
    }
}

/// Store adapters shared by every command.
#[derive(Clone)]
struct Repositories {
    products: Arc<dyn ProductsRepo>,
    products_write: Arc<dyn ProductsWriteRepo>,
    api_keys: Arc<dyn ApiKeysRepo>,
    health: Arc<dyn StoreHealth>,
}

impl Repositories {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProductsRepo + ProductsWriteRepo + ApiKeysRepo + StoreHealth + 'static,
    {
        Self {
            products: store.clone(),
            products_write: store.clone(),
            api_keys: store.clone(),
            health: store,
        }
    }
}

async fn run_serve(settings: config::Settings, seed: bool) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, false).await?;
    let state = build_application_context(repositories.clone(), &settings);

    if seed {
        seed_fixtures(&repositories).await?;
    }

    serve_http(&settings, state).await
}

async fn run_seed(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    seed_fixtures(&repositories).await
}

async fn run_issue_key(
    settings: config::Settings,
    args: config::IssueKeyArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    let service = ApiKeyService::new(repositories.api_keys.clone());

    let expires_at = args
        .expires_in_days
        .map(|days| time::OffsetDateTime::now_utc() + time::Duration::days(i64::from(days)));

    let issued = service
        .issue(IssueApiKeyCommand {
            name: args.name,
            role: args.role.into(),
            expires_at,
        })
        .await?;

    info!(
        target = "crema::cli",
        key_id = %issued.record.id,
        name = %issued.record.name,
        role = issued.record.role.as_str(),
        "Issued API key"
    );
    println!("{}", issued.token);
    Ok(())
}

async fn run_revoke_key(
    settings: config::Settings,
    args: config::RevokeKeyArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    ApiKeyService::new(repositories.api_keys.clone())
        .revoke(args.id)
        .await?;

    info!(target = "crema::cli", key_id = %args.id, "Revoked API key");
    Ok(())
}

async fn seed_fixtures(repositories: &Repositories) -> Result<(), AppError> {
    let service = ApiKeyService::new(repositories.api_keys.clone());
    let report = fixtures::seed(
        repositories.products.clone(),
        repositories.products_write.clone(),
        &service,
    )
    .await?;

    for issued in &report.keys {
        println!(
            "{} ({}): {}",
            issued.record.name,
            issued.record.role.as_str(),
            issued.token
        );
    }
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
    require_database: bool,
) -> Result<Repositories, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        if require_database {
            return Err(InfraError::configuration("database url is not configured").into());
        }
        warn!(
            target = "crema::bootstrap",
            "database.url is not configured; using the in-memory store, data will not survive restarts"
        );
        return Ok(Repositories::from_store(Arc::new(
            InMemoryRepositories::new(),
        )));
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Repositories::from_store(Arc::new(
        PostgresRepositories::new(pool),
    )))
}

fn build_application_context(repositories: Repositories, settings: &config::Settings) -> ApiState {
    let cache_config = CacheConfig::from(&settings.cache);
    let listing_cache = cache_config
        .enable_listing_cache
        .then(|| Arc::new(ListingCache::from_config(&cache_config)));

    let listing = ListingSettings {
        default_limit: settings.catalog.default_limit,
        max_limit: settings.catalog.max_limit,
        ttl: cache_config.listing_ttl(),
    };

    let products = ProductService::new(
        repositories.products.clone(),
        repositories.products_write.clone(),
        listing,
    )
    .with_listing_cache_opt(listing_cache);

    ApiState {
        products: Arc::new(products),
        api_keys: Arc::new(ApiKeyService::new(repositories.api_keys.clone())),
        versions: Arc::new(AcceptHeaderVersionResolver::new(
            settings.api.default_version,
        )),
        health: repositories.health,
        public_url: settings.server.public_url.clone(),
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "crema::bootstrap",
        addr = %settings.server.addr,
        public_url = %settings.server.public_url,
        "Listening"
    );

    let draining = Arc::new(Notify::new());
    let signal = draining.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            signal.notify_one();
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "crema::bootstrap",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "crema::bootstrap", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "crema::bootstrap",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "crema::bootstrap", "Shutdown signal received");
}
