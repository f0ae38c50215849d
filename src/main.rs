mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::{net::SocketAddr, sync::Arc};

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use service::{
    background_jobs::start_housekeeping_job, payment_provider::PaymentProviderService,
    realtime::ChatHub, storage::StorageService, webhook::WebhookService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub payments: PaymentProviderService,
    pub webhook_service: Arc<WebhookService>,
    pub chat_hub: ChatHub,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config, storage: StorageService) -> Self {
        let db_client = Arc::new(db_client);
        let webhook_service = Arc::new(WebhookService::new(
            db_client.clone(),
            config.featured_task_days,
        ));

        Self {
            payments: PaymentProviderService::new(&config),
            env: config,
            db_client,
            webhook_service,
            chat_hub: ChatHub::new(),
            storage,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskify=debug,tower_http=debug")),
        )
        .init();

    let config = match Config::init() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::error!("Failed to run migrations: {}", e);
            std::process::exit(1);
        }
        tracing::info!("Migrations applied");
    }

    let db_client = match config.redis_url {
        Some(ref redis_url) => DBClient::with_redis(pool, redis_url).await,
        None => {
            tracing::info!("Redis not configured - running without cache (set REDIS_URL to enable)");
            DBClient::new(pool)
        }
    };

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-admin-bootstrap"),
        ])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let storage = StorageService::from_config(&config).await;
    let app_state = Arc::new(AppState::new(db_client, config.clone(), storage));

    tokio::spawn(start_housekeeping_job(app_state.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);
    tracing::info!("Cache status: {}", app_state.db_client.cache_status());

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind port {}: {}", config.port, e);
            std::process::exit(1);
        }
    };

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service).await {
        tracing::error!("Server error: {}", e);
    }
}
