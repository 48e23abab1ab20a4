//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use crate::application::services::{
    DeliveryNotifier, MessagingLimits, MessagingService, MessagingServiceImpl,
};
use crate::config::{Settings, StorageBackend};
use crate::domain::{ActivitySink, IdentityProvider, PresenceStore};
use crate::infrastructure::activity::{LogActivitySink, RedisActivitySink};
use crate::infrastructure::cache::{self, LocalPresenceStore, RedisPresenceStore};
use crate::infrastructure::database;
use crate::infrastructure::identity::JwtIdentityProvider;
use crate::infrastructure::repositories::{
    InMemoryMessageRepository, InMemoryRoomRepository, PgMessageRepository, PgRoomRepository,
};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};
use crate::presentation::websocket::DeliveryHub;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub messaging: Arc<dyn MessagingService>,
    pub hub: Arc<DeliveryHub>,
    pub identity: Arc<dyn IdentityProvider>,
    pub presence: Arc<dyn PresenceStore>,
    pub activity: Arc<dyn ActivitySink>,
    /// Set for the postgres storage backend
    pub db: Option<PgPool>,
    /// Set when `redis.url` is configured
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Connect the configured backends and wire the services.
    pub async fn build(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);
        let hub = Arc::new(DeliveryHub::new());
        let notifier: Arc<dyn DeliveryNotifier> = hub.clone();

        let id_generator = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id,
            settings.snowflake.epoch,
        ));
        let limits = MessagingLimits {
            default_page_size: settings.messaging.default_page_size,
            max_page_size: settings.messaging.max_page_size,
            store_timeout: settings.storage.operation_timeout(),
        };

        let (messaging, db): (Arc<dyn MessagingService>, Option<PgPool>) =
            match settings.storage.backend {
                StorageBackend::Postgres => {
                    let pool = database::create_pool(
                        &settings.database,
                        settings.storage.operation_timeout(),
                    )
                    .await?;
                    tracing::info!("Database connection pool created");

                    if settings.database.run_migrations {
                        database::run_migrations(&pool).await?;
                        tracing::info!("Database migrations applied");
                    }

                    let service: Arc<dyn MessagingService> = Arc::new(MessagingServiceImpl::new(
                        Arc::new(PgRoomRepository::new(pool.clone())),
                        Arc::new(PgMessageRepository::new(pool.clone())),
                        notifier,
                        id_generator,
                        limits,
                    ));
                    (service, Some(pool))
                }
                StorageBackend::Memory => {
                    tracing::warn!("Using in-process storage; data is lost on restart");
                    let service: Arc<dyn MessagingService> = Arc::new(MessagingServiceImpl::new(
                        Arc::new(InMemoryRoomRepository::new()),
                        Arc::new(InMemoryMessageRepository::new()),
                        notifier,
                        id_generator,
                        limits,
                    ));
                    (service, None)
                }
            };

        let redis = match &settings.redis.url {
            Some(url) => Some(cache::create_redis_client(url).await?),
            None => None,
        };

        let presence_ttl = settings.redis.presence_ttl();
        let presence: Arc<dyn PresenceStore>;
        let activity: Arc<dyn ActivitySink>;
        match &redis {
            Some(conn) => {
                presence = Arc::new(RedisPresenceStore::new(conn.clone(), presence_ttl));
                activity = Arc::new(RedisActivitySink::new(
                    conn.clone(),
                    settings.redis.activity_stream.clone(),
                    settings.redis.activity_stream_max_len,
                ));
            }
            None => {
                tracing::info!("Redis not configured; presence is process-local");
                presence = Arc::new(LocalPresenceStore::new(presence_ttl));
                activity = Arc::new(LogActivitySink);
            }
        }

        Ok(Self {
            messaging,
            hub,
            identity: Arc::new(JwtIdentityProvider::new(&settings.jwt)),
            presence,
            activity,
            db,
            redis,
            settings,
        })
    }
}

/// Full router with tracing and CORS applied
pub fn build_router(state: AppState) -> Router {
    let cors = create_cors_layer(&state.settings.cors);
    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(create_trace_layer())
            .layer(cors),
    )
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let addr = settings.server.socket_addr()?;
        let state = AppState::build(settings).await?;
        let router = build_router(state.clone());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run_until_stopped(self) -> Result<()> {
        let hub = Arc::clone(&self.state.hub);
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(hub))
        .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Resolves on Ctrl-C or SIGTERM, after tearing down the delivery hub so
/// open gateway connections end and the server can drain.
async fn shutdown_signal(hub: Arc<DeliveryHub>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    hub.teardown();
}
