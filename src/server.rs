//! Reusable Central System runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: storage backend, services,
//! the OCPP WebSocket listener and graceful shutdown.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::application::{ActionTable, Services};
use crate::config::{AppConfig, StorageBackend};
use crate::domain::RepositoryProvider;
use crate::infrastructure::{init_database, InMemoryStorage, SeaOrmRepositoryProvider};
use crate::interfaces::ws::ocpp_server::SessionMap;
use crate::interfaces::OcppServer;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Options for starting the Central System.
#[derive(Default)]
pub struct ServerOptions {
    pub config: AppConfig,
}

/// Handle to a running Central System.
///
/// ```rust,no_run
/// use csms::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    pub services: Arc<Services>,
    /// Connected charge points by session id.
    pub sessions: SessionMap,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Port actually bound (differs from the config when it asked for 0).
    pub port: u16,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    ws_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Open storage, bind the listener and start accepting charge points.
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        info!("Starting CSMS...");

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            match app_cfg.database.backend {
                StorageBackend::Memory => {
                    info!("Using in-memory storage");
                    (Arc::new(InMemoryStorage::new()), None)
                }
                StorageBackend::Sqlite => {
                    let db = init_database(&app_cfg.database.to_database_config()).await?;
                    (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
                }
            };

        // ── Services ───────────────────────────────────────────
        let services = Arc::new(Services::new(
            repos.clone(),
            app_cfg.ocpp.heartbeat_interval,
            app_cfg.tariff.price_per_kwh,
        ));
        let table = Arc::new(ActionTable::v16());
        info!(
            heartbeat_interval = app_cfg.ocpp.heartbeat_interval,
            price_per_kwh = %app_cfg.tariff.price_per_kwh,
            actions = ?table.actions(),
            "Services ready"
        );

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);

        // ── OCPP WebSocket server ──────────────────────────────
        let address = app_cfg.server.address();
        let listener = TcpListener::bind(&address).await?;
        let port = listener.local_addr()?.port();

        let server = OcppServer::new(address, table, services.clone())
            .with_shutdown(shutdown.signal());
        let sessions = server.sessions();

        let ws_task = tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                error!("WebSocket server error: {}", e);
            }
        });

        Ok(Self {
            repos,
            services,
            sessions,
            config: app_cfg,
            port,
            db,
            shutdown,
            ws_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered.
    /// Gives up on the listener after `server.shutdown_timeout` seconds.
    pub async fn wait(self) {
        info!("Waiting for server tasks to complete...");

        let Self {
            ws_task,
            shutdown,
            sessions,
            db,
            ..
        } = self;

        let completed = shutdown
            .shutdown_with_cleanup(|| async move {
                match ws_task.await {
                    Ok(()) => info!("WebSocket server stopped"),
                    Err(e) => error!("WebSocket server task panicked: {}", e),
                }
            })
            .await;
        if !completed {
            warn!(sessions = sessions.len(), "Sessions still open at shutdown");
        }

        if let Some(db) = db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("CSMS shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down CSMS...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.ws_task.is_finished()
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
