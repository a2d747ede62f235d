pub mod entities;
pub mod repositories;

pub use repositories::SeaOrmRepositoryProvider;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::info;

use entities::{charge_point, connector, id_tag, transaction};

/// Indexes the entity derive cannot express: the composite connector key
/// and the one-active-transaction-per-connector guard.
const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_connectors_charge_point_connector \
     ON connectors (charge_point_id, connector_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_active_connector \
     ON transactions (charge_point_id, connector_id) WHERE status = 'Active'",
    "CREATE INDEX IF NOT EXISTS idx_transactions_transaction_id \
     ON transactions (transaction_id)",
];

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./csms.db?mode=rwc")
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./csms.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Create config for SQLite
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            ..Self::default()
        }
    }

    /// Private in-memory database. A single connection, since every
    /// SQLite memory connection is its own database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// Initialize database connection and make sure the schema exists.
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    info!("Connecting to database: {}", config.url);
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    bootstrap_schema(&db).await?;
    info!("Database connected successfully");
    Ok(db)
}

/// Create missing tables and indexes. Existing tables are left untouched.
pub async fn bootstrap_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, charge_point::Entity).await?;
    create_table(db, connector::Entity).await?;
    create_table(db, id_tag::Entity).await?;
    create_table(db, transaction::Entity).await?;

    for sql in INDEXES {
        db.execute_unprepared(sql).await?;
    }
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
