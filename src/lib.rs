//! # CSMS
//!
//! OCPP 1.6 Central System core for managing EV charging stations over
//! OCPP-J (JSON over WebSocket).
//!
//! ## Architecture
//!
//! - **domain**: entities and the repository traits the core calls through
//! - **application**: the registry, connector tracker, authorization gate,
//!   transaction ledger and the per-action handlers
//! - **infrastructure**: in-memory and SQLite (SeaORM) storage backends
//! - **interfaces**: the WebSocket listener and per-connection sessions
//! - **shared**: frame codec, error types, shutdown signalling

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, InMemoryStorage, SeaOrmRepositoryProvider};
pub use interfaces::OcppServer;
pub use server::{init_tracing, ServerHandle, ServerOptions};
