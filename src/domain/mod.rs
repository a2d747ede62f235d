//! Domain layer: entities and the storage interfaces the core calls through.

pub mod charge_point;
pub mod connector;
pub mod id_tag;
pub mod repositories;
pub mod transaction;

pub use charge_point::{BootInfo, ChargePoint, ChargePointRepository, ChargePointStatus};
pub use connector::{Connector, ConnectorRepository, ConnectorStatus};
pub use id_tag::{IdTag, IdTagRepository, IdTagStatus};
pub use repositories::RepositoryProvider;
pub use transaction::{Transaction, TransactionRepository, TransactionStatus};

pub use crate::shared::errors::{DomainError, DomainResult};
