//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::{
    ChargePointRepository, ConnectorRepository, IdTagRepository, RepositoryProvider,
    TransactionRepository,
};

use super::charge_point_repository::SeaOrmChargePointRepository;
use super::connector_repository::SeaOrmConnectorRepository;
use super::id_tag_repository::SeaOrmIdTagRepository;
use super::transaction_repository::SeaOrmTransactionRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let cp = repos.charge_points().find_by_code("CP001").await?;
/// let tx = repos.transactions().find_active_for_connector(cp.id, 1).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    charge_points: SeaOrmChargePointRepository,
    connectors: SeaOrmConnectorRepository,
    id_tags: SeaOrmIdTagRepository,
    transactions: SeaOrmTransactionRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            charge_points: SeaOrmChargePointRepository::new(db.clone()),
            connectors: SeaOrmConnectorRepository::new(db.clone()),
            id_tags: SeaOrmIdTagRepository::new(db.clone()),
            transactions: SeaOrmTransactionRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn charge_points(&self) -> &dyn ChargePointRepository {
        &self.charge_points
    }

    fn connectors(&self) -> &dyn ConnectorRepository {
        &self.connectors
    }

    fn id_tags(&self) -> &dyn IdTagRepository {
        &self.id_tags
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }
}
