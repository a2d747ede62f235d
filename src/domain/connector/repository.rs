//! Connector repository interface

use async_trait::async_trait;

use super::model::Connector;
use crate::domain::DomainResult;

#[async_trait]
pub trait ConnectorRepository: Send + Sync {
    /// Store a new connector, returning it with its assigned `id`.
    /// Fails with `Conflict` if (charge_point_id, connector_id) exists.
    async fn insert(&self, connector: Connector) -> DomainResult<Connector>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Connector>>;
    async fn find_by_charge_point_and_connector(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>>;
    async fn update(&self, connector: Connector) -> DomainResult<()>;
    async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Connector>>;
    async fn delete(&self, id: i32) -> DomainResult<()>;
}
