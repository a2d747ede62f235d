//! Transaction repository interface

use async_trait::async_trait;

use super::model::Transaction;
use crate::domain::DomainResult;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Store a new transaction, minting its `id` and protocol
    /// `transaction_id`. Fails with `Conflict` if the connector already
    /// has an active transaction.
    async fn insert(&self, transaction: Transaction) -> DomainResult<Transaction>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Transaction>>;
    async fn find_by_transaction_id(&self, transaction_id: i32)
        -> DomainResult<Option<Transaction>>;
    async fn find_active_for_connector(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>>;
    async fn update(&self, transaction: Transaction) -> DomainResult<()>;
    async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Transaction>>;
    async fn find_all(&self) -> DomainResult<Vec<Transaction>>;
}
