//! SeaORM implementation of TransactionRepository

use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::{
    DomainError, DomainResult, Transaction, TransactionRepository, TransactionStatus,
};
use crate::infrastructure::database::entities::transaction;

pub struct SeaOrmTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn status_to_entity(status: TransactionStatus) -> transaction::TransactionStatus {
    match status {
        TransactionStatus::Active => transaction::TransactionStatus::Active,
        TransactionStatus::Completed => transaction::TransactionStatus::Completed,
        TransactionStatus::Cancelled => transaction::TransactionStatus::Cancelled,
        TransactionStatus::Failed => transaction::TransactionStatus::Failed,
        TransactionStatus::Pending => transaction::TransactionStatus::Pending,
    }
}

fn status_from_entity(status: transaction::TransactionStatus) -> TransactionStatus {
    match status {
        transaction::TransactionStatus::Active => TransactionStatus::Active,
        transaction::TransactionStatus::Completed => TransactionStatus::Completed,
        transaction::TransactionStatus::Cancelled => TransactionStatus::Cancelled,
        transaction::TransactionStatus::Failed => TransactionStatus::Failed,
        transaction::TransactionStatus::Pending => TransactionStatus::Pending,
    }
}

fn tx_from_model(model: transaction::Model) -> DomainResult<Transaction> {
    let total_cost = Decimal::from_str(&model.total_cost).map_err(|e| {
        DomainError::Storage(format!("transaction {} total_cost: {}", model.id, e))
    })?;
    Ok(Transaction {
        id: model.id,
        transaction_id: model.transaction_id,
        charge_point_id: model.charge_point_id,
        connector_id: model.connector_id as u32,
        id_tag_id: model.id_tag_id,
        id_tag: model.id_tag,
        start_meter_value: model.start_meter_value,
        stop_meter_value: model.stop_meter_value,
        current_meter_value: model.current_meter_value,
        energy_consumed: model.energy_consumed,
        total_cost,
        start_time: model.start_time,
        stop_time: model.stop_time,
        status: status_from_entity(model.status),
        reason: model.reason,
    })
}

fn tx_from_models(models: Vec<transaction::Model>) -> DomainResult<Vec<Transaction>> {
    models.into_iter().map(tx_from_model).collect()
}

fn active_model(tx: Transaction) -> transaction::ActiveModel {
    transaction::ActiveModel {
        id: NotSet,
        transaction_id: Set(tx.transaction_id),
        charge_point_id: Set(tx.charge_point_id),
        connector_id: Set(tx.connector_id as i32),
        id_tag_id: Set(tx.id_tag_id),
        id_tag: Set(tx.id_tag),
        start_meter_value: Set(tx.start_meter_value),
        stop_meter_value: Set(tx.stop_meter_value),
        current_meter_value: Set(tx.current_meter_value),
        energy_consumed: Set(tx.energy_consumed),
        total_cost: Set(tx.total_cost.to_string()),
        start_time: Set(tx.start_time),
        stop_time: Set(tx.stop_time),
        status: Set(status_to_entity(tx.status)),
        reason: Set(tx.reason),
    }
}

// ── TransactionRepository impl ──────────────────────────────────

#[async_trait]
impl TransactionRepository for SeaOrmTransactionRepository {
    /// The protocol id is the row's autoincrement key, written back in the
    /// same database transaction. A second Active row for a connector is
    /// refused by the partial unique index and surfaces as `Conflict`.
    async fn insert(&self, tx: Transaction) -> DomainResult<Transaction> {
        debug!(
            "Inserting transaction for charge point {} connector {}",
            tx.charge_point_id, tx.connector_id
        );

        let db_tx = self.db.begin().await?;
        let inserted = active_model(tx).insert(&db_tx).await?;

        let id = inserted.id;
        let mut model: transaction::ActiveModel = inserted.into();
        model.transaction_id = Set(id);
        let stored = model.update(&db_tx).await?;
        db_tx.commit().await?;

        info!("Transaction {} stored", stored.transaction_id);
        tx_from_model(stored)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Transaction>> {
        transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(tx_from_model)
            .transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Option<Transaction>> {
        transaction::Entity::find()
            .filter(transaction::Column::TransactionId.eq(transaction_id))
            .one(&self.db)
            .await?
            .map(tx_from_model)
            .transpose()
    }

    async fn find_active_for_connector(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>> {
        transaction::Entity::find()
            .filter(transaction::Column::ChargePointId.eq(charge_point_id))
            .filter(transaction::Column::ConnectorId.eq(connector_id as i32))
            .filter(transaction::Column::Status.eq(transaction::TransactionStatus::Active))
            .one(&self.db)
            .await?
            .map(tx_from_model)
            .transpose()
    }

    async fn update(&self, tx: Transaction) -> DomainResult<()> {
        debug!("Updating transaction {} ({})", tx.transaction_id, tx.status);
        let id = tx.id;
        if transaction::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(DomainError::not_found("Transaction", "id", id));
        }

        let mut model = active_model(tx);
        model.id = Set(id);
        model.update(&self.db).await?;
        Ok(())
    }

    async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Transaction>> {
        let models = transaction::Entity::find()
            .filter(transaction::Column::ChargePointId.eq(charge_point_id))
            .order_by_asc(transaction::Column::Id)
            .all(&self.db)
            .await?;
        tx_from_models(models)
    }

    async fn find_all(&self) -> DomainResult<Vec<Transaction>> {
        let models = transaction::Entity::find()
            .order_by_asc(transaction::Column::Id)
            .all(&self.db)
            .await?;
        tx_from_models(models)
    }
}
