//! In-memory storage implementation

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    ChargePoint, ChargePointRepository, ChargePointStatus, Connector, ConnectorRepository,
    DomainError, DomainResult, IdTag, IdTagRepository, RepositoryProvider, Transaction,
    TransactionRepository,
};

/// In-memory storage for development and testing.
///
/// Natural keys are kept in side indexes so that uniqueness checks and
/// inserts happen under one map entry lock.
pub struct InMemoryStorage {
    charge_points: DashMap<i32, ChargePoint>,
    charge_point_codes: DashMap<String, i32>,
    connectors: DashMap<i32, Connector>,
    connector_index: DashMap<(i32, u32), i32>,
    id_tags: DashMap<i32, IdTag>,
    id_tag_values: DashMap<String, i32>,
    transactions: DashMap<i32, Transaction>,
    transaction_ids: DashMap<i32, i32>,
    active_transactions: DashMap<(i32, u32), i32>,
    charge_point_counter: AtomicI32,
    connector_counter: AtomicI32,
    id_tag_counter: AtomicI32,
    transaction_counter: AtomicI32,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            charge_points: DashMap::new(),
            charge_point_codes: DashMap::new(),
            connectors: DashMap::new(),
            connector_index: DashMap::new(),
            id_tags: DashMap::new(),
            id_tag_values: DashMap::new(),
            transactions: DashMap::new(),
            transaction_ids: DashMap::new(),
            active_transactions: DashMap::new(),
            charge_point_counter: AtomicI32::new(1),
            connector_counter: AtomicI32::new(1),
            id_tag_counter: AtomicI32::new(1),
            transaction_counter: AtomicI32::new(1),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryStorage {
    fn charge_points(&self) -> &dyn ChargePointRepository {
        self
    }

    fn connectors(&self) -> &dyn ConnectorRepository {
        self
    }

    fn id_tags(&self) -> &dyn IdTagRepository {
        self
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        self
    }
}

// ── Charge points ───────────────────────────────────────────────

#[async_trait]
impl ChargePointRepository for InMemoryStorage {
    async fn insert(&self, mut charge_point: ChargePoint) -> DomainResult<ChargePoint> {
        match self.charge_point_codes.entry(charge_point.code.clone()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "charge point code {}",
                charge_point.code
            ))),
            Entry::Vacant(slot) => {
                charge_point.id = self.charge_point_counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(charge_point.id);
                self.charge_points
                    .insert(charge_point.id, charge_point.clone());
                Ok(charge_point)
            }
        }
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargePoint>> {
        Ok(self.charge_points.get(&id).map(|cp| cp.clone()))
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<ChargePoint>> {
        let Some(id) = self.charge_point_codes.get(code).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.charge_points.get(&id).map(|cp| cp.clone()))
    }

    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()> {
        match self.charge_points.get_mut(&charge_point.id) {
            Some(mut stored) if stored.code == charge_point.code => {
                *stored = charge_point;
                Ok(())
            }
            Some(_) => Err(DomainError::Validation(format!(
                "charge point {} code is immutable",
                charge_point.id
            ))),
            None => Err(DomainError::not_found("ChargePoint", "id", charge_point.id)),
        }
    }

    async fn update_status(&self, id: i32, status: ChargePointStatus) -> DomainResult<()> {
        let mut cp = self
            .charge_points
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("ChargePoint", "id", id))?;
        cp.status = status;
        cp.updated_at = Utc::now();
        Ok(())
    }

    async fn update_heartbeat(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        let mut cp = self
            .charge_points
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("ChargePoint", "id", id))?;
        cp.last_heartbeat = Some(at);
        cp.updated_at = at;
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let (_, cp) = self
            .charge_points
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("ChargePoint", "id", id))?;
        self.charge_point_codes.remove(&cp.code);
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
        let mut all: Vec<ChargePoint> = self.charge_points.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|cp| cp.id);
        Ok(all)
    }
}

// ── Connectors ──────────────────────────────────────────────────

#[async_trait]
impl ConnectorRepository for InMemoryStorage {
    async fn insert(&self, mut connector: Connector) -> DomainResult<Connector> {
        let key = (connector.charge_point_id, connector.connector_id);
        match self.connector_index.entry(key) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "connector {} of charge point {}",
                connector.connector_id, connector.charge_point_id
            ))),
            Entry::Vacant(slot) => {
                connector.id = self.connector_counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(connector.id);
                self.connectors.insert(connector.id, connector.clone());
                Ok(connector)
            }
        }
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Connector>> {
        Ok(self.connectors.get(&id).map(|c| c.clone()))
    }

    async fn find_by_charge_point_and_connector(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>> {
        let Some(id) = self
            .connector_index
            .get(&(charge_point_id, connector_id))
            .map(|id| *id)
        else {
            return Ok(None);
        };
        Ok(self.connectors.get(&id).map(|c| c.clone()))
    }

    async fn update(&self, connector: Connector) -> DomainResult<()> {
        let mut stored = self
            .connectors
            .get_mut(&connector.id)
            .ok_or_else(|| DomainError::not_found("Connector", "id", connector.id))?;
        if (stored.charge_point_id, stored.connector_id)
            != (connector.charge_point_id, connector.connector_id)
        {
            return Err(DomainError::Validation(format!(
                "connector {} cannot be moved",
                connector.id
            )));
        }
        *stored = connector;
        Ok(())
    }

    async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Connector>> {
        let mut found: Vec<Connector> = self
            .connectors
            .iter()
            .filter(|c| c.charge_point_id == charge_point_id)
            .map(|c| c.clone())
            .collect();
        found.sort_by_key(|c| c.connector_id);
        Ok(found)
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let (_, connector) = self
            .connectors
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("Connector", "id", id))?;
        self.connector_index
            .remove(&(connector.charge_point_id, connector.connector_id));
        Ok(())
    }
}

// ── ID tags ─────────────────────────────────────────────────────

#[async_trait]
impl IdTagRepository for InMemoryStorage {
    async fn insert(&self, mut id_tag: IdTag) -> DomainResult<IdTag> {
        match self.id_tag_values.entry(id_tag.tag.clone()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!("id tag {}", id_tag.tag))),
            Entry::Vacant(slot) => {
                id_tag.id = self.id_tag_counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(id_tag.id);
                self.id_tags.insert(id_tag.id, id_tag.clone());
                Ok(id_tag)
            }
        }
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<IdTag>> {
        Ok(self.id_tags.get(&id).map(|t| t.clone()))
    }

    async fn find_by_tag(&self, tag: &str) -> DomainResult<Option<IdTag>> {
        let Some(id) = self.id_tag_values.get(tag).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.id_tags.get(&id).map(|t| t.clone()))
    }

    async fn update(&self, id_tag: IdTag) -> DomainResult<()> {
        let previous = self
            .id_tags
            .get(&id_tag.id)
            .map(|t| t.tag.clone())
            .ok_or_else(|| DomainError::not_found("IdTag", "id", id_tag.id))?;

        if previous != id_tag.tag {
            match self.id_tag_values.entry(id_tag.tag.clone()) {
                Entry::Occupied(_) => {
                    return Err(DomainError::Conflict(format!("id tag {}", id_tag.tag)))
                }
                Entry::Vacant(slot) => {
                    slot.insert(id_tag.id);
                }
            }
            self.id_tag_values.remove(&previous);
        }

        self.id_tags.insert(id_tag.id, id_tag);
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let (_, tag) = self
            .id_tags
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("IdTag", "id", id))?;
        self.id_tag_values.remove(&tag.tag);
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<IdTag>> {
        let mut all: Vec<IdTag> = self.id_tags.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }
}

// ── Transactions ────────────────────────────────────────────────

impl InMemoryStorage {
    fn store_new_transaction(&self, transaction: &mut Transaction) {
        let id = self.transaction_counter.fetch_add(1, Ordering::SeqCst);
        transaction.id = id;
        transaction.transaction_id = id;
        self.transaction_ids.insert(id, id);
        self.transactions.insert(id, transaction.clone());
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStorage {
    async fn insert(&self, mut transaction: Transaction) -> DomainResult<Transaction> {
        if !transaction.is_active() {
            self.store_new_transaction(&mut transaction);
            return Ok(transaction);
        }

        let key = (transaction.charge_point_id, transaction.connector_id);
        match self.active_transactions.entry(key) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "active transaction on connector {} of charge point {}",
                key.1, key.0
            ))),
            Entry::Vacant(slot) => {
                self.store_new_transaction(&mut transaction);
                slot.insert(transaction.id);
                Ok(transaction)
            }
        }
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Transaction>> {
        Ok(self.transactions.get(&id).map(|t| t.clone()))
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: i32,
    ) -> DomainResult<Option<Transaction>> {
        let Some(id) = self.transaction_ids.get(&transaction_id).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.transactions.get(&id).map(|t| t.clone()))
    }

    async fn find_active_for_connector(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>> {
        let Some(id) = self
            .active_transactions
            .get(&(charge_point_id, connector_id))
            .map(|id| *id)
        else {
            return Ok(None);
        };
        Ok(self.transactions.get(&id).map(|t| t.clone()))
    }

    async fn update(&self, transaction: Transaction) -> DomainResult<()> {
        if !self.transactions.contains_key(&transaction.id) {
            return Err(DomainError::not_found("Transaction", "id", transaction.id));
        }

        let key = (transaction.charge_point_id, transaction.connector_id);
        if transaction.is_active() {
            match self.active_transactions.entry(key) {
                Entry::Occupied(slot) if *slot.get() != transaction.id => {
                    return Err(DomainError::Conflict(format!(
                        "active transaction on connector {} of charge point {}",
                        key.1, key.0
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(transaction.id);
                }
            }
        } else {
            self.active_transactions
                .remove_if(&key, |_, id| *id == transaction.id);
        }

        self.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Transaction>> {
        let mut found: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.charge_point_id == charge_point_id)
            .map(|t| t.clone())
            .collect();
        found.sort_by_key(|t| t.id);
        Ok(found)
    }

    async fn find_all(&self) -> DomainResult<Vec<Transaction>> {
        let mut all: Vec<Transaction> = self.transactions.iter().map(|t| t.clone()).collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_tx(charge_point_id: i32, connector_id: u32) -> Transaction {
        Transaction::start(charge_point_id, connector_id, 1, "TAG", 0.0, Utc::now())
    }

    #[tokio::test]
    async fn charge_point_code_is_unique() {
        let storage = InMemoryStorage::new();
        let repo = storage.charge_points();
        let cp = repo.insert(ChargePoint::new("CP001")).await.unwrap();
        assert!(cp.id > 0);
        assert!(matches!(
            repo.insert(ChargePoint::new("CP001")).await,
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(repo.find_by_code("CP001").await.unwrap().unwrap().id, cp.id);
    }

    #[tokio::test]
    async fn connector_lookup_by_station_and_index() {
        let storage = InMemoryStorage::new();
        let repo = storage.connectors();
        let c = repo.insert(Connector::new(1, 2)).await.unwrap();
        let found = repo.find_by_charge_point_and_connector(1, 2).await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(c.id));
        assert!(repo
            .find_by_charge_point_and_connector(1, 3)
            .await
            .unwrap()
            .is_none());
        assert!(repo.insert(Connector::new(1, 2)).await.is_err());
    }

    #[tokio::test]
    async fn id_tag_rename_keeps_index_consistent() {
        let storage = InMemoryStorage::new();
        let repo = storage.id_tags();
        let mut tag = repo.insert(IdTag::new("OLD")).await.unwrap();
        repo.insert(IdTag::new("TAKEN")).await.unwrap();

        tag.tag = "TAKEN".into();
        assert!(matches!(repo.update(tag.clone()).await, Err(DomainError::Conflict(_))));

        tag.tag = "NEW".into();
        repo.update(tag).await.unwrap();
        assert!(repo.find_by_tag("OLD").await.unwrap().is_none());
        assert!(repo.find_by_tag("NEW").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_active_transaction_on_connector_conflicts() {
        let storage = InMemoryStorage::new();
        let repo = storage.transactions();
        let first = repo.insert(active_tx(1, 1)).await.unwrap();
        assert!(matches!(
            repo.insert(active_tx(1, 1)).await,
            Err(DomainError::Conflict(_))
        ));
        // Other connectors are unaffected
        repo.insert(active_tx(1, 2)).await.unwrap();

        let active = repo.find_active_for_connector(1, 1).await.unwrap().unwrap();
        assert_eq!(active.transaction_id, first.transaction_id);
    }

    #[tokio::test]
    async fn completing_transaction_frees_connector() {
        let storage = InMemoryStorage::new();
        let repo = storage.transactions();
        let mut tx = repo.insert(active_tx(1, 1)).await.unwrap();
        tx.complete(10.0, None, Utc::now(), rust_decimal::Decimal::ONE).unwrap();
        repo.update(tx).await.unwrap();

        assert!(repo.find_active_for_connector(1, 1).await.unwrap().is_none());
        repo.insert(active_tx(1, 1)).await.unwrap();
    }

    #[tokio::test]
    async fn transaction_ids_are_distinct() {
        let storage = InMemoryStorage::new();
        let repo = storage.transactions();
        let a = repo.insert(active_tx(1, 1)).await.unwrap();
        let b = repo.insert(active_tx(2, 1)).await.unwrap();
        assert_ne!(a.transaction_id, b.transaction_id);
        assert_eq!(
            repo.find_by_transaction_id(b.transaction_id).await.unwrap().map(|t| t.id),
            Some(b.id)
        );
    }
}
