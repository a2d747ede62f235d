//! Transaction lifecycle and billing

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::authorization::{AuthorizationGate, IdTagInfo};
use crate::domain::{DomainError, DomainResult, RepositoryProvider, Transaction};

/// Measurands accepted as a billing reading, in OCPP wire spelling
const ENERGY_REGISTER: &str = "Energy.Active.Import.Register";
const ENERGY_INTERVAL: &str = "Energy.Active.Import.Interval";
const POWER_IMPORT: &str = "Power.Active.Import";

/// One sampled value inside a meter reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampledValue {
    pub value: String,
    pub context: Option<String>,
    pub format: Option<String>,
    pub measurand: Option<String>,
    pub phase: Option<String>,
    pub location: Option<String>,
    pub unit: Option<String>,
}

impl SampledValue {
    fn is_billing_measurand(&self) -> bool {
        match self.measurand.as_deref() {
            None => true,
            Some(m) => matches!(m, ENERGY_REGISTER | ENERGY_INTERVAL | POWER_IMPORT),
        }
    }

    /// Value in kWh (or kW). Absent units are Wh.
    fn reading_kwh(&self) -> Option<f64> {
        let raw: f64 = self.value.trim().parse().ok().filter(|v: &f64| v.is_finite())?;
        match self.unit.as_deref() {
            Some("kWh") | Some("kW") => Some(raw),
            _ => Some(raw / 1000.0),
        }
    }
}

/// A timestamped group of sampled values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeterValue {
    pub timestamp: Option<DateTime<Utc>>,
    pub sampled_value: Vec<SampledValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartOutcome {
    pub id_tag_info: IdTagInfo,
    /// 0 when the start was refused
    pub transaction_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    pub transaction: Transaction,
    /// The stop was a retransmission for a transaction already closed
    pub already_completed: bool,
}

/// What a MeterValues frame did to the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum MeterUpdate {
    /// No transaction referenced
    Informational,
    /// Transaction is no longer active
    Ignored,
    /// No usable sample in the frame
    NoReading,
    Recorded { transaction_id: i32, reading_kwh: f64 },
}

/// Sole writer of transaction records.
pub struct TransactionLedger {
    repos: Arc<dyn RepositoryProvider>,
    gate: Arc<AuthorizationGate>,
    price_per_kwh: Decimal,
    connector_locks: DashMap<(i32, u32), Arc<Mutex<()>>>,
}

impl TransactionLedger {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gate: Arc<AuthorizationGate>,
        price_per_kwh: Decimal,
    ) -> Self {
        Self {
            repos,
            gate,
            price_per_kwh,
            connector_locks: DashMap::new(),
        }
    }

    fn connector_lock(&self, charge_point_id: i32, connector_id: u32) -> Arc<Mutex<()>> {
        self.connector_locks
            .entry((charge_point_id, connector_id))
            .or_default()
            .value()
            .clone()
    }

    /// Open a transaction on a connector.
    ///
    /// Check-then-insert runs under the connector's lock, so at most one
    /// caller can win an idle connector.
    pub async fn start_transaction(
        &self,
        charge_point_id: i32,
        connector_id: u32,
        tag: &str,
        meter_start: f64,
    ) -> DomainResult<StartOutcome> {
        let lock = self.connector_lock(charge_point_id, connector_id);
        let _guard = lock.lock().await;

        let transactions = self.repos.transactions();
        let busy = DomainError::ConnectorBusy {
            charge_point_id,
            connector_id,
        };

        if transactions
            .find_active_for_connector(charge_point_id, connector_id)
            .await?
            .is_some()
        {
            return Err(busy);
        }

        let now = Utc::now();
        let stored = self.gate.lookup(tag).await?;
        let verdict = AuthorizationGate::resolve(stored.as_ref(), now);
        let Some(id_tag) = stored.filter(|_| verdict.is_accepted()) else {
            info!(
                charge_point_id,
                connector_id,
                id_tag = tag,
                status = verdict.status.as_str(),
                "Transaction refused"
            );
            return Ok(StartOutcome {
                id_tag_info: verdict,
                transaction_id: 0,
            });
        };

        let transaction = Transaction::start(
            charge_point_id,
            connector_id,
            id_tag.id,
            tag,
            meter_start,
            now,
        );
        let transaction = match transactions.insert(transaction).await {
            Ok(tx) => tx,
            Err(DomainError::Conflict(_)) => return Err(busy),
            Err(e) => return Err(e),
        };

        info!(
            charge_point_id,
            connector_id,
            transaction_id = transaction.transaction_id,
            id_tag = tag,
            meter_start,
            "Transaction started"
        );

        Ok(StartOutcome {
            id_tag_info: verdict,
            transaction_id: transaction.transaction_id,
        })
    }

    /// Lock the connector a transaction runs on and return the transaction
    /// as read under that lock. Every ledger write happens while the guard
    /// is held, so a stop and a meter update cannot interleave.
    async fn lock_transaction(
        &self,
        charge_point_id: i32,
        transaction_id: i32,
    ) -> DomainResult<(OwnedMutexGuard<()>, Transaction)> {
        let seen = self.owned_transaction(charge_point_id, transaction_id).await?;
        let guard = self
            .connector_lock(seen.charge_point_id, seen.connector_id)
            .lock_owned()
            .await;
        let tx = self.owned_transaction(charge_point_id, transaction_id).await?;
        Ok((guard, tx))
    }

    async fn owned_transaction(
        &self,
        charge_point_id: i32,
        transaction_id: i32,
    ) -> DomainResult<Transaction> {
        let tx = self
            .repos
            .transactions()
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction", "transaction_id", transaction_id))?;
        if tx.charge_point_id != charge_point_id {
            return Err(DomainError::Mismatch {
                transaction_id,
                charge_point_id,
            });
        }
        Ok(tx)
    }

    /// Close a transaction and bill it. Energy is the register difference
    /// and replaces anything accumulated from meter samples.
    pub async fn stop_transaction(
        &self,
        charge_point_id: i32,
        transaction_id: i32,
        meter_stop: f64,
        reason: Option<String>,
    ) -> DomainResult<StopOutcome> {
        let (_guard, mut tx) = self.lock_transaction(charge_point_id, transaction_id).await?;

        if !tx.is_active() {
            info!(
                charge_point_id,
                transaction_id,
                status = tx.status.as_str(),
                "Stop for closed transaction acknowledged"
            );
            return Ok(StopOutcome {
                transaction: tx,
                already_completed: true,
            });
        }

        tx.complete(meter_stop, reason, Utc::now(), self.price_per_kwh)?;
        self.repos.transactions().update(tx.clone()).await?;

        info!(
            charge_point_id,
            transaction_id,
            energy = tx.energy_consumed,
            cost = %tx.total_cost,
            "Transaction stopped"
        );

        Ok(StopOutcome {
            transaction: tx,
            already_completed: false,
        })
    }

    /// Apply the latest usable reading of a MeterValues frame.
    pub async fn apply_meter_values(
        &self,
        charge_point_id: i32,
        connector_id: u32,
        transaction_id: Option<i32>,
        samples: &[MeterValue],
    ) -> DomainResult<MeterUpdate> {
        let Some(transaction_id) = transaction_id else {
            return Ok(MeterUpdate::Informational);
        };

        let (_guard, mut tx) = self.lock_transaction(charge_point_id, transaction_id).await?;
        if !tx.is_active() {
            return Ok(MeterUpdate::Ignored);
        }

        let Some(reading_kwh) = Self::latest_reading(samples, transaction_id) else {
            return Ok(MeterUpdate::NoReading);
        };

        tx.record_reading_kwh(reading_kwh);
        self.repos.transactions().update(tx).await?;

        tracing::debug!(
            charge_point_id,
            connector_id,
            transaction_id,
            reading_kwh,
            "Meter reading recorded"
        );
        Ok(MeterUpdate::Recorded {
            transaction_id,
            reading_kwh,
        })
    }

    fn latest_reading(samples: &[MeterValue], transaction_id: i32) -> Option<f64> {
        let group = samples.last()?;
        group
            .sampled_value
            .iter()
            .filter(|sv| sv.is_billing_measurand())
            .find_map(|sv| {
                let reading = sv.reading_kwh();
                if reading.is_none() {
                    warn!(
                        transaction_id,
                        value = sv.value.as_str(),
                        "Skipping unparseable meter value"
                    );
                }
                reading
            })
    }

    pub async fn get(&self, transaction_id: i32) -> DomainResult<Option<Transaction>> {
        self.repos
            .transactions()
            .find_by_transaction_id(transaction_id)
            .await
    }

    pub async fn active_for(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>> {
        self.repos
            .transactions()
            .find_active_for_connector(charge_point_id, connector_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use crate::domain::{
        ChargePointRepository, ConnectorRepository, IdTag, IdTagRepository, IdTagStatus,
        TransactionRepository, TransactionStatus,
    };
    use crate::infrastructure::InMemoryStorage;

    const CP: i32 = 1;

    async fn setup() -> (Arc<InMemoryStorage>, TransactionLedger) {
        let storage = Arc::new(InMemoryStorage::new());
        storage.id_tags().insert(IdTag::new("GOOD")).await.unwrap();
        storage.id_tags().insert(IdTag::new("ALSO-GOOD")).await.unwrap();
        storage
            .id_tags()
            .insert(IdTag::new("BLOCKED").with_status(IdTagStatus::Blocked))
            .await
            .unwrap();
        let gate = Arc::new(AuthorizationGate::new(storage.clone()));
        let ledger = TransactionLedger::new(storage.clone(), gate, Decimal::from(1500));
        (storage, ledger)
    }

    fn energy_sample(value: &str, unit: Option<&str>) -> Vec<MeterValue> {
        vec![MeterValue {
            timestamp: Some(Utc::now()),
            sampled_value: vec![SampledValue {
                value: value.into(),
                measurand: Some(ENERGY_REGISTER.into()),
                unit: unit.map(String::from),
                ..Default::default()
            }],
        }]
    }

    #[tokio::test]
    async fn blocked_tag_is_refused_without_record() {
        let (storage, ledger) = setup().await;
        let outcome = ledger.start_transaction(CP, 1, "BLOCKED", 0.0).await.unwrap();
        assert_eq!(outcome.id_tag_info.status, IdTagStatus::Blocked);
        assert_eq!(outcome.transaction_id, 0);
        assert!(storage.transactions().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_tag_start_matches_authorize() {
        let (storage, ledger) = setup().await;
        let expiry = chrono::TimeZone::with_ymd_and_hms(&Utc, 2020, 1, 1, 0, 0, 0).unwrap();
        storage
            .id_tags()
            .insert(IdTag::new("OLD").with_expiry(expiry))
            .await
            .unwrap();

        let outcome = ledger.start_transaction(CP, 1, "OLD", 0.0).await.unwrap();
        let authorized = AuthorizationGate::new(storage.clone())
            .authorize("OLD")
            .await
            .unwrap();

        assert_eq!(outcome.id_tag_info.status, IdTagStatus::Expired);
        assert_eq!(outcome.id_tag_info.expiry_date, Some(expiry));
        assert_eq!(outcome.id_tag_info, authorized);
        assert_eq!(outcome.transaction_id, 0);
        assert!(storage.transactions().find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tag_is_invalid() {
        let (_, ledger) = setup().await;
        let outcome = ledger.start_transaction(CP, 1, "WHO", 0.0).await.unwrap();
        assert_eq!(outcome.id_tag_info.status, IdTagStatus::Invalid);
        assert_eq!(outcome.transaction_id, 0);
    }

    #[tokio::test]
    async fn meter_values_normalize_to_kwh() {
        let (_, ledger) = setup().await;
        let start = ledger.start_transaction(CP, 1, "GOOD", 1000.0).await.unwrap();
        let id = start.transaction_id;
        assert!(id > 0);

        let update = ledger
            .apply_meter_values(CP, 1, Some(id), &energy_sample("1500", Some("Wh")))
            .await
            .unwrap();
        assert_eq!(
            update,
            MeterUpdate::Recorded {
                transaction_id: id,
                reading_kwh: 1.5
            }
        );

        let tx = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(tx.current_meter_value, 1.5);
        assert!((tx.energy_consumed - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stop_bills_register_difference() {
        let (_, ledger) = setup().await;
        let id = ledger
            .start_transaction(CP, 1, "GOOD", 1000.0)
            .await
            .unwrap()
            .transaction_id;
        ledger
            .apply_meter_values(CP, 1, Some(id), &energy_sample("1500", None))
            .await
            .unwrap();

        let outcome = ledger
            .stop_transaction(CP, id, 2000.0, Some("Local".into()))
            .await
            .unwrap();
        assert!(!outcome.already_completed);

        let tx = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.energy_consumed, 1000.0);
        assert_eq!(tx.total_cost, Decimal::from(1_500_000));
        assert_eq!(tx.stop_meter_value, Some(2000.0));
        assert!(ledger.active_for(CP, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_starts_on_one_connector() {
        let (storage, ledger) = setup().await;
        let ledger = Arc::new(ledger);

        let a = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.start_transaction(CP, 1, "GOOD", 0.0).await })
        };
        let b = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.start_transaction(CP, 1, "ALSO-GOOD", 0.0).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let winners = results
            .iter()
            .filter(|r| matches!(r, Ok(o) if o.transaction_id > 0))
            .count();
        let busy = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::ConnectorBusy { .. })))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(busy, 1);
        assert_eq!(storage.transactions().find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_connectors_stay_independent() {
        let (_, ledger) = setup().await;
        let a = ledger.start_transaction(CP, 1, "GOOD", 0.0).await.unwrap();
        let b = ledger.start_transaction(CP, 2, "GOOD", 0.0).await.unwrap();
        assert!(a.transaction_id > 0 && b.transaction_id > 0);
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[tokio::test]
    async fn stop_checks_existence_and_ownership() {
        let (_, ledger) = setup().await;
        assert!(matches!(
            ledger.stop_transaction(CP, 999, 0.0, None).await,
            Err(DomainError::NotFound { .. })
        ));

        let id = ledger
            .start_transaction(CP, 1, "GOOD", 0.0)
            .await
            .unwrap()
            .transaction_id;
        assert!(matches!(
            ledger.stop_transaction(2, id, 10.0, None).await,
            Err(DomainError::Mismatch { .. })
        ));
        assert!(ledger.get(id).await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn repeated_stop_is_acknowledged_without_mutation() {
        let (_, ledger) = setup().await;
        let id = ledger
            .start_transaction(CP, 1, "GOOD", 0.0)
            .await
            .unwrap()
            .transaction_id;
        ledger.stop_transaction(CP, id, 100.0, None).await.unwrap();
        let first = ledger.get(id).await.unwrap().unwrap();

        let again = ledger.stop_transaction(CP, id, 500.0, None).await.unwrap();
        assert!(again.already_completed);
        assert_eq!(ledger.get(id).await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn meter_values_after_stop_are_ignored() {
        let (_, ledger) = setup().await;
        let id = ledger
            .start_transaction(CP, 1, "GOOD", 0.0)
            .await
            .unwrap()
            .transaction_id;
        ledger.stop_transaction(CP, id, 100.0, None).await.unwrap();
        let update = ledger
            .apply_meter_values(CP, 1, Some(id), &energy_sample("900", Some("Wh")))
            .await
            .unwrap();
        assert_eq!(update, MeterUpdate::Ignored);
        assert_eq!(ledger.get(id).await.unwrap().unwrap().current_meter_value, 100.0);
    }

    /// Stalls the first transaction lookup once armed, so a meter update
    /// can read the record and then lose the race to a stop.
    struct StalledLookup {
        inner: InMemoryStorage,
        armed: AtomicBool,
    }

    #[async_trait::async_trait]
    impl TransactionRepository for StalledLookup {
        async fn insert(&self, tx: Transaction) -> DomainResult<Transaction> {
            self.inner.transactions().insert(tx).await
        }
        async fn find_by_id(&self, id: i32) -> DomainResult<Option<Transaction>> {
            self.inner.transactions().find_by_id(id).await
        }
        async fn find_by_transaction_id(
            &self,
            transaction_id: i32,
        ) -> DomainResult<Option<Transaction>> {
            let found = self.inner.transactions().find_by_transaction_id(transaction_id).await;
            if self.armed.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            found
        }
        async fn find_active_for_connector(
            &self,
            charge_point_id: i32,
            connector_id: u32,
        ) -> DomainResult<Option<Transaction>> {
            self.inner
                .transactions()
                .find_active_for_connector(charge_point_id, connector_id)
                .await
        }
        async fn update(&self, tx: Transaction) -> DomainResult<()> {
            self.inner.transactions().update(tx).await
        }
        async fn find_by_charge_point(&self, charge_point_id: i32) -> DomainResult<Vec<Transaction>> {
            self.inner.transactions().find_by_charge_point(charge_point_id).await
        }
        async fn find_all(&self) -> DomainResult<Vec<Transaction>> {
            self.inner.transactions().find_all().await
        }
    }

    impl RepositoryProvider for StalledLookup {
        fn charge_points(&self) -> &dyn ChargePointRepository {
            self.inner.charge_points()
        }
        fn connectors(&self) -> &dyn ConnectorRepository {
            self.inner.connectors()
        }
        fn id_tags(&self) -> &dyn IdTagRepository {
            self.inner.id_tags()
        }
        fn transactions(&self) -> &dyn TransactionRepository {
            self
        }
    }

    #[tokio::test]
    async fn stale_meter_update_cannot_undo_a_stop() {
        let storage = Arc::new(StalledLookup {
            inner: InMemoryStorage::new(),
            armed: AtomicBool::new(false),
        });
        storage.inner.id_tags().insert(IdTag::new("GOOD")).await.unwrap();
        let gate = Arc::new(AuthorizationGate::new(storage.clone()));
        let ledger = Arc::new(TransactionLedger::new(storage.clone(), gate, Decimal::from(1500)));

        let id = ledger
            .start_transaction(CP, 1, "GOOD", 1000.0)
            .await
            .unwrap()
            .transaction_id;

        storage.armed.store(true, Ordering::SeqCst);
        let meter = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .apply_meter_values(CP, 1, Some(id), &energy_sample("1500", Some("Wh")))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let stopped = ledger.stop_transaction(CP, id, 2000.0, None).await.unwrap();
        assert_eq!(stopped.transaction.total_cost, Decimal::from(1_500_000));

        assert_eq!(meter.await.unwrap().unwrap(), MeterUpdate::Ignored);
        let tx = ledger.get(id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.stop_meter_value, Some(2000.0));
        assert_eq!(tx.total_cost, Decimal::from(1_500_000));
        assert!(ledger.active_for(CP, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unbillable_stop_leaves_transaction_open() {
        let (_, ledger) = setup().await;
        let id = ledger
            .start_transaction(CP, 1, "GOOD", 0.0)
            .await
            .unwrap()
            .transaction_id;
        assert!(matches!(
            ledger.stop_transaction(CP, id, f64::INFINITY, None).await,
            Err(DomainError::Validation(_))
        ));
        assert!(ledger.get(id).await.unwrap().unwrap().is_active());
    }

    #[test]
    fn non_finite_samples_are_skipped() {
        let samples = vec![MeterValue {
            timestamp: None,
            sampled_value: vec![
                SampledValue {
                    value: "NaN".into(),
                    ..Default::default()
                },
                SampledValue {
                    value: "2500".into(),
                    ..Default::default()
                },
            ],
        }];
        assert_eq!(TransactionLedger::latest_reading(&samples, 1), Some(2.5));
    }

    #[tokio::test]
    async fn meter_values_without_transaction_are_informational() {
        let (_, ledger) = setup().await;
        let update = ledger
            .apply_meter_values(CP, 1, None, &energy_sample("1", None))
            .await
            .unwrap();
        assert_eq!(update, MeterUpdate::Informational);
    }

    #[test]
    fn reading_skips_unparseable_and_foreign_measurands() {
        let samples = vec![
            MeterValue {
                timestamp: None,
                sampled_value: vec![SampledValue {
                    value: "7".into(),
                    unit: Some("kWh".into()),
                    ..Default::default()
                }],
            },
            MeterValue {
                timestamp: None,
                sampled_value: vec![
                    SampledValue {
                        value: "230".into(),
                        measurand: Some("Voltage".into()),
                        unit: Some("V".into()),
                        ..Default::default()
                    },
                    SampledValue {
                        value: "n/a".into(),
                        ..Default::default()
                    },
                    SampledValue {
                        value: "3.2".into(),
                        measurand: Some(POWER_IMPORT.into()),
                        unit: Some("kW".into()),
                        ..Default::default()
                    },
                ],
            },
        ];
        // Only the last group counts
        assert_eq!(TransactionLedger::latest_reading(&samples, 1), Some(3.2));
        assert_eq!(TransactionLedger::latest_reading(&[], 1), None);
    }
}
