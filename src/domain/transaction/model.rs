//! Transaction domain entity

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::domain::{DomainError, DomainResult};

/// Wh per kWh; `meterStart` is always reported in Wh.
pub const WH_PER_KWH: f64 = 1000.0;

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    Completed,
    Cancelled,
    Failed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
            Self::Pending => "Pending",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        match s {
            "Active" => Self::Active,
            "Completed" => Self::Completed,
            "Cancelled" => Self::Cancelled,
            "Pending" => Self::Pending,
            _ => Self::Failed,
        }
    }
}

/// Charging transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Storage-assigned surrogate key
    pub id: i32,
    /// Protocol-visible id, minted by storage on insert
    pub transaction_id: i32,
    pub charge_point_id: i32,
    pub connector_id: u32,
    pub id_tag_id: i32,
    pub id_tag: String,
    /// Register reading at start, as reported by the device (Wh)
    pub start_meter_value: f64,
    pub stop_meter_value: Option<f64>,
    pub current_meter_value: f64,
    pub energy_consumed: f64,
    pub total_cost: Decimal,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub reason: Option<String>,
}

impl Transaction {
    /// A not-yet-stored active transaction (`id` and `transaction_id` are
    /// assigned on insert).
    pub fn start(
        charge_point_id: i32,
        connector_id: u32,
        id_tag_id: i32,
        id_tag: impl Into<String>,
        meter_start: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            transaction_id: 0,
            charge_point_id,
            connector_id,
            id_tag_id,
            id_tag: id_tag.into(),
            start_meter_value: meter_start,
            stop_meter_value: None,
            current_meter_value: meter_start,
            energy_consumed: 0.0,
            total_cost: Decimal::ZERO,
            start_time: at,
            stop_time: None,
            status: TransactionStatus::Active,
            reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Record a live reading already converted to kWh. The start baseline
    /// is normalized from Wh before subtracting.
    pub fn record_reading_kwh(&mut self, reading_kwh: f64) {
        self.current_meter_value = reading_kwh;
        self.energy_consumed = reading_kwh - self.start_meter_value / WH_PER_KWH;
    }

    /// Finalize the session. Energy is the register difference in the
    /// device's unit and the cost is that difference times the unit price.
    /// A stop reading that cannot be billed leaves the record untouched.
    pub fn complete(
        &mut self,
        meter_stop: f64,
        reason: Option<String>,
        at: DateTime<Utc>,
        price_per_unit: Decimal,
    ) -> DomainResult<()> {
        let energy = meter_stop - self.start_meter_value;
        let billable = Decimal::from_f64(energy).ok_or_else(|| {
            DomainError::Validation(format!(
                "meterStop {meter_stop} gives unbillable energy {energy}"
            ))
        })?;

        self.stop_meter_value = Some(meter_stop);
        self.current_meter_value = meter_stop;
        self.stop_time = Some(at);
        self.status = TransactionStatus::Completed;
        self.reason = reason;
        self.energy_consumed = energy;
        self.total_cost = billable * price_per_unit;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction::start(1, 1, 10, "TAG-001", 1000.0, Utc::now())
    }

    #[test]
    fn new_transaction_is_active() {
        let tx = sample_tx();
        assert!(tx.is_active());
        assert_eq!(tx.start_meter_value, 1000.0);
        assert_eq!(tx.current_meter_value, 1000.0);
        assert!(tx.stop_meter_value.is_none());
        assert!(tx.stop_time.is_none());
        assert_eq!(tx.total_cost, Decimal::ZERO);
    }

    #[test]
    fn reading_uses_normalized_baseline() {
        let mut tx = sample_tx();
        tx.record_reading_kwh(1.5);
        assert_eq!(tx.current_meter_value, 1.5);
        assert!((tx.energy_consumed - 0.5).abs() < 1e-9);
    }

    #[test]
    fn complete_computes_energy_and_cost() {
        let mut tx = sample_tx();
        tx.record_reading_kwh(1.5);
        tx.complete(2000.0, Some("Local".into()), Utc::now(), Decimal::from(1500))
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.stop_meter_value, Some(2000.0));
        assert_eq!(tx.current_meter_value, 2000.0);
        assert_eq!(tx.energy_consumed, 1000.0);
        assert_eq!(tx.total_cost, Decimal::from(1_500_000));
        assert_eq!(tx.reason.as_deref(), Some("Local"));
        assert!(tx.stop_time.is_some());
        assert!(!tx.is_active());
    }

    #[test]
    fn unbillable_stop_reading_leaves_record_active() {
        let mut tx = sample_tx();
        let err = tx
            .complete(f64::NAN, None, Utc::now(), Decimal::from(1500))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(tx.is_active());
        assert_eq!(tx.stop_meter_value, None);
        assert_eq!(tx.total_cost, Decimal::ZERO);
    }

    #[test]
    fn unknown_status_string_maps_to_failed() {
        assert_eq!(TransactionStatus::from("Completed"), TransactionStatus::Completed);
        assert_eq!(TransactionStatus::from("garbage"), TransactionStatus::Failed);
    }
}
