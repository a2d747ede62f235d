//! Application services

mod authorization;
mod charge_point;
mod connector;
mod transaction;

pub use authorization::{AuthorizationGate, IdTagInfo};
pub use charge_point::{
    BootNotificationResult, ChargePointRegistry, DEFAULT_CONNECTOR_ID,
};
pub use connector::{ConnectorTracker, StatusReport};
pub use transaction::{
    MeterUpdate, MeterValue, SampledValue, StartOutcome, StopOutcome, TransactionLedger,
};
