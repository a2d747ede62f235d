//! StopTransaction handler

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::application::handlers::{ActionContext, ActionError, ActionHandler, ActionResult};
use crate::shared::{Fields, OcppErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub struct StopTransactionRequest {
    pub transaction_id: i32,
    pub meter_stop: f64,
    pub id_tag: Option<String>,
    pub reason: Option<String>,
}

impl StopTransactionRequest {
    /// `transactionId` and `meterStop` drive billing and must be present.
    pub fn from_payload(payload: &Value) -> Result<Self, ActionError> {
        let f = Fields::of(payload);
        let transaction_id = f
            .int("transactionId")
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| {
                ActionError::fault(
                    OcppErrorCode::OccurrenceConstraintViolation,
                    "transactionId is required",
                )
            })?;
        let meter_stop = f.float("meterStop").ok_or_else(|| {
            ActionError::fault(
                OcppErrorCode::OccurrenceConstraintViolation,
                "meterStop is required",
            )
        })?;

        Ok(Self {
            transaction_id,
            meter_stop,
            id_tag: f.opt_str("idTag"),
            reason: f.opt_str("reason"),
        })
    }
}

pub struct StopTransactionHandler;

#[async_trait]
impl ActionHandler for StopTransactionHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let req = StopTransactionRequest::from_payload(payload)?;
        let charge_point = ctx.charge_point().await?;

        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            transaction_id = req.transaction_id,
            meter_stop = req.meter_stop,
            id_tag = req.id_tag.as_deref().unwrap_or(""),
            reason = req.reason.as_deref().unwrap_or(""),
            "StopTransaction"
        );

        ctx.services
            .ledger
            .stop_transaction(
                charge_point.id,
                req.transaction_id,
                req.meter_stop,
                req.reason,
            )
            .await
            .map_err(|e| {
                error!(
                    charge_point_id = ctx.charge_point_id.as_str(),
                    transaction_id = req.transaction_id,
                    error = %e,
                    "Failed to stop transaction"
                );
                e
            })?;

        Ok(json!({ "status": "Accepted" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_stop_fields() {
        let req = StopTransactionRequest::from_payload(&json!({
            "transactionId": 7,
            "meterStop": 2000,
            "reason": "EVDisconnected",
            "transactionData": [
                {"timestamp": "2024-01-01T00:00:00Z", "sampledValue": [{"value": "2000"}]}
            ]
        }))
        .unwrap();
        assert_eq!(req.transaction_id, 7);
        assert_eq!(req.meter_stop, 2000.0);
        assert_eq!(req.reason.as_deref(), Some("EVDisconnected"));
        assert_eq!(req.id_tag, None);
    }

    #[test]
    fn missing_transaction_id_is_a_fault() {
        assert!(matches!(
            StopTransactionRequest::from_payload(&json!({"meterStop": 1})),
            Err(ActionError::Fault { .. })
        ));
        assert!(matches!(
            StopTransactionRequest::from_payload(&json!({"transactionId": 1})),
            Err(ActionError::Fault { .. })
        ));
    }

    #[test]
    fn non_numeric_meter_stop_is_a_fault() {
        assert!(matches!(
            StopTransactionRequest::from_payload(&json!({"transactionId": 1, "meterStop": "NaN"})),
            Err(ActionError::Fault { .. })
        ));
    }
}
