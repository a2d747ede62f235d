//! StartTransaction handler

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::IdTagInfoPayload;
use crate::application::handlers::{
    reply, ActionContext, ActionError, ActionHandler, ActionResult,
};
use crate::application::services::IdTagInfo;
use crate::domain::{DomainError, IdTagStatus};
use crate::shared::{Fields, OcppErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub struct StartTransactionRequest {
    pub connector_id: u32,
    pub id_tag: String,
    /// Wh; absent readings start at 0
    pub meter_start: f64,
    pub reservation_id: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StartTransactionRequest {
    /// `connectorId` is load-bearing and must be a positive integer.
    pub fn from_payload(payload: &Value) -> Result<Self, ActionError> {
        let f = Fields::of(payload);
        let connector_id = f
            .int("connectorId")
            .filter(|id| *id > 0)
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| {
                ActionError::fault(
                    OcppErrorCode::PropertyConstraintViolation,
                    "connectorId must be a positive integer",
                )
            })?;

        Ok(Self {
            connector_id,
            id_tag: f.str("idTag"),
            meter_start: f.float("meterStart").unwrap_or(0.0),
            reservation_id: f.int("reservationId"),
            timestamp: f.time("timestamp"),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartTransactionResponse {
    id_tag_info: IdTagInfoPayload,
    transaction_id: i32,
}

pub struct StartTransactionHandler;

#[async_trait]
impl ActionHandler for StartTransactionHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let req = StartTransactionRequest::from_payload(payload)?;
        let charge_point = ctx.charge_point().await?;

        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            connector_id = req.connector_id,
            id_tag = req.id_tag.as_str(),
            meter_start = req.meter_start,
            "StartTransaction"
        );

        let outcome = ctx
            .services
            .ledger
            .start_transaction(
                charge_point.id,
                req.connector_id,
                &req.id_tag,
                req.meter_start,
            )
            .await;

        let (info, transaction_id) = match outcome {
            Ok(outcome) => (outcome.id_tag_info, outcome.transaction_id),
            Err(DomainError::ConnectorBusy { .. }) => {
                warn!(
                    charge_point_id = ctx.charge_point_id.as_str(),
                    connector_id = req.connector_id,
                    "Connector already has an active transaction"
                );
                (IdTagInfo::with_status(IdTagStatus::ConcurrentTx), 0)
            }
            Err(e) => {
                error!(
                    charge_point_id = ctx.charge_point_id.as_str(),
                    connector_id = req.connector_id,
                    error = %e,
                    "Failed to start transaction"
                );
                return Err(e.into());
            }
        };

        reply(&StartTransactionResponse {
            id_tag_info: IdTagInfoPayload::from(&info),
            transaction_id,
        })
    }
}
