//! MeterValues handler

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::application::handlers::{ActionContext, ActionHandler, ActionResult};
use crate::application::services::{MeterUpdate, MeterValue, SampledValue};
use crate::shared::Fields;

#[derive(Debug, Clone, PartialEq)]
pub struct MeterValuesRequest {
    pub connector_id: u32,
    pub transaction_id: Option<i32>,
    pub meter_value: Vec<MeterValue>,
}

impl MeterValuesRequest {
    pub fn from_payload(payload: &Value) -> Self {
        let f = Fields::of(payload);
        Self {
            connector_id: f
                .int("connectorId")
                .and_then(|id| u32::try_from(id).ok())
                .unwrap_or(0),
            transaction_id: f.int("transactionId").and_then(|id| i32::try_from(id).ok()),
            meter_value: parse_meter_values(f.array("meterValue")),
        }
    }
}

/// Meter value groups as sent in `meterValue` / `transactionData`.
fn parse_meter_values(values: &[Value]) -> Vec<MeterValue> {
    values
        .iter()
        .map(|group| {
            let g = Fields::of(group);
            MeterValue {
                timestamp: g.time("timestamp"),
                sampled_value: g.array("sampledValue").iter().map(parse_sampled_value).collect(),
            }
        })
        .collect()
}

fn parse_sampled_value(value: &Value) -> SampledValue {
    let f = Fields::of(value);
    // Some devices send the reading as a JSON number
    let reading = f
        .opt_str("value")
        .or_else(|| f.float("value").map(|v| v.to_string()))
        .unwrap_or_default();
    SampledValue {
        value: reading,
        context: f.opt_str("context"),
        format: f.opt_str("format"),
        measurand: f.opt_str("measurand"),
        phase: f.opt_str("phase"),
        location: f.opt_str("location"),
        unit: f.opt_str("unit"),
    }
}

pub struct MeterValuesHandler;

#[async_trait]
impl ActionHandler for MeterValuesHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let req = MeterValuesRequest::from_payload(payload);
        let charge_point = ctx.charge_point().await?;

        debug!(
            charge_point_id = ctx.charge_point_id.as_str(),
            connector_id = req.connector_id,
            transaction_id = ?req.transaction_id,
            groups = req.meter_value.len(),
            "MeterValues"
        );

        match ctx
            .services
            .ledger
            .apply_meter_values(
                charge_point.id,
                req.connector_id,
                req.transaction_id,
                &req.meter_value,
            )
            .await
        {
            Ok(MeterUpdate::Recorded {
                transaction_id,
                reading_kwh,
            }) => info!(
                charge_point_id = ctx.charge_point_id.as_str(),
                transaction_id,
                reading_kwh,
                "Meter reading applied"
            ),
            Ok(update) => debug!(
                charge_point_id = ctx.charge_point_id.as_str(),
                ?update,
                "Meter values not applied"
            ),
            Err(e) => error!(
                charge_point_id = ctx.charge_point_id.as_str(),
                transaction_id = ?req.transaction_id,
                error = %e,
                "Failed to apply meter values"
            ),
        }

        Ok(json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_samples() {
        let req = MeterValuesRequest::from_payload(&json!({
            "connectorId": 1,
            "transactionId": 5,
            "meterValue": [{
                "timestamp": "2024-01-01T00:00:00Z",
                "sampledValue": [
                    {"value": "1500", "measurand": "Energy.Active.Import.Register", "unit": "Wh"},
                    {"value": 230.5, "measurand": "Voltage", "unit": "V"}
                ]
            }]
        }));
        assert_eq!(req.connector_id, 1);
        assert_eq!(req.transaction_id, Some(5));
        let samples = &req.meter_value[0].sampled_value;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].unit.as_deref(), Some("Wh"));
        assert_eq!(samples[1].value, "230.5");
    }

    #[test]
    fn missing_transaction_id_is_none() {
        let req = MeterValuesRequest::from_payload(&json!({"connectorId": 2}));
        assert_eq!(req.transaction_id, None);
        assert!(req.meter_value.is_empty());
    }
}
