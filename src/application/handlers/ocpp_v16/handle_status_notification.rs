//! StatusNotification handler

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::application::handlers::{ActionContext, ActionHandler, ActionResult};
use crate::application::services::StatusReport;
use crate::shared::Fields;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusNotificationRequest(pub StatusReport);

impl StatusNotificationRequest {
    pub fn from_payload(payload: &Value) -> Self {
        let f = Fields::of(payload);
        Self(StatusReport {
            connector_id: f
                .int("connectorId")
                .and_then(|id| u32::try_from(id).ok())
                .unwrap_or(0),
            status: f.str("status"),
            error_code: f.opt_str("errorCode"),
            info: f.opt_str("info"),
            vendor_id: f.opt_str("vendorId"),
            vendor_error_code: f.opt_str("vendorErrorCode"),
            timestamp: f.time("timestamp"),
        })
    }
}

pub struct StatusNotificationHandler;

#[async_trait]
impl ActionHandler for StatusNotificationHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let StatusNotificationRequest(report) = StatusNotificationRequest::from_payload(payload);
        let charge_point = ctx.charge_point().await?;

        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            connector_id = report.connector_id,
            status = report.status.as_str(),
            error_code = report.error_code.as_deref().unwrap_or(""),
            "StatusNotification"
        );

        let connector_id = report.connector_id;
        if let Err(e) = ctx
            .services
            .connectors
            .apply_status_notification(charge_point.id, report)
            .await
        {
            error!(
                charge_point_id = ctx.charge_point_id.as_str(),
                connector_id,
                error = %e,
                "Failed to store connector status"
            );
        }

        Ok(json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_connector_defaults_to_station() {
        let StatusNotificationRequest(report) =
            StatusNotificationRequest::from_payload(&json!({"status": "Available"}));
        assert_eq!(report.connector_id, 0);
        assert_eq!(report.status, "Available");
        assert_eq!(report.error_code, None);
    }
}
