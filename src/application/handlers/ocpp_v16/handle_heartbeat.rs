//! Heartbeat handler

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::handlers::{reply, ActionContext, ActionHandler, ActionResult};
use crate::shared::format_wire_time;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatResponse {
    current_time: String,
}

pub struct HeartbeatHandler;

#[async_trait]
impl ActionHandler for HeartbeatHandler {
    async fn handle(&self, ctx: &ActionContext, _payload: &Value) -> ActionResult {
        let at = ctx
            .services
            .registry
            .record_heartbeat(&ctx.charge_point_id)
            .await
            .map_err(|e| {
                warn!(
                    charge_point_id = ctx.charge_point_id.as_str(),
                    error = %e,
                    "Heartbeat not recorded"
                );
                e
            })?;

        debug!(charge_point_id = ctx.charge_point_id.as_str(), "Heartbeat");

        reply(&HeartbeatResponse {
            current_time: format_wire_time(&at),
        })
    }
}
