//! DiagnosticsStatusNotification handler

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::application::handlers::{ActionContext, ActionHandler, ActionResult};
use crate::shared::Fields;

pub struct DiagnosticsStatusNotificationHandler;

#[async_trait]
impl ActionHandler for DiagnosticsStatusNotificationHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            status = Fields::of(payload).str("status").as_str(),
            "DiagnosticsStatusNotification"
        );
        Ok(json!({}))
    }
}
