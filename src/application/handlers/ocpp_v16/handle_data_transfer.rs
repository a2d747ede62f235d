//! DataTransfer handler
//!
//! No vendor extensions are implemented, so every transfer is answered
//! with `UnknownVendorId`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::application::handlers::{ActionContext, ActionHandler, ActionResult};
use crate::shared::Fields;

pub struct DataTransferHandler;

#[async_trait]
impl ActionHandler for DataTransferHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let f = Fields::of(payload);
        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            vendor_id = f.str("vendorId").as_str(),
            message_id = f.str("messageId").as_str(),
            "DataTransfer"
        );
        Ok(json!({ "status": "UnknownVendorId" }))
    }
}
