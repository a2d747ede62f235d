//! OCPP 1.6 session
//!
//! Decodes raw OCPP-J frames for one connected station, dispatches calls
//! through the shared action table and encodes the reply.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{ActionContext, ActionError, ActionTable, Services};
use crate::shared::OcppFrame;

/// Protocol state for one station connection
pub struct OcppSession {
    ctx: ActionContext,
    table: Arc<ActionTable>,
}

impl OcppSession {
    pub fn new(
        charge_point_id: impl Into<String>,
        table: Arc<ActionTable>,
        services: Arc<Services>,
    ) -> Self {
        Self {
            ctx: ActionContext::new(charge_point_id, services),
            table,
        }
    }

    pub fn charge_point_id(&self) -> &str {
        &self.ctx.charge_point_id
    }

    /// Handle one text frame. Returns the reply to write, if any.
    pub async fn handle_text(&self, text: &str) -> Option<String> {
        debug!(
            charge_point_id = self.charge_point_id(),
            "Received raw message: {}", text
        );

        let frame = match OcppFrame::parse(text) {
            Ok(f) => f,
            Err(e) => {
                error!(
                    charge_point_id = self.charge_point_id(),
                    error = %e,
                    raw = text,
                    "Failed to parse OCPP message"
                );
                counter!("ocpp_frames_dropped_total", "reason" => "malformed").increment(1);
                return None;
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => self.handle_call(&unique_id, &action, &payload).await,

            OcppFrame::CallResult { unique_id, .. } => {
                info!(
                    charge_point_id = self.charge_point_id(),
                    message_id = unique_id.as_str(),
                    "Received CallResult with no outstanding request"
                );
                None
            }

            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                warn!(
                    charge_point_id = self.charge_point_id(),
                    message_id = unique_id.as_str(),
                    error_code = error_code.as_str(),
                    error_description = error_description.as_str(),
                    "Received CallError"
                );
                None
            }
        }
    }

    async fn handle_call(&self, unique_id: &str, action: &str, payload: &Value) -> Option<String> {
        let Some(handler) = self.table.get(action) else {
            warn!(
                charge_point_id = self.charge_point_id(),
                action,
                message_id = unique_id,
                "Unknown OCPP 1.6 action, ignoring"
            );
            counter!("ocpp_frames_dropped_total", "reason" => "unknown_action").increment(1);
            return None;
        };

        counter!("ocpp_calls_total", "action" => action.to_string()).increment(1);

        let response = match handler.handle(&self.ctx, payload).await {
            Ok(payload) => OcppFrame::result_response(unique_id, payload),
            Err(ActionError::Fault { code, description }) => {
                warn!(
                    charge_point_id = self.charge_point_id(),
                    action,
                    message_id = unique_id,
                    error_code = code.as_str(),
                    description = description.as_str(),
                    "Rejecting call"
                );
                counter!("ocpp_call_errors_total", "action" => action.to_string()).increment(1);
                OcppFrame::error_response(unique_id, code, description)
            }
            Err(ActionError::Dropped(e)) => {
                warn!(
                    charge_point_id = self.charge_point_id(),
                    action,
                    message_id = unique_id,
                    error = %e,
                    "Dropping call without reply"
                );
                counter!("ocpp_frames_dropped_total", "reason" => "handler").increment(1);
                return None;
            }
        };

        Some(response.serialize())
    }
}
