//! Authorize handler

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::IdTagInfoPayload;
use crate::application::handlers::{reply, ActionContext, ActionHandler, ActionResult};
use crate::shared::Fields;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizeRequest {
    pub id_tag: String,
}

impl AuthorizeRequest {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            id_tag: Fields::of(payload).str("idTag"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeResponse {
    id_tag_info: IdTagInfoPayload,
}

pub struct AuthorizeHandler;

#[async_trait]
impl ActionHandler for AuthorizeHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let req = AuthorizeRequest::from_payload(payload);

        let info = ctx.services.gate.authorize(&req.id_tag).await.map_err(|e| {
            error!(
                charge_point_id = ctx.charge_point_id.as_str(),
                id_tag = req.id_tag.as_str(),
                error = %e,
                "Authorization lookup failed"
            );
            e
        })?;

        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            id_tag = req.id_tag.as_str(),
            status = info.status.as_str(),
            "Authorize"
        );

        reply(&AuthorizeResponse {
            id_tag_info: IdTagInfoPayload::from(&info),
        })
    }
}
