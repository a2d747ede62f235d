//! BootNotification handler

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::application::handlers::{reply, ActionContext, ActionHandler, ActionResult};
use crate::domain::BootInfo;
use crate::shared::{format_wire_time, Fields};

/// Station self-description sent on (re)boot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BootNotificationRequest {
    pub charge_point_vendor: String,
    pub charge_point_model: String,
    pub charge_point_serial_number: Option<String>,
    pub charge_box_serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub meter_type: Option<String>,
    pub meter_serial_number: Option<String>,
}

impl BootNotificationRequest {
    pub fn from_payload(payload: &Value) -> Self {
        let f = Fields::of(payload);
        Self {
            charge_point_vendor: f.str("chargePointVendor"),
            charge_point_model: f.str("chargePointModel"),
            charge_point_serial_number: f.opt_str("chargePointSerialNumber"),
            charge_box_serial_number: f.opt_str("chargeBoxSerialNumber"),
            firmware_version: f.opt_str("firmwareVersion"),
            iccid: f.opt_str("iccid"),
            imsi: f.opt_str("imsi"),
            meter_type: f.opt_str("meterType"),
            meter_serial_number: f.opt_str("meterSerialNumber"),
        }
    }

    pub fn into_boot_info(self) -> BootInfo {
        BootInfo {
            vendor: self.charge_point_vendor,
            model: self.charge_point_model,
            charge_point_serial_number: self.charge_point_serial_number,
            charge_box_serial_number: self.charge_box_serial_number,
            firmware_version: self.firmware_version,
            iccid: self.iccid,
            imsi: self.imsi,
            meter_type: self.meter_type,
            meter_serial_number: self.meter_serial_number,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BootNotificationResponse {
    status: &'static str,
    current_time: String,
    interval: u32,
}

pub struct BootNotificationHandler;

#[async_trait]
impl ActionHandler for BootNotificationHandler {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult {
        let req = BootNotificationRequest::from_payload(payload);

        info!(
            charge_point_id = ctx.charge_point_id.as_str(),
            vendor = req.charge_point_vendor.as_str(),
            model = req.charge_point_model.as_str(),
            firmware = req.firmware_version.as_deref().unwrap_or(""),
            "BootNotification"
        );

        let result = ctx
            .services
            .registry
            .register_or_update(&ctx.charge_point_id, &req.into_boot_info())
            .await
            .map_err(|e| {
                error!(
                    charge_point_id = ctx.charge_point_id.as_str(),
                    error = %e,
                    "Failed to register charge point"
                );
                e
            })?;

        reply(&BootNotificationResponse {
            status: "Accepted",
            current_time: format_wire_time(&result.current_time),
            interval: result.interval,
        })
    }
}
