//! OCPP 1.6 action handlers
//!
//! Each handler reads its request with total field extraction
//! (`shared::payload::Fields`) so that loose devices are still served,
//! then answers with a camelCase response struct.

use serde::Serialize;

use super::ActionTable;
use crate::application::services::IdTagInfo;
use crate::shared::format_wire_time;

mod handle_authorize;
mod handle_boot_notification;
mod handle_data_transfer;
mod handle_diagnostics_status_notification;
mod handle_firmware_status_notification;
mod handle_heartbeat;
mod handle_meter_values;
mod handle_start_transaction;
mod handle_status_notification;
mod handle_stop_transaction;

pub use handle_authorize::AuthorizeHandler;
pub use handle_boot_notification::BootNotificationHandler;
pub use handle_data_transfer::DataTransferHandler;
pub use handle_diagnostics_status_notification::DiagnosticsStatusNotificationHandler;
pub use handle_firmware_status_notification::FirmwareStatusNotificationHandler;
pub use handle_heartbeat::HeartbeatHandler;
pub use handle_meter_values::MeterValuesHandler;
pub use handle_start_transaction::StartTransactionHandler;
pub use handle_status_notification::StatusNotificationHandler;
pub use handle_stop_transaction::StopTransactionHandler;

impl ActionTable {
    /// Actions a charge point may initiate under OCPP 1.6.
    pub fn v16() -> Self {
        Self::new()
            .register("Authorize", AuthorizeHandler)
            .register("BootNotification", BootNotificationHandler)
            .register("DataTransfer", DataTransferHandler)
            .register(
                "DiagnosticsStatusNotification",
                DiagnosticsStatusNotificationHandler,
            )
            .register("FirmwareStatusNotification", FirmwareStatusNotificationHandler)
            .register("Heartbeat", HeartbeatHandler)
            .register("MeterValues", MeterValuesHandler)
            .register("StartTransaction", StartTransactionHandler)
            .register("StatusNotification", StatusNotificationHandler)
            .register("StopTransaction", StopTransactionHandler)
    }
}

/// `idTagInfo` as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdTagInfoPayload {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id_tag: Option<String>,
}

impl From<&IdTagInfo> for IdTagInfoPayload {
    fn from(info: &IdTagInfo) -> Self {
        Self {
            status: info.status.as_str().to_string(),
            expiry_date: info.expiry_date.as_ref().map(format_wire_time),
            parent_id_tag: info.parent_id_tag.clone(),
        }
    }
}
