//! Application layer: protocol handlers and the state services they drive.

pub mod handlers;
pub mod services;

pub use handlers::{
    ActionContext, ActionError, ActionHandler, ActionResult, ActionTable, OcppSession, Services,
};
pub use services::{
    AuthorizationGate, ChargePointRegistry, ConnectorTracker, IdTagInfo, TransactionLedger,
};
