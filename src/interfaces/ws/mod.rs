//! WebSocket transport for charge points

pub mod ocpp_server;

pub use ocpp_server::{extract_charge_point_id, OcppServer};
