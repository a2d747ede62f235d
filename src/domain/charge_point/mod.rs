//! Charge Point aggregate
//!
//! Contains the ChargePoint entity, boot metadata, and repository interface.

pub mod model;
pub mod repository;

pub use model::{BootInfo, ChargePoint, ChargePointStatus};
pub use repository::ChargePointRepository;
