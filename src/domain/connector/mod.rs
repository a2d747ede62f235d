//! Connector aggregate

pub mod model;
pub mod repository;

pub use model::{Connector, ConnectorStatus};
pub use repository::ConnectorRepository;
