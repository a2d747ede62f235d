//! Transaction aggregate
//!
//! Contains the Transaction entity, its status, and repository interface.

pub mod model;
pub mod repository;

pub use model::{Transaction, TransactionStatus};
pub use repository::TransactionRepository;
