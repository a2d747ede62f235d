use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Connector {connector_id} of charge point {charge_point_id} already has an active transaction")]
    ConnectorBusy {
        charge_point_id: i32,
        connector_id: u32,
    },

    #[error("Transaction {transaction_id} does not belong to charge point {charge_point_id}")]
    Mismatch {
        transaction_id: i32,
        charge_point_id: i32,
    },

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        match e.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(msg)) => Self::Conflict(msg),
            _ => Self::Storage(e.to_string()),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
