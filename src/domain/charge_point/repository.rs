//! Charge Point repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ChargePoint, ChargePointStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ChargePointRepository: Send + Sync {
    /// Store a new charge point, returning it with its assigned `id`.
    /// Fails with `Conflict` if the code is already taken.
    async fn insert(&self, charge_point: ChargePoint) -> DomainResult<ChargePoint>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargePoint>>;
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<ChargePoint>>;
    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()>;
    async fn update_status(&self, id: i32, status: ChargePointStatus) -> DomainResult<()>;
    async fn update_heartbeat(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()>;
    async fn delete(&self, id: i32) -> DomainResult<()>;
    async fn find_all(&self) -> DomainResult<Vec<ChargePoint>>;
}
