//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `DomainResult`: standard result type for domain operations

use super::charge_point::ChargePointRepository;
use super::connector::ConnectorRepository;
use super::id_tag::IdTagRepository;
use super::transaction::TransactionRepository;

pub use crate::shared::errors::DomainResult;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let cp = repos.charge_points().find_by_code("CP001").await?;
///     let tx = repos.transactions().find_active_for_connector(cp.id, 1).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn charge_points(&self) -> &dyn ChargePointRepository;
    fn connectors(&self) -> &dyn ConnectorRepository;
    fn id_tags(&self) -> &dyn IdTagRepository;
    fn transactions(&self) -> &dyn TransactionRepository;
}
