//! IdTag repository interface

use async_trait::async_trait;

use super::model::IdTag;
use crate::domain::DomainResult;

#[async_trait]
pub trait IdTagRepository: Send + Sync {
    /// Store a new tag, returning it with its assigned `id`.
    /// Fails with `Conflict` if the tag string is already taken.
    async fn insert(&self, id_tag: IdTag) -> DomainResult<IdTag>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<IdTag>>;
    async fn find_by_tag(&self, tag: &str) -> DomainResult<Option<IdTag>>;
    async fn update(&self, id_tag: IdTag) -> DomainResult<()>;
    async fn delete(&self, id: i32) -> DomainResult<()>;
    async fn find_all(&self) -> DomainResult<Vec<IdTag>>;
}
