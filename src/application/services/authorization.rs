//! Identity-tag authorization

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{DomainResult, IdTag, IdTagStatus, RepositoryProvider};

/// Authorization verdict for a presented tag
#[derive(Debug, Clone, PartialEq)]
pub struct IdTagInfo {
    pub status: IdTagStatus,
    pub expiry_date: Option<DateTime<Utc>>,
    pub parent_id_tag: Option<String>,
}

impl IdTagInfo {
    pub fn with_status(status: IdTagStatus) -> Self {
        Self {
            status,
            expiry_date: None,
            parent_id_tag: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == IdTagStatus::Accepted
    }
}

/// Resolves tags against stored records. Both Authorize and the start of a
/// transaction go through this gate.
pub struct AuthorizationGate {
    repos: Arc<dyn RepositoryProvider>,
}

impl AuthorizationGate {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Verdict for a stored record (or its absence) at `now`.
    ///
    /// Unknown tags are `Invalid`. A non-Accepted stored status is returned
    /// as-is. An Accepted tag whose expiry has passed is `Expired`.
    pub fn resolve(tag: Option<&IdTag>, now: DateTime<Utc>) -> IdTagInfo {
        let Some(tag) = tag else {
            return IdTagInfo::with_status(IdTagStatus::Invalid);
        };

        let status = if tag.status != IdTagStatus::Accepted {
            tag.status
        } else if tag.is_expired_at(now) {
            IdTagStatus::Expired
        } else {
            IdTagStatus::Accepted
        };

        IdTagInfo {
            status,
            expiry_date: tag.expiry_date.filter(|e| e.timestamp() != 0),
            parent_id_tag: tag.parent_id_tag.clone(),
        }
    }

    pub async fn authorize(&self, tag: &str) -> DomainResult<IdTagInfo> {
        self.authorize_at(tag, Utc::now()).await
    }

    pub async fn authorize_at(&self, tag: &str, now: DateTime<Utc>) -> DomainResult<IdTagInfo> {
        let stored = self.repos.id_tags().find_by_tag(tag).await?;
        let info = Self::resolve(stored.as_ref(), now);
        debug!(id_tag = tag, status = info.status.as_str(), "Resolved id tag");
        Ok(info)
    }

    /// Stored record for a tag, if any.
    pub async fn lookup(&self, tag: &str) -> DomainResult<Option<IdTag>> {
        self.repos.id_tags().find_by_tag(tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryStorage;
    use chrono::Duration;

    async fn gate_with(tags: Vec<IdTag>) -> AuthorizationGate {
        let storage = Arc::new(InMemoryStorage::new());
        for tag in tags {
            storage.id_tags().insert(tag).await.unwrap();
        }
        AuthorizationGate::new(storage)
    }

    #[tokio::test]
    async fn unknown_tag_is_invalid() {
        let gate = gate_with(vec![]).await;
        let info = gate.authorize("NOPE").await.unwrap();
        assert_eq!(info.status, IdTagStatus::Invalid);
        assert!(info.expiry_date.is_none());
    }

    #[tokio::test]
    async fn stored_status_wins_over_expiry() {
        let past = Utc::now() - Duration::days(1);
        let gate = gate_with(vec![IdTag::new("B")
            .with_status(IdTagStatus::Blocked)
            .with_expiry(past)])
        .await;
        assert_eq!(gate.authorize("B").await.unwrap().status, IdTagStatus::Blocked);
    }

    #[tokio::test]
    async fn expired_tag_echoes_expiry() {
        let now = Utc::now();
        let expiry = now - Duration::hours(1);
        let gate = gate_with(vec![IdTag::new("E").with_expiry(expiry)]).await;
        let info = gate.authorize_at("E", now).await.unwrap();
        assert_eq!(info.status, IdTagStatus::Expired);
        assert_eq!(info.expiry_date, Some(expiry));
    }

    #[tokio::test]
    async fn accepted_tag_carries_expiry_and_parent() {
        let now = Utc::now();
        let expiry = now + Duration::days(30);
        let mut tag = IdTag::new("A").with_expiry(expiry);
        tag.parent_id_tag = Some("GROUP".into());
        let gate = gate_with(vec![tag]).await;

        let info = gate.authorize_at("A", now).await.unwrap();
        assert!(info.is_accepted());
        assert_eq!(info.expiry_date, Some(expiry));
        assert_eq!(info.parent_id_tag.as_deref(), Some("GROUP"));
    }

    #[test]
    fn resolve_is_pure() {
        let now = Utc::now();
        let tag = IdTag::new("X").with_expiry(now);
        // Expiry equal to now has not passed yet
        assert_eq!(AuthorizationGate::resolve(Some(&tag), now).status, IdTagStatus::Accepted);
        assert_eq!(
            AuthorizationGate::resolve(Some(&tag), now + Duration::seconds(1)).status,
            IdTagStatus::Expired
        );
    }
}
