//! Per-connector status tracking

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{Connector, ConnectorStatus, DomainResult, RepositoryProvider};

/// Status reported by a station for one of its connectors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    pub connector_id: u32,
    pub status: String,
    pub error_code: Option<String>,
    pub info: Option<String>,
    pub vendor_id: Option<String>,
    pub vendor_error_code: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

pub struct ConnectorTracker {
    repos: Arc<dyn RepositoryProvider>,
}

impl ConnectorTracker {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Upsert the connector's reported state. Connector 0 (the station as a
    /// whole) is stored like any other index.
    pub async fn apply_status_notification(
        &self,
        charge_point_id: i32,
        report: StatusReport,
    ) -> DomainResult<Connector> {
        let connectors = self.repos.connectors();
        let existing = connectors
            .find_by_charge_point_and_connector(charge_point_id, report.connector_id)
            .await?;
        let is_new = existing.is_none();

        let mut connector =
            existing.unwrap_or_else(|| Connector::new(charge_point_id, report.connector_id));
        connector.status = ConnectorStatus::from(report.status.as_str());
        connector.error_code = report.error_code;
        connector.info = report.info;
        connector.vendor_id = report.vendor_id;
        connector.vendor_error_code = report.vendor_error_code;
        connector.updated_at = Utc::now();

        let connector = if is_new {
            connectors.insert(connector).await?
        } else {
            connectors.update(connector.clone()).await?;
            connector
        };

        debug!(
            charge_point_id,
            connector_id = connector.connector_id,
            status = connector.status.as_str(),
            "Connector status stored"
        );
        Ok(connector)
    }

    pub async fn get(
        &self,
        charge_point_id: i32,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>> {
        self.repos
            .connectors()
            .find_by_charge_point_and_connector(charge_point_id, connector_id)
            .await
    }

    pub async fn list_for(&self, charge_point_id: i32) -> DomainResult<Vec<Connector>> {
        self.repos.connectors().find_by_charge_point(charge_point_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryStorage;

    fn report(connector_id: u32, status: &str) -> StatusReport {
        StatusReport {
            connector_id,
            status: status.into(),
            error_code: Some("NoError".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_then_updates_connector() {
        let tracker = ConnectorTracker::new(Arc::new(InMemoryStorage::new()));

        let created = tracker
            .apply_status_notification(1, report(2, "Preparing"))
            .await
            .unwrap();
        assert_eq!(created.status, ConnectorStatus::Preparing);

        tracker
            .apply_status_notification(1, report(2, "Charging"))
            .await
            .unwrap();

        let all = tracker.list_for(1).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, created.id);
        assert_eq!(all[0].status, ConnectorStatus::Charging);
        assert_eq!(all[0].error_code.as_deref(), Some("NoError"));
    }

    #[tokio::test]
    async fn vendor_status_is_stored_verbatim() {
        let tracker = ConnectorTracker::new(Arc::new(InMemoryStorage::new()));
        tracker
            .apply_status_notification(1, report(1, "VendorSpecific"))
            .await
            .unwrap();
        let c = tracker.get(1, 1).await.unwrap().unwrap();
        assert_eq!(c.status.as_str(), "VendorSpecific");
    }

    #[tokio::test]
    async fn station_level_connector_zero_is_recorded() {
        let tracker = ConnectorTracker::new(Arc::new(InMemoryStorage::new()));
        tracker
            .apply_status_notification(1, report(0, "Unavailable"))
            .await
            .unwrap();
        assert_eq!(
            tracker.get(1, 0).await.unwrap().map(|c| c.status),
            Some(ConnectorStatus::Unavailable)
        );
    }
}
