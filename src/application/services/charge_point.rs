//! Charge point registration and liveness

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{
    BootInfo, ChargePoint, ChargePointStatus, Connector, DomainError, DomainResult,
    RepositoryProvider,
};

/// Connector index created for every newly registered station
pub const DEFAULT_CONNECTOR_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct BootNotificationResult {
    pub current_time: DateTime<Utc>,
    pub interval: u32,
    pub charge_point: ChargePoint,
}

/// Registry of known stations
pub struct ChargePointRegistry {
    repos: Arc<dyn RepositoryProvider>,
    heartbeat_interval: u32,
}

impl ChargePointRegistry {
    pub fn new(repos: Arc<dyn RepositoryProvider>, heartbeat_interval: u32) -> Self {
        Self {
            repos,
            heartbeat_interval,
        }
    }

    /// Create the station on first boot, otherwise overwrite its descriptive
    /// fields. Every boot is accepted.
    pub async fn register_or_update(
        &self,
        code: &str,
        info: &BootInfo,
    ) -> DomainResult<BootNotificationResult> {
        let now = Utc::now();
        let charge_points = self.repos.charge_points();

        let charge_point = match charge_points.find_by_code(code).await? {
            Some(cp) => self.reboot(cp, info, now).await?,
            None => {
                let mut cp = ChargePoint::new(code);
                cp.record_boot(info, now);
                cp.last_heartbeat = Some(now);
                match charge_points.insert(cp).await {
                    Ok(cp) => {
                        self.ensure_default_connector(cp.id).await?;
                        info!(
                            charge_point_id = code,
                            vendor = info.vendor.as_str(),
                            model = info.model.as_str(),
                            "Charge point registered"
                        );
                        cp
                    }
                    // A concurrent first boot won the insert
                    Err(DomainError::Conflict(_)) => {
                        let cp = self.require(code).await?;
                        self.reboot(cp, info, now).await?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(BootNotificationResult {
            current_time: now,
            interval: self.heartbeat_interval,
            charge_point,
        })
    }

    async fn reboot(
        &self,
        mut cp: ChargePoint,
        info: &BootInfo,
        now: DateTime<Utc>,
    ) -> DomainResult<ChargePoint> {
        cp.record_boot(info, now);
        self.repos.charge_points().update(cp.clone()).await?;
        info!(
            charge_point_id = cp.code.as_str(),
            vendor = info.vendor.as_str(),
            model = info.model.as_str(),
            "Charge point re-registered"
        );
        Ok(cp)
    }

    async fn ensure_default_connector(&self, charge_point_id: i32) -> DomainResult<()> {
        let connectors = self.repos.connectors();
        if connectors
            .find_by_charge_point_and_connector(charge_point_id, DEFAULT_CONNECTOR_ID)
            .await?
            .is_none()
        {
            match connectors
                .insert(Connector::new(charge_point_id, DEFAULT_CONNECTOR_ID))
                .await
            {
                Ok(_) | Err(DomainError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Record a heartbeat and return the server time stored with it.
    pub async fn record_heartbeat(&self, code: &str) -> DomainResult<DateTime<Utc>> {
        let cp = self.require(code).await?;
        let now = Utc::now();
        self.repos.charge_points().update_heartbeat(cp.id, now).await?;
        Ok(now)
    }

    pub async fn set_status(&self, id: i32, status: ChargePointStatus) -> DomainResult<()> {
        self.repos.charge_points().update_status(id, status).await?;
        info!(id, status = status.as_str(), "Charge point status set");
        Ok(())
    }

    pub async fn find_by_code(&self, code: &str) -> DomainResult<Option<ChargePoint>> {
        self.repos.charge_points().find_by_code(code).await
    }

    /// Station by code, `NotFound` when it never booted.
    pub async fn require(&self, code: &str) -> DomainResult<ChargePoint> {
        self.find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargePoint", "code", code))
    }

    pub async fn get(&self, id: i32) -> DomainResult<Option<ChargePoint>> {
        self.repos.charge_points().find_by_id(id).await
    }

    pub async fn list(&self) -> DomainResult<Vec<ChargePoint>> {
        self.repos.charge_points().find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ChargePointRepository, ConnectorRepository, ConnectorStatus, IdTagRepository,
        TransactionRepository,
    };
    use crate::infrastructure::InMemoryStorage;

    fn setup() -> (Arc<InMemoryStorage>, ChargePointRegistry) {
        let storage = Arc::new(InMemoryStorage::new());
        let registry = ChargePointRegistry::new(storage.clone(), 300);
        (storage, registry)
    }

    fn boot(vendor: &str, firmware: &str) -> BootInfo {
        BootInfo {
            vendor: vendor.into(),
            model: "M1".into(),
            firmware_version: Some(firmware.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_boot_creates_station_and_default_connector() {
        let (storage, registry) = setup();
        let result = registry
            .register_or_update("CP001", &boot("V", "1.0"))
            .await
            .unwrap();

        assert_eq!(result.interval, 300);

        let cp = registry.find_by_code("CP001").await.unwrap().unwrap();
        assert_eq!(cp.status, ChargePointStatus::Available);
        assert_eq!(cp.last_heartbeat, Some(result.current_time));
        assert_eq!(cp.last_boot_notification, Some(result.current_time));

        let connectors = storage.connectors().find_by_charge_point(cp.id).await.unwrap();
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].connector_id, DEFAULT_CONNECTOR_ID);
        assert_eq!(connectors[0].status, ConnectorStatus::Available);
    }

    #[tokio::test]
    async fn reboot_overwrites_metadata_and_keeps_one_record() {
        let (storage, registry) = setup();
        registry.register_or_update("CP001", &boot("V", "1.0")).await.unwrap();
        let cp = registry.require("CP001").await.unwrap();
        registry.set_status(cp.id, ChargePointStatus::Faulted).await.unwrap();

        registry.register_or_update("CP001", &boot("V", "2.0")).await.unwrap();

        let all = registry.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].firmware_version.as_deref(), Some("2.0"));
        assert_eq!(all[0].status, ChargePointStatus::Available);
        assert_eq!(
            storage.connectors().find_by_charge_point(cp.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn identical_reboot_changes_nothing_descriptive() {
        let (storage, registry) = setup();
        let info = boot("V", "1.0");
        let first = registry.register_or_update("CP001", &info).await.unwrap();
        let second = registry.register_or_update("CP001", &info).await.unwrap();

        assert_eq!(first.charge_point.id, second.charge_point.id);
        assert_eq!(second.charge_point.boot_info(), info);
        let all = registry.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].boot_info(), info);
        assert_eq!(
            storage
                .connectors()
                .find_by_charge_point(all[0].id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    /// Misses the first lookup, as a boot racing another first boot would.
    struct RacingFirstBoot {
        inner: InMemoryStorage,
        missed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl ChargePointRepository for RacingFirstBoot {
        async fn insert(&self, cp: ChargePoint) -> DomainResult<ChargePoint> {
            self.inner.charge_points().insert(cp).await
        }
        async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargePoint>> {
            self.inner.charge_points().find_by_id(id).await
        }
        async fn find_by_code(&self, code: &str) -> DomainResult<Option<ChargePoint>> {
            if !self.missed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.charge_points().find_by_code(code).await
        }
        async fn update(&self, cp: ChargePoint) -> DomainResult<()> {
            self.inner.charge_points().update(cp).await
        }
        async fn update_status(&self, id: i32, status: ChargePointStatus) -> DomainResult<()> {
            self.inner.charge_points().update_status(id, status).await
        }
        async fn update_heartbeat(&self, id: i32, at: DateTime<Utc>) -> DomainResult<()> {
            self.inner.charge_points().update_heartbeat(id, at).await
        }
        async fn delete(&self, id: i32) -> DomainResult<()> {
            self.inner.charge_points().delete(id).await
        }
        async fn find_all(&self) -> DomainResult<Vec<ChargePoint>> {
            self.inner.charge_points().find_all().await
        }
    }

    impl RepositoryProvider for RacingFirstBoot {
        fn charge_points(&self) -> &dyn ChargePointRepository {
            self
        }
        fn connectors(&self) -> &dyn ConnectorRepository {
            self.inner.connectors()
        }
        fn id_tags(&self) -> &dyn IdTagRepository {
            self.inner.id_tags()
        }
        fn transactions(&self) -> &dyn TransactionRepository {
            self.inner.transactions()
        }
    }

    #[tokio::test]
    async fn losing_a_first_boot_race_still_registers() {
        let storage = Arc::new(RacingFirstBoot {
            inner: InMemoryStorage::new(),
            missed: std::sync::atomic::AtomicBool::new(false),
        });
        let mut earlier = ChargePoint::new("CP001");
        earlier.record_boot(&boot("V", "1.0"), Utc::now());
        storage.inner.charge_points().insert(earlier).await.unwrap();

        let registry = ChargePointRegistry::new(storage.clone(), 300);
        let result = registry
            .register_or_update("CP001", &boot("V", "2.0"))
            .await
            .unwrap();

        assert_eq!(result.charge_point.firmware_version.as_deref(), Some("2.0"));
        let all = storage.inner.charge_points().find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].firmware_version.as_deref(), Some("2.0"));
    }

    #[tokio::test]
    async fn heartbeat_requires_known_station() {
        let (_, registry) = setup();
        assert!(matches!(
            registry.record_heartbeat("GHOST").await,
            Err(DomainError::NotFound { .. })
        ));

        registry.register_or_update("CP001", &boot("V", "1.0")).await.unwrap();
        let at = registry.record_heartbeat("CP001").await.unwrap();
        let cp = registry.require("CP001").await.unwrap();
        assert_eq!(cp.last_heartbeat, Some(at));
    }

    #[tokio::test]
    async fn set_status_on_unknown_id_fails() {
        let (_, registry) = setup();
        assert!(registry
            .set_status(42, ChargePointStatus::Unavailable)
            .await
            .is_err());
        assert!(registry.get(42).await.unwrap().is_none());
    }
}
