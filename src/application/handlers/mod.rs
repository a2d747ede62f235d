//! OCPP message handlers
//!
//! An [`ActionTable`] maps action names to [`ActionHandler`]s. It is built
//! once at startup and shared by every session; [`OcppSession`] decodes
//! frames and dispatches calls through it.

mod ocpp_v16;
mod ocpp_v16_handler;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::application::services::{
    AuthorizationGate, ChargePointRegistry, ConnectorTracker, TransactionLedger,
};
use crate::domain::{ChargePoint, DomainError, RepositoryProvider};
use crate::shared::OcppErrorCode;

pub use ocpp_v16::IdTagInfoPayload;
pub use ocpp_v16_handler::OcppSession;

/// Outcome of a handler that does not produce a reply payload
#[derive(Debug, Error)]
pub enum ActionError {
    /// Answer the call with a CallError
    #[error("{code}: {description}")]
    Fault {
        code: OcppErrorCode,
        description: String,
    },
    /// Log and send nothing
    #[error(transparent)]
    Dropped(#[from] DomainError),
}

impl ActionError {
    pub fn fault(code: OcppErrorCode, description: impl Into<String>) -> Self {
        Self::Fault {
            code,
            description: description.into(),
        }
    }
}

pub type ActionResult = Result<Value, ActionError>;

/// Serialize a typed response into a reply payload.
pub fn reply<T: Serialize>(response: &T) -> ActionResult {
    serde_json::to_value(response)
        .map_err(|e| ActionError::fault(OcppErrorCode::InternalError, e.to_string()))
}

/// State components every handler may call
pub struct Services {
    pub registry: Arc<ChargePointRegistry>,
    pub connectors: Arc<ConnectorTracker>,
    pub gate: Arc<AuthorizationGate>,
    pub ledger: Arc<TransactionLedger>,
}

impl Services {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        heartbeat_interval: u32,
        price_per_kwh: Decimal,
    ) -> Self {
        let gate = Arc::new(AuthorizationGate::new(repos.clone()));
        Self {
            registry: Arc::new(ChargePointRegistry::new(repos.clone(), heartbeat_interval)),
            connectors: Arc::new(ConnectorTracker::new(repos.clone())),
            ledger: Arc::new(TransactionLedger::new(repos, gate.clone(), price_per_kwh)),
            gate,
        }
    }
}

/// Per-call context: which station is talking, and the services to use.
pub struct ActionContext {
    pub charge_point_id: String,
    pub services: Arc<Services>,
}

impl ActionContext {
    pub fn new(charge_point_id: impl Into<String>, services: Arc<Services>) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            services,
        }
    }

    /// The calling station's record. A station that never booted is
    /// `NotFound`, which drops the frame.
    pub async fn charge_point(&self) -> Result<ChargePoint, ActionError> {
        Ok(self.services.registry.require(&self.charge_point_id).await?)
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext, payload: &Value) -> ActionResult;
}

/// Immutable action name → handler table
#[derive(Default)]
pub struct ActionTable {
    handlers: HashMap<&'static str, Box<dyn ActionHandler>>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, action: &'static str, handler: impl ActionHandler + 'static) -> Self {
        self.handlers.insert(action, Box::new(handler));
        self
    }

    pub fn get(&self, action: &str) -> Option<&dyn ActionHandler> {
        self.handlers.get(action).map(|h| h.as_ref())
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    pub fn actions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
