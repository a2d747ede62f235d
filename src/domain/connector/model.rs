//! Connector domain entity

use chrono::{DateTime, Utc};

/// Connector status as reported by the charge point.
///
/// Values outside the OCPP 1.6 vocabulary are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectorStatus {
    #[default]
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
    Other(String),
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "Available",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
            Self::SuspendedEV => "SuspendedEV",
            Self::SuspendedEVSE => "SuspendedEVSE",
            Self::Finishing => "Finishing",
            Self::Reserved => "Reserved",
            Self::Unavailable => "Unavailable",
            Self::Faulted => "Faulted",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ConnectorStatus {
    fn from(s: &str) -> Self {
        match s {
            "Available" => Self::Available,
            "Preparing" => Self::Preparing,
            "Charging" => Self::Charging,
            "SuspendedEV" => Self::SuspendedEV,
            "SuspendedEVSE" => Self::SuspendedEVSE,
            "Finishing" => Self::Finishing,
            "Reserved" => Self::Reserved,
            "Unavailable" => Self::Unavailable,
            "Faulted" => Self::Faulted,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connector on a charge point
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    /// Storage-assigned surrogate key
    pub id: i32,
    /// Owning charge point (surrogate key)
    pub charge_point_id: i32,
    /// Index on the station; 1 is the default connector
    pub connector_id: u32,
    pub status: ConnectorStatus,
    pub error_code: Option<String>,
    pub info: Option<String>,
    pub vendor_id: Option<String>,
    pub vendor_error_code: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Connector {
    pub fn new(charge_point_id: i32, connector_id: u32) -> Self {
        Self {
            id: 0,
            charge_point_id,
            connector_id,
            status: ConnectorStatus::default(),
            error_code: None,
            info: None,
            vendor_id: None,
            vendor_error_code: None,
            updated_at: Utc::now(),
        }
    }
}
