//! Charge Point domain entity

use chrono::{DateTime, Utc};

/// Charge point operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargePointStatus {
    #[default]
    Available,
    Occupied,
    Faulted,
    Unavailable,
    Reserved,
}

impl ChargePointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
            Self::Faulted => "Faulted",
            Self::Unavailable => "Unavailable",
            Self::Reserved => "Reserved",
        }
    }
}

impl std::fmt::Display for ChargePointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ChargePointStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "available" => Self::Available,
            "occupied" => Self::Occupied,
            "faulted" => Self::Faulted,
            "reserved" => Self::Reserved,
            _ => Self::Unavailable,
        }
    }
}

/// Descriptive attributes reported in a BootNotification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootInfo {
    pub vendor: String,
    pub model: String,
    pub charge_point_serial_number: Option<String>,
    pub charge_box_serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub meter_type: Option<String>,
    pub meter_serial_number: Option<String>,
}

/// Charge Point entity
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePoint {
    /// Storage-assigned surrogate key
    pub id: i32,
    /// Identity from the connection path, unique and immutable
    pub code: String,
    pub vendor: String,
    pub model: String,
    pub charge_point_serial_number: Option<String>,
    pub charge_box_serial_number: Option<String>,
    pub firmware_version: Option<String>,
    /// ICCID of the modem
    pub iccid: Option<String>,
    /// IMSI of the modem
    pub imsi: Option<String>,
    pub meter_type: Option<String>,
    pub meter_serial_number: Option<String>,
    pub status: ChargePointStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_boot_notification: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargePoint {
    /// A not-yet-stored charge point (`id` is assigned on insert).
    pub fn new(code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            code: code.into(),
            vendor: String::new(),
            model: String::new(),
            charge_point_serial_number: None,
            charge_box_serial_number: None,
            firmware_version: None,
            iccid: None,
            imsi: None,
            meter_type: None,
            meter_serial_number: None,
            status: ChargePointStatus::Available,
            last_heartbeat: None,
            last_boot_notification: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite descriptive fields with the latest boot report.
    pub fn apply_boot_info(&mut self, info: &BootInfo) {
        self.vendor = info.vendor.clone();
        self.model = info.model.clone();
        self.charge_point_serial_number = info.charge_point_serial_number.clone();
        self.charge_box_serial_number = info.charge_box_serial_number.clone();
        self.firmware_version = info.firmware_version.clone();
        self.iccid = info.iccid.clone();
        self.imsi = info.imsi.clone();
        self.meter_type = info.meter_type.clone();
        self.meter_serial_number = info.meter_serial_number.clone();
    }

    pub fn boot_info(&self) -> BootInfo {
        BootInfo {
            vendor: self.vendor.clone(),
            model: self.model.clone(),
            charge_point_serial_number: self.charge_point_serial_number.clone(),
            charge_box_serial_number: self.charge_box_serial_number.clone(),
            firmware_version: self.firmware_version.clone(),
            iccid: self.iccid.clone(),
            imsi: self.imsi.clone(),
            meter_type: self.meter_type.clone(),
            meter_serial_number: self.meter_serial_number.clone(),
        }
    }

    /// Record a (re)boot: descriptive fields, status reset, boot timestamp.
    pub fn record_boot(&mut self, info: &BootInfo, at: DateTime<Utc>) {
        self.apply_boot_info(info);
        self.status = ChargePointStatus::Available;
        self.last_boot_notification = Some(at);
        self.updated_at = at;
    }
}
