//! IdTag domain entity

use chrono::{DateTime, Utc};

/// IdTag authorization status (OCPP 1.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdTagStatus {
    #[default]
    Accepted,
    Blocked,
    Expired,
    Invalid,
    ConcurrentTx,
}

impl IdTagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Blocked => "Blocked",
            Self::Expired => "Expired",
            Self::Invalid => "Invalid",
            Self::ConcurrentTx => "ConcurrentTx",
        }
    }
}

impl std::fmt::Display for IdTagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for IdTagStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "blocked" => Self::Blocked,
            "expired" => Self::Expired,
            "concurrenttx" => Self::ConcurrentTx,
            _ => Self::Invalid,
        }
    }
}

/// RFID card / authorization token
#[derive(Debug, Clone, PartialEq)]
pub struct IdTag {
    /// Storage-assigned surrogate key
    pub id: i32,
    /// The tag value (RFID card number), unique
    pub tag: String,
    /// Parent tag (for group authorization)
    pub parent_id_tag: Option<String>,
    pub status: IdTagStatus,
    /// Owning user, managed by the admin layer
    pub user_id: Option<i32>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdTag {
    pub fn new(tag: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            tag: tag.into(),
            parent_id_tag: None,
            status: IdTagStatus::Accepted,
            user_id: None,
            expiry_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: IdTagStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_expiry(mut self, expiry_date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Expired at `now`. A zero (epoch) expiry counts as "no expiry".
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date {
            Some(expiry) if expiry.timestamp() != 0 => expiry < now,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn no_expiry_never_expires() {
        assert!(!IdTag::new("TAG").is_expired_at(Utc::now()));
    }

    #[test]
    fn epoch_expiry_counts_as_unset() {
        let tag = IdTag::new("TAG").with_expiry(Utc.timestamp_opt(0, 0).unwrap());
        assert!(!tag.is_expired_at(Utc::now()));
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = Utc::now();
        let tag = IdTag::new("TAG").with_expiry(now - Duration::seconds(1));
        assert!(tag.is_expired_at(now));
        assert!(!tag.is_expired_at(now - Duration::seconds(2)));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            IdTagStatus::Accepted,
            IdTagStatus::Blocked,
            IdTagStatus::Expired,
            IdTagStatus::Invalid,
            IdTagStatus::ConcurrentTx,
        ] {
            assert_eq!(IdTagStatus::from(status.as_str()), status);
        }
    }
}
