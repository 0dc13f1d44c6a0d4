//! Report record types
//!
//! Every field carries a deterministic default so that partial collection
//! failure produces sentinel values, never absent fields. A record is created
//! fresh per machine, mutated in place as categories succeed, and read-only
//! once emitted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sentinel for a licensing status that was never retrieved
pub const LICENSE_STATUS_UNSET: &str = "-1";

/// Sentinel for numeric fields that were never retrieved
pub const COUNT_UNSET: i64 = -1;

/// Activation states reported by the software licensing service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    Unlicensed,
    Licensed,
    OutOfBoxGrace,
    OutOfToleranceGrace,
    NonGenuineGrace,
    Notification,
    ExtendedGrace,
}

impl LicenseStatus {
    /// Map a raw status code onto the fixed table
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Unlicensed),
            1 => Some(Self::Licensed),
            2 => Some(Self::OutOfBoxGrace),
            3 => Some(Self::OutOfToleranceGrace),
            4 => Some(Self::NonGenuineGrace),
            5 => Some(Self::Notification),
            6 => Some(Self::ExtendedGrace),
            _ => None,
        }
    }

    /// Human-readable state name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unlicensed => "Unlicensed",
            Self::Licensed => "Licensed",
            Self::OutOfBoxGrace => "OOBGrace",
            Self::OutOfToleranceGrace => "OOTGrace",
            Self::NonGenuineGrace => "NonGenuineGrace",
            Self::Notification => "Notification",
            Self::ExtendedGrace => "ExtendedGrace",
        }
    }

    /// Labeled form of a raw status code: `"1 (Licensed)"`, or
    /// `"<code> (unknown)"` for codes outside the table.
    #[must_use]
    pub fn label(code: i64) -> String {
        match Self::from_code(code) {
            Some(status) => format!("{code} ({})", status.name()),
            None => format!("{code} (unknown)"),
        }
    }
}

/// One pending update on a machine
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    /// Update title
    pub title: String,
    /// Severity label (`Critical`, `Important`, ...); empty when unrated
    pub severity: String,
    /// Last deployment change timestamp
    pub last_change: Option<DateTime<Utc>>,
    /// Whether the update belongs to the Security Updates category
    pub is_security: bool,
}

/// Licensing report row for one machine
#[derive(Debug, Clone, Serialize)]
pub struct LicenseRecord {
    /// Machine name, immutable once assigned
    pub system: String,
    /// Operating system caption
    pub os_type: String,
    /// Operating system version
    pub os_version: String,
    /// Labeled license status code
    pub license_status: String,
    /// Status reason code, rendered as hex
    pub license_reason: String,
    /// Licensed product name
    pub license_product: String,
    /// Licensed product description
    pub license_description: String,
    /// Product key channel (Retail, OEM, Volume:GVLK, ...)
    pub product_key_channel: String,
    /// Discovered key-management service host
    pub kms_server: String,
}

impl LicenseRecord {
    /// Column headers, in field order
    pub const HEADERS: [&'static str; 9] = [
        "System",
        "Type",
        "Version",
        "LicenseStatus",
        "LicenseReason",
        "LicenseProduct",
        "LicenseDescription",
        "ProductKeyChannel",
        "KMSServer",
    ];

    /// Fresh record with every field at its sentinel default
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            os_type: "Unknown".to_string(),
            os_version: "Unknown".to_string(),
            license_status: LICENSE_STATUS_UNSET.to_string(),
            license_reason: String::new(),
            license_product: String::new(),
            license_description: String::new(),
            product_key_channel: String::new(),
            kms_server: String::new(),
        }
    }

    /// Field values in header order, for table and CSV rendering
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        vec![
            self.system.clone(),
            self.os_type.clone(),
            self.os_version.clone(),
            self.license_status.clone(),
            self.license_reason.clone(),
            self.license_product.clone(),
            self.license_description.clone(),
            self.product_key_channel.clone(),
            self.kms_server.clone(),
        ]
    }
}

/// Update-compliance report row for one machine
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRecord {
    /// Machine name, immutable once assigned
    pub system: String,
    /// Operating system caption
    pub os_type: String,
    /// Operating system version
    pub os_version: String,
    /// Pending updates with severity exactly `Critical`
    pub critical: i64,
    /// Pending updates in the Security Updates category
    pub security: i64,
    /// Age in whole days of the oldest pending security update, or -1
    pub security_age: i64,
}

impl UpdateRecord {
    /// Column headers, in field order
    pub const HEADERS: [&'static str; 6] = [
        "System",
        "Type",
        "Version",
        "Critical",
        "Security",
        "SecurityAge",
    ];

    /// Fresh record with every field at its sentinel default
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            os_type: "Unknown".to_string(),
            os_version: "Unknown".to_string(),
            critical: COUNT_UNSET,
            security: COUNT_UNSET,
            security_age: COUNT_UNSET,
        }
    }

    /// Field values in header order, for table and CSV rendering
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        vec![
            self.system.clone(),
            self.os_type.clone(),
            self.os_version.clone(),
            self.critical.to_string(),
            self.security.to_string(),
            self.security_age.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_matches_fixed_table() {
        let expected = [
            (0, "0 (Unlicensed)"),
            (1, "1 (Licensed)"),
            (2, "2 (OOBGrace)"),
            (3, "3 (OOTGrace)"),
            (4, "4 (NonGenuineGrace)"),
            (5, "5 (Notification)"),
            (6, "6 (ExtendedGrace)"),
        ];

        for (code, label) in expected {
            assert_eq!(LicenseStatus::label(code), label);
        }
    }

    #[test]
    fn test_label_out_of_range_code() {
        assert_eq!(LicenseStatus::label(7), "7 (unknown)");
        assert_eq!(LicenseStatus::label(-3), "-3 (unknown)");
        assert_eq!(LicenseStatus::label(42), "42 (unknown)");
    }

    #[test]
    fn test_license_record_sentinel_defaults() {
        let record = LicenseRecord::new("HOST-B");

        assert_eq!(record.system, "HOST-B");
        assert_eq!(record.os_type, "Unknown");
        assert_eq!(record.os_version, "Unknown");
        assert_eq!(record.license_status, LICENSE_STATUS_UNSET);
        assert_eq!(record.license_product, "");
        assert_eq!(record.kms_server, "");
    }

    #[test]
    fn test_update_record_sentinel_defaults() {
        let record = UpdateRecord::new("HOST-B");

        assert_eq!(record.critical, COUNT_UNSET);
        assert_eq!(record.security, COUNT_UNSET);
        assert_eq!(record.security_age, COUNT_UNSET);
    }

    #[test]
    fn test_fields_align_with_headers() {
        assert_eq!(
            LicenseRecord::new("X").fields().len(),
            LicenseRecord::HEADERS.len()
        );
        assert_eq!(
            UpdateRecord::new("X").fields().len(),
            UpdateRecord::HEADERS.len()
        );
    }
}
