//! Per-machine fact collection
//!
//! Each fact category is attempted independently: a failed category logs a
//! warning naming the machine and leaves its fields at their sentinel
//! defaults, and never blocks the other categories. Categories write disjoint
//! fields, so their order within one machine does not matter.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::cim::CimClient;
use crate::error::InventoryError;
use crate::types::{COUNT_UNSET, LicenseRecord, LicenseStatus, PendingUpdate, UpdateRecord};
use crate::values::{filetime_to_utc, typed_rows};
use crate::wql::queries;

/// Collects report records for single machines
pub struct FactCollector {
    client: CimClient,
}

/// The licensed product chosen for a machine: the one with the lowest
/// positive status code.
struct LicensedProduct {
    status: i64,
    reason: i64,
    name: String,
    description: String,
    channel: String,
    kms_server: String,
}

impl FactCollector {
    /// Create a collector over a client
    pub fn new(client: CimClient) -> Self {
        Self { client }
    }

    /// Collect the licensing report row for one machine.
    ///
    /// Never fails: category failures degrade to sentinel fields.
    #[instrument(skip(self))]
    pub async fn license_record(&self, machine: &str) -> LicenseRecord {
        let mut record = LicenseRecord::new(machine);

        match self.licensed_product(machine).await {
            Ok(product) => {
                record.license_status = LicenseStatus::label(product.status);
                record.license_reason = format!("0x{:X}", product.reason);
                record.license_product = product.name;
                record.license_description = product.description;
                record.product_key_channel = product.channel;
                record.kms_server = product.kms_server;
            }
            Err(e) => warn!(machine = %machine, error = %e, "licensing query failed"),
        }

        // The licensing report sticks to the primary transport for the OS query
        match self.operating_system(machine, false).await {
            Ok((caption, version)) => {
                record.os_type = caption;
                record.os_version = version;
            }
            Err(e) => warn!(machine = %machine, error = %e, "operating system query failed"),
        }

        record
    }

    /// Collect the update-compliance report row for one machine.
    ///
    /// Never fails: category failures degrade to sentinel fields.
    #[instrument(skip(self))]
    pub async fn update_record(&self, machine: &str) -> UpdateRecord {
        let mut record = UpdateRecord::new(machine);

        match self.pending_updates(machine).await {
            Ok(updates) => {
                record.critical =
                    updates.iter().filter(|u| u.severity == "Critical").count() as i64;
                record.security = updates.iter().filter(|u| u.is_security).count() as i64;
                record.security_age = security_age_days(&updates, Utc::now());
                debug!(pending = updates.len(), "update search completed");
            }
            Err(e) => warn!(machine = %machine, error = %e, "update search failed"),
        }

        match self.operating_system(machine, true).await {
            Ok((caption, version)) => {
                record.os_type = caption;
                record.os_version = version;
            }
            Err(e) => warn!(machine = %machine, error = %e, "operating system query failed"),
        }

        record
    }

    async fn licensed_product(&self, machine: &str) -> Result<LicensedProduct, InventoryError> {
        #[derive(Deserialize)]
        struct LicensingRow {
            #[serde(rename = "Name")]
            name: Option<String>,
            #[serde(rename = "Description")]
            description: Option<String>,
            #[serde(rename = "LicenseStatus")]
            status: Option<i64>,
            #[serde(rename = "LicenseStatusReason")]
            reason: Option<i64>,
            #[serde(rename = "ProductKeyChannel")]
            channel: Option<String>,
            #[serde(rename = "DiscoveredKeyManagementServiceMachineName")]
            kms_server: Option<String>,
        }

        let rows: Vec<LicensingRow> = typed_rows(
            self.client
                .get_instances(machine, &queries::licensing_products())
                .await?,
        )?;

        // Lowest status code wins
        let best = rows
            .into_iter()
            .filter_map(|row| row.status.map(|code| (code, row)))
            .min_by_key(|(code, _)| *code);

        let Some((status, row)) = best else {
            return Err(InventoryError::NoData(
                "no licensed products reported".to_string(),
            ));
        };

        Ok(LicensedProduct {
            status,
            reason: row.reason.unwrap_or(0),
            name: row.name.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            channel: row.channel.unwrap_or_default(),
            kms_server: row.kms_server.unwrap_or_default(),
        })
    }

    async fn pending_updates(&self, machine: &str) -> Result<Vec<PendingUpdate>, InventoryError> {
        #[derive(Deserialize)]
        struct UpdateRow {
            #[serde(rename = "Title")]
            title: Option<String>,
            #[serde(rename = "MsrcSeverity")]
            severity: Option<String>,
            #[serde(rename = "LastChange")]
            last_change: Option<i64>,
            #[serde(rename = "IsSecurity")]
            is_security: Option<bool>,
        }

        let rows: Vec<UpdateRow> =
            typed_rows(self.client.search_pending_updates(machine).await?)?;

        Ok(rows
            .into_iter()
            .map(|row| PendingUpdate {
                title: row.title.unwrap_or_default(),
                severity: row.severity.unwrap_or_default(),
                last_change: row.last_change.and_then(filetime_to_utc),
                is_security: row.is_security.unwrap_or(false),
            })
            .collect())
    }

    async fn operating_system(
        &self,
        machine: &str,
        use_fallback: bool,
    ) -> Result<(String, String), InventoryError> {
        #[derive(Deserialize)]
        struct OsRow {
            #[serde(rename = "Caption")]
            caption: Option<String>,
            #[serde(rename = "Version")]
            version: Option<String>,
        }

        let query = queries::operating_system();
        let rows = if use_fallback {
            self.client
                .get_instances_with_fallback(machine, &query)
                .await?
        } else {
            self.client.get_instances(machine, &query).await?
        };

        let row: OsRow = typed_rows(rows)?.into_iter().next().ok_or_else(|| {
            InventoryError::NoData("no operating system instance returned".to_string())
        })?;

        Ok((
            row.caption.unwrap_or_else(|| "Unknown".to_string()),
            row.version.unwrap_or_else(|| "Unknown".to_string()),
        ))
    }
}

/// Age in whole days (rounded) of the oldest security-flagged update, or the
/// -1 sentinel when no security updates are present.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn security_age_days(updates: &[PendingUpdate], now: DateTime<Utc>) -> i64 {
    let oldest = updates
        .iter()
        .filter(|u| u.is_security)
        .filter_map(|u| u.last_change)
        .min();

    match oldest {
        Some(ts) => (((now - ts).num_seconds() as f64) / 86_400.0).round() as i64,
        None => COUNT_UNSET,
    }
}
