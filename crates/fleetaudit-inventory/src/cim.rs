//! Remote class-instance retrieval over the management transports
//!
//! The primary transport is `Get-CimInstance` (WS-Man); the legacy fallback
//! is `Get-WmiObject` (DCOM). Pending updates go through an `Invoke-Command`
//! session search, since the update agent exposes no queryable class.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use fleetaudit_exec::CommandRunner;

use crate::error::InventoryError;
use crate::values::{ps_quote, rows_from_json};
use crate::wql::WqlQuery;

/// Client for querying class instances on remote machines
pub struct CimClient {
    /// Runner carrying the pipelines
    runner: Arc<dyn CommandRunner>,
    /// Per-query timeout
    timeout: Duration,
}

impl CimClient {
    /// Create a new client
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the per-query timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retrieve class instances via the primary transport only.
    ///
    /// # Errors
    /// Returns an error if the pipeline cannot run, exits non-zero, or emits
    /// unparseable JSON.
    #[instrument(skip(self, query), fields(machine = %machine, class = %query.class()))]
    pub async fn get_instances(
        &self,
        machine: &str,
        query: &WqlQuery,
    ) -> Result<Vec<Value>, InventoryError> {
        debug!("querying primary transport");
        self.run_pipeline(machine, &primary_pipeline(machine, query))
            .await
    }

    /// Retrieve class instances, substituting the legacy transport on failure.
    ///
    /// Each transport is attempted exactly once; there are no retries.
    ///
    /// # Errors
    /// Returns `InventoryError::AllTransportsFailed` carrying both causes when
    /// the legacy attempt fails too.
    #[instrument(skip(self, query), fields(machine = %machine, class = %query.class()))]
    pub async fn get_instances_with_fallback(
        &self,
        machine: &str,
        query: &WqlQuery,
    ) -> Result<Vec<Value>, InventoryError> {
        match self.get_instances(machine, query).await {
            Ok(rows) => Ok(rows),
            Err(primary) => {
                warn!(
                    machine = %machine,
                    class = %query.class(),
                    error = %primary,
                    "primary transport failed, trying legacy transport"
                );

                match self
                    .run_pipeline(machine, &legacy_pipeline(machine, query))
                    .await
                {
                    Ok(rows) => Ok(rows),
                    Err(legacy) => Err(InventoryError::AllTransportsFailed {
                        machine: machine.to_string(),
                        primary: primary.to_string(),
                        legacy: legacy.to_string(),
                    }),
                }
            }
        }
    }

    /// Search the target machine for updates that are not installed and not
    /// hidden, one JSON row per pending update.
    ///
    /// # Errors
    /// Returns an error if the remote session fails or emits unparseable JSON.
    #[instrument(skip(self), fields(machine = %machine))]
    pub async fn search_pending_updates(
        &self,
        machine: &str,
    ) -> Result<Vec<Value>, InventoryError> {
        debug!("searching pending updates");
        self.run_pipeline(machine, &update_search_pipeline(machine))
            .await
    }

    async fn run_pipeline(
        &self,
        machine: &str,
        pipeline: &str,
    ) -> Result<Vec<Value>, InventoryError> {
        let result = self
            .runner
            .run_with_timeout(pipeline, self.timeout)
            .await
            .map_err(|e| InventoryError::ExecutionError(e.to_string()))?;

        if !result.success() {
            return Err(InventoryError::QueryFailed {
                machine: machine.to_string(),
                cause: result.stderr_excerpt(),
            });
        }

        rows_from_json(&result.stdout)
    }
}

fn primary_pipeline(machine: &str, query: &WqlQuery) -> String {
    format!(
        "Get-CimInstance -ComputerName {} -Query \"{}\" -ErrorAction Stop \
         | Select-Object {} | ConvertTo-Json -Compress",
        ps_quote(machine),
        query.build(),
        query.properties().join(","),
    )
}

fn legacy_pipeline(machine: &str, query: &WqlQuery) -> String {
    format!(
        "Get-WmiObject -ComputerName {} -Query \"{}\" -ErrorAction Stop \
         | Select-Object {} | ConvertTo-Json -Compress",
        ps_quote(machine),
        query.build(),
        query.properties().join(","),
    )
}

fn update_search_pipeline(machine: &str) -> String {
    format!(
        "Invoke-Command -ComputerName {} -ErrorAction Stop -ScriptBlock {{ \
         $session = New-Object -ComObject Microsoft.Update.Session; \
         $result = $session.CreateUpdateSearcher().Search('IsInstalled=0 and IsHidden=0'); \
         $rows = foreach ($u in $result.Updates) {{ [pscustomobject]@{{ \
         Title = $u.Title; \
         MsrcSeverity = [string]$u.MsrcSeverity; \
         LastChange = $u.LastDeploymentChangeTime.ToFileTimeUtc(); \
         IsSecurity = [bool]($u.Categories | Where-Object Name -eq 'Security Updates') }} }}; \
         ConvertTo-Json -InputObject @($rows) -Compress }}",
        ps_quote(machine),
    )
}
