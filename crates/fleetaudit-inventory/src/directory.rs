//! Target resolution against the domain directory

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use fleetaudit_exec::CommandRunner;

use crate::error::InventoryError;
use crate::values::{filetime_to_utc, ps_quote, rows_from_json, typed_rows};

/// How the list of target machines is produced.
///
/// The two modes are mutually exclusive: an explicit list bypasses every
/// directory filter parameter.
#[derive(Debug, Clone)]
pub enum TargetSelection {
    /// Caller-supplied machine names, passed through in order
    Explicit(Vec<String>),
    /// Enumerate computer objects from the directory
    Directory {
        /// Search base DN
        search_base: Option<String>,
        /// Directory filter expression (defaults to `*`)
        filter: Option<String>,
        /// Raw LDAP filter
        ldap_filter: Option<String>,
        /// Recency cutoff in days; coerced through absolute value
        machine_age_days: i64,
    },
}

/// Resolves target machine names
pub struct DirectoryClient {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl DirectoryClient {
    /// Create a new directory client
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the directory query timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Produce the ordered list of machine names for a run.
    ///
    /// # Errors
    /// Any failure here is fatal to the run: an empty explicit list is a
    /// `ConfigError`, and a failed directory query is `DirectoryQuery`.
    #[instrument(skip(self, selection))]
    pub async fn resolve(&self, selection: &TargetSelection) -> Result<Vec<String>, InventoryError> {
        match selection {
            TargetSelection::Explicit(names) => {
                if names.is_empty() {
                    return Err(InventoryError::ConfigError(
                        "explicit system list is empty".to_string(),
                    ));
                }
                Ok(names.clone())
            }
            TargetSelection::Directory {
                search_base,
                filter,
                ldap_filter,
                machine_age_days,
            } => {
                // Validate the cutoff before the directory roundtrip. Any i64
                // parses at the CLI, but chrono durations cap out well below
                // i64::MAX days.
                let window = i64::try_from(machine_age_days.unsigned_abs())
                    .ok()
                    .and_then(chrono::Duration::try_days)
                    .ok_or_else(|| {
                        InventoryError::ConfigError(format!(
                            "machine age out of range: {machine_age_days}"
                        ))
                    })?;
                let cutoff = Utc::now() - window;

                let rows = self
                    .query_computers(search_base.as_deref(), filter.as_deref(), ldap_filter.as_deref())
                    .await?;

                #[derive(Deserialize)]
                struct ComputerRow {
                    #[serde(rename = "Name")]
                    name: Option<String>,
                    #[serde(rename = "lastLogonTimestamp")]
                    last_logon: Option<i64>,
                }

                let rows: Vec<ComputerRow> =
                    typed_rows(rows).map_err(|e| InventoryError::DirectoryQuery(e.to_string()))?;

                // Recency is filtered here, after retrieval, rather than in
                // the directory query predicate. Objects that never logged on
                // are excluded.
                let mut names = Vec::new();
                for row in rows {
                    let Some(name) = row.name else { continue };

                    match row.last_logon.and_then(filetime_to_utc) {
                        Some(seen) if seen > cutoff => names.push(name),
                        _ => debug!(machine = %name, "skipping stale computer object"),
                    }
                }

                info!(count = names.len(), "resolved directory targets");
                Ok(names)
            }
        }
    }

    async fn query_computers(
        &self,
        search_base: Option<&str>,
        filter: Option<&str>,
        ldap_filter: Option<&str>,
    ) -> Result<Vec<Value>, InventoryError> {
        let mut pipeline = format!(
            "Get-ADComputer -Filter {}",
            ps_quote(filter.unwrap_or("*"))
        );
        if let Some(base) = search_base {
            pipeline.push_str(&format!(" -SearchBase {}", ps_quote(base)));
        }
        if let Some(ldap) = ldap_filter {
            pipeline.push_str(&format!(" -LDAPFilter {}", ps_quote(ldap)));
        }
        pipeline.push_str(
            " -Properties lastLogonTimestamp -ErrorAction Stop \
             | Select-Object Name,lastLogonTimestamp | ConvertTo-Json -Compress",
        );

        let result = self
            .runner
            .run_with_timeout(&pipeline, self.timeout)
            .await
            .map_err(|e| InventoryError::DirectoryQuery(e.to_string()))?;

        if !result.success() {
            return Err(InventoryError::DirectoryQuery(result.stderr_excerpt()));
        }

        rows_from_json(&result.stdout).map_err(|e| InventoryError::DirectoryQuery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use crate::values::utc_to_filetime;

    fn directory(runner: ScriptedRunner) -> (Arc<ScriptedRunner>, DirectoryClient) {
        let runner = Arc::new(runner);
        (runner.clone(), DirectoryClient::new(runner))
    }

    fn selection(machine_age_days: i64) -> TargetSelection {
        TargetSelection::Directory {
            search_base: None,
            filter: None,
            ldap_filter: None,
            machine_age_days,
        }
    }

    fn computers_json() -> String {
        let recent = utc_to_filetime(Utc::now() - chrono::Duration::days(1));
        let stale = utc_to_filetime(Utc::now() - chrono::Duration::days(90));
        format!(
            r#"[{{"Name":"HOST-A","lastLogonTimestamp":{recent}}},
                {{"Name":"HOST-B","lastLogonTimestamp":{stale}}},
                {{"Name":"HOST-C","lastLogonTimestamp":null}}]"#
        )
    }

    #[tokio::test]
    async fn test_explicit_passthrough_preserves_order() {
        let (runner, client) = directory(ScriptedRunner::new());

        let names = client
            .resolve(&TargetSelection::Explicit(vec![
                "HOST-B".to_string(),
                "HOST-A".to_string(),
            ]))
            .await
            .unwrap();

        assert_eq!(names, vec!["HOST-B", "HOST-A"]);
        // Explicit mode never touches the directory
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_empty_list_rejected() {
        let (_, client) = directory(ScriptedRunner::new());

        let err = client
            .resolve(&TargetSelection::Explicit(Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_recency_filter_drops_stale_and_never_seen() {
        let (_, client) = directory(
            ScriptedRunner::new().on("Get-ADComputer", ScriptedRunner::ok(&computers_json())),
        );

        let names = client.resolve(&selection(30)).await.unwrap();
        assert_eq!(names, vec!["HOST-A"]);
    }

    #[tokio::test]
    async fn test_negative_machine_age_equals_absolute_value() {
        let json = computers_json();
        let (_, client_pos) =
            directory(ScriptedRunner::new().on("Get-ADComputer", ScriptedRunner::ok(&json)));
        let (_, client_neg) =
            directory(ScriptedRunner::new().on("Get-ADComputer", ScriptedRunner::ok(&json)));

        let pos = client_pos.resolve(&selection(10)).await.unwrap();
        let neg = client_neg.resolve(&selection(-10)).await.unwrap();

        assert_eq!(pos, neg);
    }

    #[tokio::test]
    async fn test_out_of_range_machine_age_is_config_error() {
        let (runner, client) = directory(
            ScriptedRunner::new().on("Get-ADComputer", ScriptedRunner::ok("[]")),
        );

        let err = client
            .resolve(&selection(200_000_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::ConfigError(_)));

        let err = client.resolve(&selection(i64::MIN)).await.unwrap_err();
        assert!(matches!(err, InventoryError::ConfigError(_)));

        // Rejected before the directory is ever queried
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_fatal_error() {
        let (_, client) = directory(
            ScriptedRunner::new()
                .on("Get-ADComputer", ScriptedRunner::fail("Unable to contact the server.")),
        );

        let err = client.resolve(&selection(30)).await.unwrap_err();

        match err {
            InventoryError::DirectoryQuery(cause) => {
                assert!(cause.contains("Unable to contact the server"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_filter_parameters_reach_the_pipeline() {
        let (runner, client) = directory(
            ScriptedRunner::new().on("Get-ADComputer", ScriptedRunner::ok("[]")),
        );

        client
            .resolve(&TargetSelection::Directory {
                search_base: Some("OU=Servers,DC=corp,DC=example".to_string()),
                filter: Some("Enabled -eq $true".to_string()),
                ldap_filter: Some("(operatingSystem=*Server*)".to_string()),
                machine_age_days: 30,
            })
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("-Filter 'Enabled -eq $true'"));
        assert!(calls[0].contains("-SearchBase 'OU=Servers,DC=corp,DC=example'"));
        assert!(calls[0].contains("-LDAPFilter '(operatingSystem=*Server*)'"));
        assert!(calls[0].contains("-Properties lastLogonTimestamp"));
    }
}
