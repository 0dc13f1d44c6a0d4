//! JSON row handling for pipeline output

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::InventoryError;

/// Seconds between 1601-01-01 (the FILETIME epoch) and the Unix epoch.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Parse pipeline stdout into JSON rows.
///
/// `ConvertTo-Json` emits a bare object for single-row results and nothing at
/// all for empty ones; both are normalized to an array here.
pub fn rows_from_json(raw: &str) -> Result<Vec<Value>, InventoryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| InventoryError::ParseError(e.to_string()))?;

    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}

/// Deserialize JSON rows into typed row structs.
///
/// # Errors
/// Returns `InventoryError::ParseError` if any row fails to deserialize.
pub fn typed_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, InventoryError> {
    let mut results = Vec::with_capacity(rows.len());
    for value in rows {
        let row: T =
            serde_json::from_value(value).map_err(|e| InventoryError::ParseError(e.to_string()))?;
        results.push(row);
    }
    Ok(results)
}

/// Convert a Windows FILETIME (100ns ticks since 1601-01-01 UTC) to UTC.
///
/// Zero and negative values mean "never" and yield `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn filetime_to_utc(filetime: i64) -> Option<DateTime<Utc>> {
    if filetime <= 0 {
        return None;
    }

    let secs = filetime / 10_000_000 - FILETIME_UNIX_OFFSET_SECS;
    let nanos = (filetime % 10_000_000) * 100;

    Utc.timestamp_opt(secs, nanos as u32).single()
}

/// Inverse of [`filetime_to_utc`], for constructing test fixtures.
#[cfg(test)]
pub(crate) fn utc_to_filetime(ts: DateTime<Utc>) -> i64 {
    (ts.timestamp() + FILETIME_UNIX_OFFSET_SECS) * 10_000_000
        + i64::from(ts.timestamp_subsec_nanos()) / 100
}

/// Quote a value as a PowerShell single-quoted string literal.
#[must_use]
pub(crate) fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_rows_from_empty_output() {
        assert!(rows_from_json("").unwrap().is_empty());
        assert!(rows_from_json("  \n").unwrap().is_empty());
        assert!(rows_from_json("null").unwrap().is_empty());
    }

    #[test]
    fn test_rows_from_single_object() {
        let rows = rows_from_json(r#"{"Name":"HOST-A"}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Name"], "HOST-A");
    }

    #[test]
    fn test_rows_from_array() {
        let rows = rows_from_json(r#"[{"Name":"A"},{"Name":"B"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_rows_from_garbage() {
        assert!(matches!(
            rows_from_json("not json"),
            Err(InventoryError::ParseError(_))
        ));
    }

    #[test]
    fn test_typed_rows() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(rename = "Name")]
            name: String,
        }

        let rows: Vec<Row> = typed_rows(rows_from_json(r#"[{"Name":"A"}]"#).unwrap()).unwrap();
        assert_eq!(rows[0].name, "A");
    }

    #[test]
    fn test_filetime_epoch() {
        // 1601-01-01 plus exactly the Unix offset lands on the Unix epoch
        let ts = filetime_to_utc(11_644_473_600 * 10_000_000).unwrap();
        assert_eq!(ts.timestamp(), 0);
    }

    #[test]
    fn test_filetime_never_is_none() {
        assert!(filetime_to_utc(0).is_none());
        assert!(filetime_to_utc(-1).is_none());
    }

    #[test]
    fn test_ps_quote_doubles_quotes() {
        assert_eq!(ps_quote("HOST-A"), "'HOST-A'");
        assert_eq!(ps_quote("it's"), "'it''s'");
    }

    #[test]
    fn test_filetime_round_trip() {
        let now = Utc::now();
        let back = filetime_to_utc(utc_to_filetime(now)).unwrap();
        assert_eq!(back.timestamp(), now.timestamp());
    }
}
