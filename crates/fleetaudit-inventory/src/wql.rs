//! WQL query construction
//!
//! WQL is the SELECT-only dialect understood by both management transports.
//! It has no ORDER BY or LIMIT; any ordering happens client-side.

use std::fmt;

/// WQL query builder
#[derive(Debug, Clone)]
pub struct WqlQuery {
    /// Selected properties
    select: Vec<String>,
    /// Class name
    from: String,
    /// WHERE clauses, joined with AND
    where_clauses: Vec<String>,
}

impl WqlQuery {
    /// Create a new query for a class
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            select: vec!["*".to_string()],
            from: class.into(),
            where_clauses: Vec::new(),
        }
    }

    /// Select specific properties
    #[must_use]
    pub fn select(mut self, properties: &[&str]) -> Self {
        self.select = properties.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Add an equality WHERE clause
    #[must_use]
    pub fn where_eq(mut self, property: &str, value: &str) -> Self {
        // Escape single quotes in value
        let escaped = value.replace('\'', "''");
        self.where_clauses.push(format!("{property} = '{escaped}'"));
        self
    }

    /// Add a greater-than WHERE clause
    #[must_use]
    pub fn where_gt(mut self, property: &str, value: i64) -> Self {
        self.where_clauses.push(format!("{property} > {value}"));
        self
    }

    /// Queried class name
    #[must_use]
    pub fn class(&self) -> &str {
        &self.from
    }

    /// Selected properties, for `Select-Object` on the shell side
    #[must_use]
    pub fn properties(&self) -> &[String] {
        &self.select
    }

    /// Build the WQL string
    #[must_use]
    pub fn build(&self) -> String {
        let mut wql = format!("SELECT {} FROM {}", self.select.join(", "), self.from);

        if !self.where_clauses.is_empty() {
            wql.push_str(" WHERE ");
            wql.push_str(&self.where_clauses.join(" AND "));
        }

        wql
    }
}

impl fmt::Display for WqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}

/// Predefined queries for the report categories
pub mod queries {
    use super::WqlQuery;

    /// Products known to the licensing service, excluding unlicensed-only rows
    #[must_use]
    pub fn licensing_products() -> WqlQuery {
        WqlQuery::new("SoftwareLicensingProduct")
            .select(&[
                "Name",
                "Description",
                "LicenseStatus",
                "LicenseStatusReason",
                "ProductKeyChannel",
                "DiscoveredKeyManagementServiceMachineName",
            ])
            .where_gt("LicenseStatus", 0)
    }

    /// Operating system identity (caption and version)
    #[must_use]
    pub fn operating_system() -> WqlQuery {
        WqlQuery::new("Win32_OperatingSystem").select(&["Caption", "Version"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = WqlQuery::new("Win32_Service")
            .select(&["Name", "State"])
            .where_eq("StartMode", "Auto");

        let wql = query.build();
        assert_eq!(
            wql,
            "SELECT Name, State FROM Win32_Service WHERE StartMode = 'Auto'"
        );
    }

    #[test]
    fn test_select_star_default() {
        assert_eq!(
            WqlQuery::new("Win32_BIOS").build(),
            "SELECT * FROM Win32_BIOS"
        );
    }

    #[test]
    fn test_where_clauses_joined_with_and() {
        let wql = WqlQuery::new("Win32_Service")
            .where_eq("State", "Running")
            .where_gt("ProcessId", 0)
            .build();

        assert!(wql.contains("State = 'Running' AND ProcessId > 0"));
    }

    #[test]
    fn test_quote_escaping() {
        let wql = WqlQuery::new("Win32_Product")
            .where_eq("Name", "O'Brien's Tool")
            .build();

        assert!(wql.contains("Name = 'O''Brien''s Tool'"));
    }

    #[test]
    fn test_licensing_products_query() {
        let wql = queries::licensing_products().build();
        assert!(wql.starts_with("SELECT Name, Description, LicenseStatus"));
        assert!(wql.contains("FROM SoftwareLicensingProduct"));
        assert!(wql.ends_with("WHERE LicenseStatus > 0"));
    }

    #[test]
    fn test_operating_system_query() {
        assert_eq!(
            queries::operating_system().build(),
            "SELECT Caption, Version FROM Win32_OperatingSystem"
        );
    }
}
