//! fleetaudit-inventory: remote licensing and update-compliance facts
//!
//! Resolves target machines from the domain directory and queries each one
//! for class instances over the management transports, with per-category
//! failure isolation.

pub mod cim;
pub mod collector;
pub mod directory;
pub mod error;
pub mod types;
pub mod values;
pub mod wql;

#[cfg(test)]
pub(crate) mod testing;
