//! fleetaudit-exec: PowerShell subprocess execution
//!
//! Provides the runner trait and implementation used to drive the
//! remote-management cmdlets as local child processes.

pub mod error;
pub mod result;
pub mod shell;
pub mod traits;

pub use error::ExecError;
pub use result::CommandResult;
pub use shell::PowerShellRunner;
pub use traits::CommandRunner;
