//! pgboot application library.
//!
//! Wires the provisioning phases into a single idempotent bootstrap of the
//! holiday-booking OLTP database.

pub mod bootstrap;
pub mod schema;

pub use bootstrap::{Bootstrapper, InvocationContext};
pub use pgboot_kernel::{BootstrapResult, OverallStatus, PhaseOutcome};
pub use schema::oltp_schema;
