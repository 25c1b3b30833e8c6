//! Command implementations for the pgfixtures CLI.
//!
//! Each submodule holds one command group. Handlers return the process exit
//! code on success; errors are reported by `main`.

mod db;
mod foreign;
mod probe;
mod status;

pub use db::{create_db, reset, setup, teardown};
pub use foreign::{foreign_setup, foreign_teardown};
pub use probe::probe;
pub use status::status;
