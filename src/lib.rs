//! Deterministic PostgreSQL fixtures for schema introspection and diffing tests.
//!
//! Typical session:
//!
//! ```no_run
//! # async fn session() -> anyhow::Result<()> {
//! use pgfixtures::{config::Settings, connection, fixture, probe, provision, Output};
//!
//! let settings = Settings::default();
//! let out = Output::silent();
//!
//! let status = probe::probe(&settings).await;
//! if status.should_skip() {
//!     eprintln!("{}", probe::ConnectivityStatus::skip_reason(&settings));
//!     return Ok(());
//! }
//!
//! provision::create_database(
//!     &settings,
//!     &settings.primary_database,
//!     provision::ProvisionPolicy::default(),
//!     &out,
//! )
//! .await?;
//! let client = connection::connect(&settings, Some(&settings.primary_database)).await?;
//! fixture::setup(&client, &out).await?;
//! // ... exercise the schema tool ...
//! fixture::teardown(&client, &out).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod connection;
pub mod exit_codes;
pub mod fixture;
pub mod foreign;
pub mod output;
pub mod probe;
pub mod provision;
pub mod sql;

pub use output::Output;
