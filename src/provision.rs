//! Physical database provisioning.
//!
//! `create_database` means "ensure this database exists". Failures of the
//! CREATE DATABASE statement are reported as a [`ProvisionOutcome`] rather
//! than an error, under a named [`ProvisionPolicy`].

use anyhow::{bail, Result};
use serde::Serialize;
use tokio_postgres::error::SqlState;
use tokio_postgres::Client;

use crate::config::Settings;
use crate::connection::{connect, execute};
use crate::output::Output;
use crate::sql::quote_ident;

/// How create failures are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProvisionPolicy {
    /// Any CREATE DATABASE failure is assumed benign ("already exists").
    #[default]
    IgnoreFailures,
    /// Only a duplicate database is benign; anything else is an error.
    Strict,
}

/// What happened when ensuring a database exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
    Failed { reason: String },
}

impl ProvisionOutcome {
    /// Classify a failed CREATE DATABASE by its SQLSTATE.
    pub fn from_failure(code: Option<&SqlState>, reason: String) -> Self {
        match code {
            Some(code) if *code == SqlState::DUPLICATE_DATABASE => ProvisionOutcome::AlreadyExists,
            _ => ProvisionOutcome::Failed { reason },
        }
    }
}

impl std::fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionOutcome::Created => write!(f, "created"),
            ProvisionOutcome::AlreadyExists => write!(f, "already exists"),
            ProvisionOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Ensure database `name` exists.
///
/// Connects without a target database. A connection failure always
/// propagates; only the CREATE statement is subject to `policy`.
pub async fn create_database(
    settings: &Settings,
    name: &str,
    policy: ProvisionPolicy,
    out: &Output,
) -> Result<ProvisionOutcome> {
    let client = connect(settings, None).await?;

    // Can't use parameters for identifiers
    let create_sql = format!("CREATE DATABASE {}", quote_ident(name));
    out.sql(&create_sql);

    let outcome = match client.batch_execute(&create_sql).await {
        Ok(()) => ProvisionOutcome::Created,
        Err(e) => ProvisionOutcome::from_failure(e.code(), db_error_message(&e)),
    };

    match (&outcome, policy) {
        (ProvisionOutcome::Failed { reason }, ProvisionPolicy::Strict) => {
            bail!("Failed to create database '{}': {}", name, reason)
        }
        (ProvisionOutcome::Failed { reason }, ProvisionPolicy::IgnoreFailures) => {
            out.verbose(&format!(
                "Ignoring CREATE DATABASE failure for '{}': {}",
                name, reason
            ));
        }
        _ => out.verbose(&format!("Database '{}' {}", name, outcome)),
    }

    Ok(outcome)
}

/// Ends every session on a database except the caller's own.
const TERMINATE_BACKENDS_SQL: &str = "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
     WHERE datname = $1 AND pid <> pg_backend_pid()";

/// Drop database `name` if it exists, first terminating other sessions on it.
///
/// Runs on an existing connection, which must not be connected to `name`.
pub async fn drop_database_if_exists(client: &Client, name: &str, out: &Output) -> Result<()> {
    out.sql(TERMINATE_BACKENDS_SQL);
    client.execute(TERMINATE_BACKENDS_SQL, &[&name]).await?;

    execute(
        client,
        out,
        &format!("DROP DATABASE IF EXISTS {}", quote_ident(name)),
    )
    .await
}

/// Server-side message when available, else the driver's error text.
fn db_error_message(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}
