//! Connection factory for fixture databases.
//!
//! Every connection uses the same administrative credentials from
//! [`Settings`]; only the target database varies. Connections are never
//! shared: each operation opens its own and drops it when done.
//!
//! A tokio-postgres `Client` runs each statement in its own implicit
//! transaction unless one is opened explicitly, so every connection handed
//! out here is autocommitting. Nothing in this crate opens a transaction.

use anyhow::{Context, Result};
use tokio_postgres::{Client, NoTls};

use crate::config::Settings;
use crate::output::Output;

/// Open an autocommitting connection.
///
/// With `database = None` the server default applies (a database named
/// after the user), matching libpq behavior.
pub async fn connect(settings: &Settings, database: Option<&str>) -> Result<Client> {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&settings.host)
        .port(settings.port)
        .user(&settings.user)
        .application_name("pgfixtures")
        .connect_timeout(settings.connect_timeout);
    if let Some(ref password) = settings.password {
        pg.password(password);
    }
    if let Some(db) = database {
        pg.dbname(db);
    }

    let target = database.unwrap_or("<default>");
    let (client, connection) = tokio::time::timeout(settings.connect_timeout, pg.connect(NoTls))
        .await
        .with_context(|| {
            format!(
                "Connection to {}/{} timed out after {:?}",
                settings.display(),
                target,
                settings.connect_timeout
            )
        })?
        .with_context(|| format!("Failed to connect to {}/{}", settings.display(), target))?;

    // Connection task ends once the client is dropped
    tokio::spawn(async move {
        let _ = connection.await;
    });

    Ok(client)
}

/// Execute one statement, echoing it first when verbose.
pub async fn execute(client: &Client, out: &Output, statement: &str) -> Result<()> {
    out.sql(statement);
    client
        .batch_execute(statement)
        .await
        .with_context(|| format!("Statement failed: {}", statement.trim()))
}
