//! Cross-database foreign environment.
//!
//! Builds a second physical database holding one table, and links it into
//! the primary fixture database through postgres_fdw:
//!
//! 1. ensure the foreign database exists
//! 2. create the remote table inside it
//! 3. install the FDW extension on the primary database
//! 4. define the foreign server
//! 5. map the current user onto it
//! 6. create the local foreign table proxying the remote one
//!
//! Each step depends on the previous one. Teardown is guarded at every step
//! and succeeds whether or not setup got anywhere.

use anyhow::{Context, Result};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio_postgres::Client;

use crate::catalog::foreign_state;
use crate::config::Settings;
use crate::connection::{connect, execute};
use crate::output::Output;
use crate::provision::{
    create_database, drop_database_if_exists, ProvisionOutcome, ProvisionPolicy,
};
use crate::sql::{qualified, quote_ident, quote_literal};

pub const FDW_EXTENSION: &str = "postgres_fdw";
pub const SERVER_NAME: &str = "foreign_db_server";
pub const REMOTE_SCHEMA: &str = "public";
pub const REMOTE_TABLE: &str = "foreign_foo";
pub const FOREIGN_TABLE: &str = "foreign_foo";

/// Columns shared by the remote table and its foreign proxy.
const TABLE_COLUMNS: &str = "(a int, b text)";

/// Address the database server uses to reach itself.
const LOOPBACK_HOST: &str = "127.0.0.1";

/// Objects a single `build` call created, as opposed to found in place.
#[derive(Debug, Default)]
struct Built {
    database: bool,
    remote_table: bool,
    extension: bool,
    server: bool,
    user_mapping: bool,
}

/// A live foreign environment, owning the primary-database connection.
pub struct ForeignEnvironment {
    primary: Client,
    settings: Settings,
    out: Output,
}

impl ForeignEnvironment {
    /// Build the environment. On failure, the objects this call created are
    /// removed again before the setup error is returned; anything that
    /// existed beforehand is left alone.
    pub async fn setup(settings: &Settings, out: &Output) -> Result<Self> {
        let primary = connect(settings, Some(&settings.primary_database)).await?;
        let env = Self {
            primary,
            settings: settings.clone(),
            out: out.clone(),
        };

        let mut built = Built::default();
        if let Err(e) = env.build(&mut built).await {
            if let Err(cleanup) = env.undo(&built).await {
                out.warn(&format!(
                    "Warning: cleanup after failed foreign setup also failed: {cleanup:#}"
                ));
            }
            return Err(e);
        }

        out.verbose(&format!(
            "Foreign environment ready: {} -> {}.{}",
            FOREIGN_TABLE, settings.foreign_database, REMOTE_TABLE
        ));
        Ok(env)
    }

    async fn build(&self, built: &mut Built) -> Result<()> {
        let before = foreign_state(&self.primary, &self.settings.foreign_database).await?;

        let outcome = create_database(
            &self.settings,
            &self.settings.foreign_database,
            ProvisionPolicy::IgnoreFailures,
            &self.out,
        )
        .await?;
        built.database = outcome == ProvisionOutcome::Created;

        create_remote_table(&self.settings, &self.out).await?;
        built.remote_table = true;

        install_extension(&self.primary, &self.out).await?;
        built.extension = !before.extension;

        create_server(&self.primary, &self.settings, &self.out).await?;
        built.server = !before.server;

        create_user_mapping(&self.primary, &self.settings, &self.out).await?;
        built.user_mapping = true;

        create_foreign_table(&self.primary, &self.out).await
    }

    /// Remove what a failed `build` created, newest first.
    async fn undo(&self, built: &Built) -> Result<()> {
        if built.server {
            execute(&self.primary, &self.out, &drop_server_sql()).await?;
        } else if built.user_mapping {
            execute(
                &self.primary,
                &self.out,
                &format!(
                    "DROP USER MAPPING IF EXISTS FOR current_user SERVER {}",
                    quote_ident(SERVER_NAME)
                ),
            )
            .await?;
        }
        if built.extension {
            execute(&self.primary, &self.out, &drop_extension_sql()).await?;
        }
        if built.database {
            drop_database_if_exists(&self.primary, &self.settings.foreign_database, &self.out)
                .await?;
        } else if built.remote_table {
            let remote = connect(&self.settings, Some(&self.settings.foreign_database)).await?;
            execute(
                &remote,
                &self.out,
                &format!(
                    "DROP TABLE IF EXISTS {}",
                    qualified(REMOTE_SCHEMA, REMOTE_TABLE)
                ),
            )
            .await?;
        }
        Ok(())
    }

    /// Connection to the primary database the foreign objects live on.
    pub fn client(&self) -> &Client {
        &self.primary
    }

    /// Remove the server (with its mapping and foreign table), the extension
    /// and the foreign database.
    pub async fn teardown(&self) -> Result<()> {
        teardown_on(&self.primary, &self.settings, &self.out).await
    }

    /// Run `body` inside a foreign environment.
    ///
    /// Teardown runs on every exit path: success, an `Err` from the body, or
    /// a panic inside it (which is resumed after teardown). A teardown
    /// failure is only surfaced when the body itself succeeded.
    pub async fn scope<F, Fut, T>(settings: &Settings, out: &Output, body: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let env = Self::setup(settings, out).await?;

        let result = AssertUnwindSafe(async move { body().await })
            .catch_unwind()
            .await;
        let cleanup = env.teardown().await;

        match result {
            Ok(Ok(value)) => {
                cleanup?;
                Ok(value)
            }
            Ok(Err(e)) => {
                if let Err(cleanup) = cleanup {
                    out.warn(&format!("Warning: foreign teardown failed: {cleanup:#}"));
                }
                Err(e)
            }
            Err(panic) => {
                if let Err(cleanup) = cleanup {
                    out.warn(&format!("Warning: foreign teardown failed: {cleanup:#}"));
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// Create the remote table inside the foreign database.
pub async fn create_remote_table(settings: &Settings, out: &Output) -> Result<()> {
    let remote = connect(settings, Some(&settings.foreign_database)).await?;
    execute(
        &remote,
        out,
        &format!(
            "CREATE TABLE {} {}",
            qualified(REMOTE_SCHEMA, REMOTE_TABLE),
            TABLE_COLUMNS
        ),
    )
    .await
    .context("Failed to create remote table")
}

pub async fn install_extension(client: &Client, out: &Output) -> Result<()> {
    execute(
        client,
        out,
        &format!("CREATE EXTENSION IF NOT EXISTS {}", quote_ident(FDW_EXTENSION)),
    )
    .await
}

/// Define the foreign server pointing back at this database server.
///
/// The server connects to itself, so it uses loopback and its own
/// configured port rather than the client-side address.
pub async fn create_server(client: &Client, settings: &Settings, out: &Output) -> Result<()> {
    let row = client
        .query_one("SELECT current_setting('port')", &[])
        .await
        .context("Failed to read server port")?;
    let port: String = row.get(0);

    execute(
        client,
        out,
        &format!(
            "CREATE SERVER IF NOT EXISTS {} FOREIGN DATA WRAPPER {} \
             OPTIONS (host {}, port {}, dbname {})",
            quote_ident(SERVER_NAME),
            quote_ident(FDW_EXTENSION),
            quote_literal(LOOPBACK_HOST),
            quote_literal(&port),
            quote_literal(&settings.foreign_database),
        ),
    )
    .await
}

pub async fn create_user_mapping(client: &Client, settings: &Settings, out: &Output) -> Result<()> {
    execute(client, out, &user_mapping_sql(settings)).await
}

fn user_mapping_sql(settings: &Settings) -> String {
    let mut options = vec![format!("user {}", quote_literal(&settings.user))];
    if let Some(ref password) = settings.password {
        options.push(format!("password {}", quote_literal(password)));
    }
    format!(
        "CREATE USER MAPPING FOR current_user SERVER {} OPTIONS ({})",
        quote_ident(SERVER_NAME),
        options.join(", ")
    )
}

/// Create the local foreign table. Requires the server and user mapping.
pub async fn create_foreign_table(client: &Client, out: &Output) -> Result<()> {
    execute(
        client,
        out,
        &format!(
            "CREATE FOREIGN TABLE {} {} SERVER {} OPTIONS (schema_name {}, table_name {})",
            quote_ident(FOREIGN_TABLE),
            TABLE_COLUMNS,
            quote_ident(SERVER_NAME),
            quote_literal(REMOTE_SCHEMA),
            quote_literal(REMOTE_TABLE),
        ),
    )
    .await
}

fn drop_server_sql() -> String {
    format!("DROP SERVER IF EXISTS {} CASCADE", quote_ident(SERVER_NAME))
}

fn drop_extension_sql() -> String {
    format!("DROP EXTENSION IF EXISTS {}", quote_ident(FDW_EXTENSION))
}

/// Guarded teardown statements run on the primary connection.
pub fn teardown_statements() -> Vec<String> {
    vec![drop_server_sql(), drop_extension_sql()]
}

/// Tear down on an existing primary connection. A no-op when nothing exists.
pub async fn teardown_on(primary: &Client, settings: &Settings, out: &Output) -> Result<()> {
    for statement in teardown_statements() {
        execute(primary, out, &statement).await?;
    }
    drop_database_if_exists(primary, &settings.foreign_database, out)
        .await
        .context("Failed to drop foreign database")
}

/// Connect to the primary database and tear down.
pub async fn teardown(settings: &Settings, out: &Output) -> Result<()> {
    let primary = connect(settings, Some(&settings.primary_database)).await?;
    teardown_on(&primary, settings, out).await
}
