//! Primary database and baseline schema commands.

use anyhow::Result;
use serde::Serialize;

use pgfixtures::config::Settings;
use pgfixtures::connection::connect;
use pgfixtures::exit_codes;
use pgfixtures::fixture;
use pgfixtures::output::{JsonResponse, Output};
use pgfixtures::provision::{self, ProvisionOutcome, ProvisionPolicy};

#[derive(Serialize)]
struct SetupResponse {
    database: String,
    provision: ProvisionOutcome,
    statements: usize,
}

pub async fn create_db(
    settings: &Settings,
    name: Option<String>,
    strict: bool,
    out: &Output,
) -> Result<i32> {
    let name = name.unwrap_or_else(|| settings.primary_database.clone());
    let policy = if strict {
        ProvisionPolicy::Strict
    } else {
        ProvisionPolicy::IgnoreFailures
    };
    let outcome = provision::create_database(settings, &name, policy, out).await?;

    if out.is_json() {
        out.json(&JsonResponse::new(&outcome))?;
    } else {
        match outcome {
            ProvisionOutcome::Created => out.success(&format!("Created database '{}'", name)),
            ProvisionOutcome::AlreadyExists => {
                out.info(&format!("Database '{}' already exists", name))
            }
            ProvisionOutcome::Failed { ref reason } => {
                out.warn(&format!("Could not create '{}' (ignored): {}", name, reason))
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

/// Create the primary database if needed, then build the baseline schema.
pub async fn setup(settings: &Settings, out: &Output) -> Result<i32> {
    let outcome = provision::create_database(
        settings,
        &settings.primary_database,
        ProvisionPolicy::IgnoreFailures,
        out,
    )
    .await?;

    let client = connect(settings, Some(&settings.primary_database)).await?;
    fixture::setup(&client, out).await?;

    if out.is_json() {
        out.json(&JsonResponse::new(SetupResponse {
            database: settings.primary_database.clone(),
            provision: outcome,
            statements: fixture::SETUP_PROGRAM.len(),
        }))?;
    } else {
        out.success(&format!(
            "Fixture schema created in '{}' ({} statements)",
            settings.primary_database,
            fixture::SETUP_PROGRAM.len()
        ));
    }
    Ok(exit_codes::SUCCESS)
}

pub async fn teardown(settings: &Settings, out: &Output) -> Result<i32> {
    drop_schema(settings, out).await?;
    if out.is_json() {
        out.json(&JsonResponse::new(&settings.primary_database))?;
    }
    Ok(exit_codes::SUCCESS)
}

/// Teardown followed by setup.
pub async fn reset(settings: &Settings, out: &Output) -> Result<i32> {
    drop_schema(settings, out).await?;
    setup(settings, out).await
}

async fn drop_schema(settings: &Settings, out: &Output) -> Result<()> {
    let client = connect(settings, Some(&settings.primary_database)).await?;
    fixture::teardown(&client, out).await?;
    out.success(&format!(
        "Fixture schema removed from '{}'",
        settings.primary_database
    ));
    Ok(())
}
