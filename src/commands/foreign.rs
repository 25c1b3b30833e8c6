//! Foreign environment commands.

use anyhow::Result;

use pgfixtures::catalog;
use pgfixtures::config::Settings;
use pgfixtures::connection::connect;
use pgfixtures::exit_codes;
use pgfixtures::foreign::{self, ForeignEnvironment};
use pgfixtures::output::{JsonResponse, Output};
use pgfixtures::provision::{self, ProvisionPolicy};

pub async fn foreign_setup(settings: &Settings, out: &Output) -> Result<i32> {
    provision::create_database(
        settings,
        &settings.primary_database,
        ProvisionPolicy::IgnoreFailures,
        out,
    )
    .await?;

    let primary = connect(settings, Some(&settings.primary_database)).await?;
    let state = catalog::foreign_state(&primary, &settings.foreign_database).await?;
    if state.is_complete() {
        out.info(&format!(
            "Foreign environment already set up ('{}' -> '{}')",
            foreign::FOREIGN_TABLE,
            settings.foreign_database
        ));
    } else {
        ForeignEnvironment::setup(settings, out).await?;
        out.success(&format!(
            "Foreign table '{}' linked to database '{}'",
            foreign::FOREIGN_TABLE,
            settings.foreign_database
        ));
    }

    if out.is_json() {
        out.json(&JsonResponse::new(&settings.foreign_database))?;
    }
    Ok(exit_codes::SUCCESS)
}

pub async fn foreign_teardown(settings: &Settings, out: &Output) -> Result<i32> {
    foreign::teardown(settings, out).await?;
    out.success("Foreign environment removed");

    if out.is_json() {
        out.json(&JsonResponse::new(&settings.foreign_database))?;
    }
    Ok(exit_codes::SUCCESS)
}
