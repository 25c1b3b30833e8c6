use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use pgfixtures::catalog::{self, ForeignState, ObjectCounts};
use pgfixtures::config::Settings;
use pgfixtures::connection::connect;
use pgfixtures::exit_codes;
use pgfixtures::output::{JsonResponse, Output};

#[derive(Serialize)]
struct StatusResponse {
    database: String,
    objects: ObjectCounts,
    foreign: ForeignState,
}

/// Show user object counts and the foreign environment state.
pub async fn status(settings: &Settings, out: &Output) -> Result<i32> {
    let client = connect(settings, Some(&settings.primary_database)).await?;
    let objects = catalog::user_object_counts(&client).await?;
    let foreign = catalog::foreign_state(&client, &settings.foreign_database).await?;

    if out.is_json() {
        out.json(&JsonResponse::new(StatusResponse {
            database: settings.primary_database.clone(),
            objects,
            foreign,
        }))?;
        return Ok(exit_codes::SUCCESS);
    }

    println!("{} {}", "Database:".bold(), settings.primary_database);
    println!();
    let rows = [
        ("schemas", objects.schemas),
        ("tables", objects.tables),
        ("views", objects.views),
        ("materialized views", objects.materialized_views),
        ("foreign tables", objects.foreign_tables),
        ("composite types", objects.composite_types),
        ("functions", objects.functions),
        ("domains", objects.domains),
    ];
    for (label, count) in rows {
        println!("  {:<20} {}", label, count);
    }
    println!();

    let mark = |present: bool| {
        if present {
            "present".green()
        } else {
            "absent".dimmed()
        }
    };
    println!("{}", "Foreign environment:".bold());
    println!("  {:<20} {}", "extension", mark(foreign.extension));
    println!("  {:<20} {}", "server", mark(foreign.server));
    println!("  {:<20} {}", "foreign table", mark(foreign.foreign_table));
    println!("  {:<20} {}", "database", mark(foreign.database));

    if objects.is_empty() {
        out.info(&format!("\n{}", "No fixture objects present.".dimmed()));
    }
    Ok(exit_codes::SUCCESS)
}
