use anyhow::Result;
use colored::Colorize;

use pgfixtures::config::Settings;
use pgfixtures::exit_codes;
use pgfixtures::output::{JsonResponse, Output};
use pgfixtures::probe::{self, ConnectivityStatus};

/// Report reachability; exits 11 when the server cannot be reached.
pub async fn probe(settings: &Settings, out: &Output) -> Result<i32> {
    let status = probe::probe(settings).await;

    if out.is_json() {
        out.json(&JsonResponse::new(&status))?;
    } else if status.reachable {
        out.success(&format!(
            "Connected to {} (server_version_num {})",
            settings.display(),
            status.server_version
        ));
    } else {
        out.warn(&ConnectivityStatus::skip_reason(settings));
        if let Some(ref error) = status.error {
            out.info(&format!("{}", error.dimmed()));
        }
    }

    Ok(if status.reachable {
        exit_codes::SUCCESS
    } else {
        exit_codes::CONNECTION_FAILURE
    })
}
