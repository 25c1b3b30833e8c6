//! Connectivity probe gating database-dependent tests.
//!
//! The probe is run once per test session and its [`ConnectivityStatus`] is
//! passed around as a value. It never fails: any error while connecting or
//! reading the server version is folded into `reachable = false`.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Settings;
use crate::connection::connect;

/// Result of the one-time connectivity probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityStatus {
    pub reachable: bool,
    /// `server_version_num`, e.g. 160002. Zero when unreachable.
    pub server_version: i32,
    /// Why the probe failed, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectivityStatus {
    pub fn reachable(server_version: i32) -> Self {
        Self {
            reachable: true,
            server_version,
            error: None,
        }
    }

    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            server_version: 0,
            error: Some(error.into()),
        }
    }

    /// Skip predicate for database-dependent tests.
    pub fn should_skip(&self) -> bool {
        !self.reachable
    }

    /// Fixed explanation attached to skipped tests.
    pub fn skip_reason(settings: &Settings) -> String {
        format!(
            "Need a postgres instance at {} accessible by user '{}'",
            settings.host, settings.user
        )
    }

    /// Major version, e.g. 16 for 160002.
    pub fn major_version(&self) -> i32 {
        self.server_version / 10000
    }
}

/// Attempt one connection without a target database.
pub async fn probe(settings: &Settings) -> ConnectivityStatus {
    match server_version(settings).await {
        Ok(version) => ConnectivityStatus::reachable(version),
        Err(e) => ConnectivityStatus::unreachable(format!("{e:#}")),
    }
}

async fn server_version(settings: &Settings) -> Result<i32> {
    let client = connect(settings, None).await?;
    let row = client
        .query_one("SHOW server_version_num", &[])
        .await
        .context("Failed to read server_version_num")?;
    parse_server_version(row.get(0))
}

fn parse_server_version(raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .with_context(|| format!("Unexpected server_version_num: '{}'", raw))
}
