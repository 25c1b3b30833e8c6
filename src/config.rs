use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default fixture database names and credentials.
pub mod defaults {
    use std::time::Duration;

    pub const USER: &str = "postgres";
    pub const HOST: &str = "localhost";
    pub const PORT: u16 = 5432;

    /// Database the baseline schema is built in
    pub const PRIMARY_DATABASE: &str = "_test_db";

    /// Database holding the remote side of the foreign table
    pub const FOREIGN_DATABASE: &str = "_foreign_test_db";

    /// Connection timeout: fail fast on unreachable hosts
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Config file name looked up in the working directory
pub const CONFIG_FILE: &str = "pgfixtures.toml";

/// Configuration loaded from pgfixtures.toml
#[derive(Deserialize, Default, Debug)]
pub struct Config {
    pub server: Option<ServerConfig>,
    pub databases: Option<DatabasesConfig>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Duration string such as "5s" or "500ms"
    pub connect_timeout: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DatabasesConfig {
    pub primary: Option<String>,
    pub foreign: Option<String>,
}

impl Config {
    /// Load config from file, or return default if no config exists.
    /// An explicit path MUST exist; the default ./pgfixtures.toml is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("Config file not found: {}", p.display());
                }
                p
            }
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    default_path
                } else {
                    return Ok(Config::default());
                }
            }
        };

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Values supplied on the command line. They win over everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database: Option<String>,
    pub foreign_database: Option<String>,
}

/// Administrative connection parameters shared by every fixture connection.
///
/// Only the target database varies between connections: none, the primary
/// fixture database, or the foreign one.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Never printed; see [`Settings::display`]
    pub password: Option<String>,
    pub primary_database: String,
    pub foreign_database: String,
    pub connect_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            user: defaults::USER.to_string(),
            password: None,
            primary_database: defaults::PRIMARY_DATABASE.to_string(),
            foreign_database: defaults::FOREIGN_DATABASE.to_string(),
            connect_timeout: defaults::CONNECT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// Resolution order: CLI overrides > env > config file > defaults.
    pub fn resolve(config: &Config, overrides: &Overrides) -> Result<Self> {
        Self::resolve_with_env(config, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve settings with an explicit environment lookup.
    pub fn resolve_with_env<F>(config: &Config, overrides: &Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        // Config file
        if let Some(ref server) = config.server {
            if let Some(ref host) = server.host {
                settings.host = host.clone();
            }
            if let Some(port) = server.port {
                settings.port = port;
            }
            if let Some(ref user) = server.user {
                settings.user = user.clone();
            }
            if server.password.is_some() {
                settings.password = server.password.clone();
            }
            if let Some(ref timeout) = server.connect_timeout {
                settings.connect_timeout = parse_duration(timeout)
                    .context("Invalid server.connect_timeout in config")?;
            }
        }
        if let Some(ref dbs) = config.databases {
            if let Some(ref primary) = dbs.primary {
                settings.primary_database = primary.clone();
            }
            if let Some(ref foreign) = dbs.foreign {
                settings.foreign_database = foreign.clone();
            }
        }

        // Environment: URL first, then individual variables on top of it
        if let Some(url) = env("PGFIXTURES_URL") {
            settings.apply_url(&url)?;
        }
        if let Some(host) = env("PGFIXTURES_HOST") {
            settings.host = host;
        }
        if let Some(port) = env("PGFIXTURES_PORT") {
            settings.port = port
                .parse()
                .with_context(|| format!("Invalid PGFIXTURES_PORT: '{}'", port))?;
        }
        if let Some(user) = env("PGFIXTURES_USER") {
            settings.user = user;
        }
        if let Some(password) = env("PGFIXTURES_PASSWORD") {
            settings.password = Some(password);
        }

        // CLI
        if let Some(ref host) = overrides.host {
            settings.host = host.clone();
        }
        if let Some(port) = overrides.port {
            settings.port = port;
        }
        if let Some(ref user) = overrides.user {
            settings.user = user.clone();
        }
        if let Some(ref db) = overrides.database {
            settings.primary_database = db.clone();
        }
        if let Some(ref db) = overrides.foreign_database {
            settings.foreign_database = db.clone();
        }

        if settings.primary_database == settings.foreign_database {
            bail!(
                "Primary and foreign fixture databases must differ (both are '{}')",
                settings.primary_database
            );
        }

        Ok(settings)
    }

    /// Apply a postgres:// URL. The path, when present, names the primary database.
    fn apply_url(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).with_context(|| "Invalid PGFIXTURES_URL format")?;
        if parsed.scheme() != "postgres" && parsed.scheme() != "postgresql" {
            bail!(
                "PGFIXTURES_URL must use the postgres:// scheme, got '{}'",
                parsed.scheme()
            );
        }

        if let Some(host) = parsed.host_str() {
            self.host = host.to_string();
        }
        if let Some(port) = parsed.port() {
            self.port = port;
        }
        if !parsed.username().is_empty() {
            self.user = parsed.username().to_string();
        }
        if let Some(password) = parsed.password() {
            self.password = Some(password.to_string());
        }
        let database = parsed.path().trim_start_matches('/');
        if !database.is_empty() {
            self.primary_database = database.to_string();
        }
        Ok(())
    }

    /// Display string for banners (never includes password)
    pub fn display(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("Empty duration string");
    }

    let (num_part, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else {
        // Default to seconds if no unit
        (s, "s")
    };

    let num: u64 = num_part
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration number: '{}'", num_part))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => match num.checked_mul(60) {
            Some(secs) => Duration::from_secs(secs),
            None => bail!("Duration too large: '{}'", s),
        },
        _ => bail!("Unknown duration unit: '{}'", unit),
    };

    Ok(duration)
}
