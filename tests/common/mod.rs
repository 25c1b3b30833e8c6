//! Common test infrastructure for pgfixtures integration tests.
//!
//! Provides:
//! - A once-per-process connectivity probe backing `skip_if_no_db!`
//! - FixtureDb: exclusive access to the primary fixture database
//! - ScratchDatabase: a throwaway database dropped when the test is done

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use pgfixtures::config::{Config, Overrides, Settings};
use pgfixtures::connection::connect;
use pgfixtures::probe::{probe, ConnectivityStatus};
use pgfixtures::provision::{create_database, drop_database_if_exists, ProvisionPolicy};
use pgfixtures::{fixture, foreign, Output};
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::Client;

static SCRATCH_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Settings from PGFIXTURES_* env vars, ignoring any pgfixtures.toml in cwd.
pub fn settings() -> Settings {
    Settings::resolve(&Config::default(), &Overrides::default())
        .expect("Invalid PGFIXTURES_* environment")
}

/// Probe result for the whole test process.
///
/// The probe runs on its own runtime the first time it is asked for, so the
/// result can be read from sync code and from any test's runtime.
pub fn connectivity() -> &'static ConnectivityStatus {
    static STATUS: OnceLock<ConnectivityStatus> = OnceLock::new();
    STATUS.get_or_init(|| {
        std::thread::spawn(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map(|rt| rt.block_on(probe(&settings())))
                .unwrap_or_else(|e| ConnectivityStatus::unreachable(e.to_string()))
        })
        .join()
        .unwrap_or_else(|_| ConnectivityStatus::unreachable("probe thread panicked"))
    })
}

/// Skip test if the probe could not reach the server
#[macro_export]
macro_rules! skip_if_no_db {
    () => {
        if $crate::common::connectivity().should_skip() {
            eprintln!(
                "Skipping test: {}",
                pgfixtures::probe::ConnectivityStatus::skip_reason(&$crate::common::settings())
            );
            return;
        }
    };
}

/// The fixture and foreign databases have fixed names, so tests using them
/// take turns.
fn db_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Exclusive handle on a clean primary fixture database.
pub struct FixtureDb {
    pub settings: Settings,
    pub client: Client,
    pub out: Output,
    _guard: MutexGuard<'static, ()>,
}

impl FixtureDb {
    /// Lock, ensure the database exists and clear leftovers of earlier runs.
    pub async fn acquire() -> Self {
        let guard = db_lock().lock().await;
        let settings = settings();
        let out = Output::silent();

        create_database(
            &settings,
            &settings.primary_database,
            ProvisionPolicy::IgnoreFailures,
            &out,
        )
        .await
        .expect("Failed to ensure primary database");

        let client = connect(&settings, Some(&settings.primary_database))
            .await
            .expect("Failed to connect to primary database");

        foreign::teardown_on(&client, &settings, &out)
            .await
            .expect("Failed to clear foreign environment");
        fixture::teardown(&client, &out)
            .await
            .expect("Failed to clear fixture schema");

        Self {
            settings,
            client,
            out,
            _guard: guard,
        }
    }

    pub async fn setup(&self) {
        fixture::setup(&self.client, &self.out)
            .await
            .expect("Fixture setup failed");
    }

    pub async fn teardown(&self) {
        fixture::teardown(&self.client, &self.out)
            .await
            .expect("Fixture teardown failed");
    }
}

/// A uniquely named database, removed by [`ScratchDatabase::drop_now`].
pub struct ScratchDatabase {
    pub name: String,
    pub client: Client,
}

impl ScratchDatabase {
    pub async fn create() -> Self {
        let settings = settings();
        let count = SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst);
        let name = format!("pgfixtures_scratch_{}_{}", std::process::id(), count);

        create_database(&settings, &name, ProvisionPolicy::Strict, &Output::silent())
            .await
            .expect("Failed to create scratch database");
        let client = connect(&settings, Some(&name))
            .await
            .expect("Failed to connect to scratch database");

        Self { name, client }
    }

    pub async fn drop_now(self) {
        let Self { name, client } = self;
        drop(client);

        let admin = connect(&settings(), None)
            .await
            .expect("Failed to connect for scratch cleanup");
        drop_database_if_exists(&admin, &name, &Output::silent())
            .await
            .expect("Failed to drop scratch database");
    }
}

/// A scratch database name that is never created.
pub fn unused_database_name() -> String {
    let count = SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("pgfixtures_scratch_{}_{}", std::process::id(), count)
}

/// Settings pointing at a port nothing listens on.
pub fn unreachable_settings() -> Settings {
    Settings {
        host: "127.0.0.1".to_string(),
        port: 1,
        connect_timeout: std::time::Duration::from_secs(2),
        ..Default::default()
    }
}
