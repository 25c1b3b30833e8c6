//! Foreign environment scope.

use anyhow::anyhow;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;

use pgfixtures::catalog::{foreign_state, user_object_counts};
use pgfixtures::connection::connect;
use pgfixtures::foreign::{self, ForeignEnvironment, FOREIGN_TABLE};
use pgfixtures::provision::{create_database, ProvisionPolicy};

use crate::common::FixtureDb;

#[tokio::test]
async fn test_scope_links_remote_table() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;
    let settings = db.settings.clone();

    let rows = ForeignEnvironment::scope(&db.settings, &db.out, || async move {
        let primary = connect(&settings, Some(&settings.primary_database)).await?;
        let state = foreign_state(&primary, &settings.foreign_database).await?;
        assert!(state.is_complete(), "incomplete environment: {:?}", state);

        // Write through the proxy, read back from the remote side
        primary
            .batch_execute("INSERT INTO foreign_foo (a, b) VALUES (1, 'one'), (2, 'two')")
            .await?;
        let remote = connect(&settings, Some(&settings.foreign_database)).await?;
        let count: i64 = remote
            .query_one("SELECT count(*) FROM public.foreign_foo", &[])
            .await?
            .get(0);
        Ok::<i64, anyhow::Error>(count)
    })
    .await
    .unwrap();

    assert_eq!(rows, 2);
    let state = foreign_state(&db.client, &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.is_absent(), "leftovers after scope: {:?}", state);
}

#[tokio::test]
async fn test_scope_tears_down_after_error() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    let result: anyhow::Result<()> =
        ForeignEnvironment::scope(&db.settings, &db.out, || async { Err(anyhow!("boom")) }).await;

    assert_eq!(result.unwrap_err().to_string(), "boom");
    let state = foreign_state(&db.client, &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.is_absent(), "leftovers after failed body: {:?}", state);
}

#[tokio::test]
async fn test_scope_tears_down_after_panic() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    let outcome = AssertUnwindSafe(ForeignEnvironment::scope(&db.settings, &db.out, || async {
        let linked = 1;
        assert_eq!(linked, 2, "failing assertion inside the scope");
        Ok::<(), anyhow::Error>(())
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err(), "panic should propagate out of the scope");
    let state = foreign_state(&db.client, &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.is_absent(), "leftovers after panic: {:?}", state);
}

#[tokio::test]
async fn test_teardown_without_setup_is_noop() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    foreign::teardown(&db.settings, &db.out).await.unwrap();
    foreign::teardown(&db.settings, &db.out).await.unwrap();

    let state = foreign_state(&db.client, &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.is_absent());
}

#[tokio::test]
async fn test_foreign_table_requires_server() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    foreign::install_extension(&db.client, &db.out).await.unwrap();
    let result = foreign::create_foreign_table(&db.client, &db.out).await;
    assert!(
        result.is_err(),
        "foreign table must not be creatable before its server"
    );

    foreign::teardown_on(&db.client, &db.settings, &db.out)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_setup_keeps_existing_objects() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    // A leftover remote table makes step 2 fail
    create_database(
        &db.settings,
        &db.settings.foreign_database,
        ProvisionPolicy::Strict,
        &db.out,
    )
    .await
    .unwrap();
    foreign::create_remote_table(&db.settings, &db.out)
        .await
        .unwrap();

    let result = ForeignEnvironment::setup(&db.settings, &db.out).await;
    assert!(result.is_err(), "duplicate remote table should fail setup");

    let state = foreign_state(&db.client, &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.database, "pre-existing database was dropped");
    assert!(!state.extension && !state.server && !state.foreign_table);

    let remote = connect(&db.settings, Some(&db.settings.foreign_database))
        .await
        .unwrap();
    let table = remote
        .query_one("SELECT to_regclass('public.foreign_foo') IS NOT NULL", &[])
        .await
        .unwrap();
    assert!(table.get::<_, bool>(0), "pre-existing remote table was dropped");
    drop(remote);

    foreign::teardown(&db.settings, &db.out).await.unwrap();
}

#[tokio::test]
async fn test_failed_setup_removes_what_it_built() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    // A plain local table with the foreign table's name makes the last step fail
    db.client
        .batch_execute("CREATE TABLE foreign_foo (x int)")
        .await
        .unwrap();

    let result = ForeignEnvironment::setup(&db.settings, &db.out).await;
    assert!(result.is_err(), "name clash should fail the last step");

    let state = foreign_state(&db.client, &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.is_absent(), "leftovers after failed setup: {:?}", state);

    db.client
        .batch_execute("DROP TABLE foreign_foo")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_second_setup_leaves_live_environment() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;

    let env = ForeignEnvironment::setup(&db.settings, &db.out).await.unwrap();
    let again = ForeignEnvironment::setup(&db.settings, &db.out).await;
    assert!(again.is_err(), "rebuilding over a live environment should fail");

    let state = foreign_state(env.client(), &db.settings.foreign_database)
        .await
        .unwrap();
    assert!(state.is_complete(), "first environment was damaged: {:?}", state);

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_foreign_table_alongside_fixture_schema() {
    skip_if_no_db!();
    let db = FixtureDb::acquire().await;
    db.setup().await;

    let env = ForeignEnvironment::setup(&db.settings, &db.out).await.unwrap();
    let counts = user_object_counts(env.client()).await.unwrap();
    assert_eq!(counts.foreign_tables, 1);
    assert_eq!(counts.tables, 6);

    let exists = env
        .client()
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM pg_class WHERE relkind = 'f' AND relname = $1)",
            &[&FOREIGN_TABLE],
        )
        .await
        .unwrap();
    assert!(exists.get::<_, bool>(0));

    env.teardown().await.unwrap();
    db.teardown().await;
    assert!(user_object_counts(&db.client).await.unwrap().is_empty());
}
