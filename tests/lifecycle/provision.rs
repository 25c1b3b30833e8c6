//! Idempotent database creation.

use pgfixtures::catalog::database_exists;
use pgfixtures::connection::connect;
use pgfixtures::provision::{create_database, drop_database_if_exists, ProvisionOutcome, ProvisionPolicy};
use pgfixtures::Output;

use crate::common::{settings, unreachable_settings, unused_database_name};

#[tokio::test]
async fn test_create_database_twice_never_fails() {
    skip_if_no_db!();
    let settings = settings();
    let out = Output::silent();
    let name = unused_database_name();

    let first = create_database(&settings, &name, ProvisionPolicy::IgnoreFailures, &out)
        .await
        .unwrap();
    let second = create_database(&settings, &name, ProvisionPolicy::IgnoreFailures, &out)
        .await
        .unwrap();

    assert_eq!(first, ProvisionOutcome::Created);
    assert_eq!(second, ProvisionOutcome::AlreadyExists);

    let admin = connect(&settings, None).await.unwrap();
    assert!(database_exists(&admin, &name).await.unwrap());
    drop_database_if_exists(&admin, &name, &out).await.unwrap();
    assert!(!database_exists(&admin, &name).await.unwrap());
}

#[tokio::test]
async fn test_strict_policy_accepts_existing_database() {
    skip_if_no_db!();
    let settings = settings();
    let out = Output::silent();
    let name = unused_database_name();

    create_database(&settings, &name, ProvisionPolicy::Strict, &out)
        .await
        .unwrap();
    let again = create_database(&settings, &name, ProvisionPolicy::Strict, &out)
        .await
        .expect("duplicate database is benign even under Strict");
    assert_eq!(again, ProvisionOutcome::AlreadyExists);

    let admin = connect(&settings, None).await.unwrap();
    drop_database_if_exists(&admin, &name, &out).await.unwrap();
}

#[tokio::test]
async fn test_drop_missing_database_is_noop() {
    skip_if_no_db!();
    let admin = connect(&settings(), None).await.unwrap();
    drop_database_if_exists(&admin, &unused_database_name(), &Output::silent())
        .await
        .expect("dropping an absent database should succeed");
}

#[tokio::test]
async fn test_connection_failure_is_not_swallowed() {
    let result = create_database(
        &unreachable_settings(),
        "never_created",
        ProvisionPolicy::IgnoreFailures,
        &Output::silent(),
    )
    .await;

    let err = result.expect_err("connection errors must propagate");
    assert!(
        format!("{err:#}").contains("Failed to connect"),
        "unexpected error: {err:#}"
    );
}
