//! Baseline fixture schema.
//!
//! [`setup`] runs a fixed DDL program covering every object kind a schema
//! tool is expected to introspect; [`teardown`] removes all of it again.
//! The program order is load-bearing: dependents always follow their bases.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_postgres::Client;

use crate::connection::execute;
use crate::output::Output;
use crate::sql::quote_ident;

/// Namespaces created by the fixture (besides `public`).
pub const SCHEMAS: [&str; 2] = ["schema1", "schema2"];

/// The engine's always-present default namespace.
pub const DEFAULT_SCHEMA: &str = "public";

/// Comment attached to `schema1.bigint_t`.
pub const BIGINT_DOMAIN_COMMENT: &str = "a really large integer";

/// Kind of object a fixture step creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Schema,
    Table,
    View,
    MaterializedView,
    Type,
    Function,
    Domain,
    Comment,
}

/// One statement of the fixture program.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FixtureStep {
    pub kind: ObjectKind,
    /// Schema-qualified name of the object the step creates or touches
    pub object: &'static str,
    pub sql: &'static str,
}

const fn step(kind: ObjectKind, object: &'static str, sql: &'static str) -> FixtureStep {
    FixtureStep { kind, object, sql }
}

/// The baseline DDL program, in execution order.
pub const SETUP_PROGRAM: &[FixtureStep] = &[
    // schemas
    step(ObjectKind::Schema, "schema1", "CREATE SCHEMA schema1"),
    step(ObjectKind::Schema, "schema2", "CREATE SCHEMA schema2"),
    // tables
    step(
        ObjectKind::Table,
        "public.tbl1",
        "CREATE TABLE tbl1 (id1 integer, txt1 text, CONSTRAINT id_text PRIMARY KEY (id1, txt1))",
    ),
    step(
        ObjectKind::Table,
        "public.tbl2",
        "CREATE TABLE tbl2 (id2 serial, txt2 text)",
    ),
    step(
        ObjectKind::Table,
        "schema1.s1_tbl1",
        "CREATE TABLE schema1.s1_tbl1 (id1 integer, txt1 text)",
    ),
    step(
        ObjectKind::Table,
        "public.tbl3",
        "CREATE TABLE tbl3 (c3 circle, EXCLUDE USING gist (c3 WITH &&))",
    ),
    step(
        ObjectKind::Table,
        "public.Inh1",
        "CREATE TABLE \"Inh1\" (value1 integer) INHERITS (tbl1)",
    ),
    step(
        ObjectKind::Table,
        "public.inh2",
        "CREATE TABLE inh2 (value2 integer) INHERITS (tbl1, tbl2)",
    ),
    // views
    step(
        ObjectKind::View,
        "public.vw1",
        "CREATE VIEW vw1 AS SELECT * FROM tbl1",
    ),
    step(
        ObjectKind::View,
        "schema1.s1_vw1",
        "CREATE VIEW schema1.s1_vw1 AS SELECT * FROM schema1.s1_tbl1",
    ),
    // materialized views
    step(
        ObjectKind::MaterializedView,
        "public.mvw1",
        "CREATE MATERIALIZED VIEW mvw1 AS SELECT * FROM tbl1",
    ),
    step(
        ObjectKind::MaterializedView,
        "schema1.s1_mvw1",
        "CREATE MATERIALIZED VIEW schema1.s1_mvw1 AS SELECT * FROM schema1.s1_tbl1",
    ),
    // composite type
    step(
        ObjectKind::Type,
        "public.foo",
        "CREATE TYPE foo AS (a int, b text)",
    ),
    // functions
    step(
        ObjectKind::Function,
        "public.func1",
        "CREATE FUNCTION func1() RETURNS int LANGUAGE sql AS $$SELECT 1$$",
    ),
    step(
        ObjectKind::Function,
        "schema1.s1_func1",
        "CREATE FUNCTION schema1.s1_func1() RETURNS int LANGUAGE sql AS $$SELECT 2$$",
    ),
    // domains
    step(
        ObjectKind::Domain,
        "public.gender_t",
        "CREATE DOMAIN gender_t char(1) CHECK (value IN ('F', 'M'))",
    ),
    step(
        ObjectKind::Domain,
        "schema1.smallint_t",
        "CREATE DOMAIN schema1.smallint_t smallint",
    ),
    step(
        ObjectKind::Domain,
        "schema1.bigint_t",
        "CREATE DOMAIN schema1.bigint_t bigint",
    ),
    step(
        ObjectKind::Comment,
        "schema1.bigint_t",
        "COMMENT ON DOMAIN schema1.bigint_t IS 'a really large integer'",
    ),
];

/// Build the baseline schema on `client`.
///
/// Any failing statement aborts the program and propagates; a partially
/// built schema is still removable with [`teardown`].
pub async fn setup(client: &Client, out: &Output) -> Result<()> {
    for step in SETUP_PROGRAM {
        execute(client, out, step.sql)
            .await
            .with_context(|| format!("Fixture setup failed at {:?} {}", step.kind, step.object))?;
    }
    out.verbose(&format!("Fixture ready ({} statements)", SETUP_PROGRAM.len()));
    Ok(())
}

/// Statements that return a database to its freshly created state.
pub fn teardown_statements() -> Vec<String> {
    let mut statements = vec![
        // `public` always exists, so this drop is unguarded
        format!("DROP SCHEMA {} CASCADE", quote_ident(DEFAULT_SCHEMA)),
        format!("CREATE SCHEMA {}", quote_ident(DEFAULT_SCHEMA)),
    ];
    statements.extend(
        SCHEMAS
            .iter()
            .map(|schema| format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(schema))),
    );
    statements
}

/// Drop everything [`setup`] created.
pub async fn teardown(client: &Client, out: &Output) -> Result<()> {
    for statement in teardown_statements() {
        execute(client, out, &statement)
            .await
            .context("Fixture teardown failed")?;
    }
    Ok(())
}
