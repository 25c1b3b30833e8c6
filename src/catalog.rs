//! Catalog inspection of fixture databases.
//!
//! Answers "what did the fixture leave behind" through the same system
//! catalogs a schema tool reads. Objects owned by extensions and the
//! always-present `public` namespace are not counted as user objects.

use anyhow::Result;
use serde::Serialize;
use tokio_postgres::Client;

use crate::foreign::{FDW_EXTENSION, FOREIGN_TABLE, SERVER_NAME};

/// Predicate on `n.nspname` selecting non-system namespaces.
const USER_NAMESPACE: &str = "n.nspname NOT IN ('pg_catalog', 'information_schema') \
                              AND n.nspname NOT LIKE 'pg\\_%'";

/// Counts of user-created objects by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    /// Namespaces other than `public` and the system ones
    pub schemas: i64,
    pub tables: i64,
    pub views: i64,
    pub materialized_views: i64,
    pub foreign_tables: i64,
    pub composite_types: i64,
    pub functions: i64,
    pub domains: i64,
}

impl ObjectCounts {
    /// True for a database that was never touched.
    pub fn is_empty(&self) -> bool {
        *self == ObjectCounts::default()
    }
}

/// Presence of each foreign environment object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForeignState {
    pub extension: bool,
    pub server: bool,
    pub foreign_table: bool,
    pub database: bool,
}

impl ForeignState {
    pub fn is_absent(&self) -> bool {
        !(self.extension || self.server || self.foreign_table || self.database)
    }

    pub fn is_complete(&self) -> bool {
        self.extension && self.server && self.foreign_table && self.database
    }
}

/// A domain with a non-empty comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainComment {
    pub schema: String,
    pub name: String,
    pub comment: String,
}

pub async fn user_object_counts(client: &Client) -> Result<ObjectCounts> {
    let schemas = client
        .query_one(
            &format!(
                "SELECT count(*) FROM pg_namespace n \
                 WHERE {USER_NAMESPACE} AND n.nspname <> 'public'"
            ),
            &[],
        )
        .await?;

    let relations = client
        .query_one(
            &format!(
                r#"
                SELECT
                    count(*) FILTER (WHERE c.relkind IN ('r', 'p')) AS tables,
                    count(*) FILTER (WHERE c.relkind = 'v') AS views,
                    count(*) FILTER (WHERE c.relkind = 'm') AS materialized_views,
                    count(*) FILTER (WHERE c.relkind = 'f') AS foreign_tables
                FROM pg_class c
                JOIN pg_namespace n ON n.oid = c.relnamespace
                WHERE {USER_NAMESPACE}
                  AND NOT EXISTS (
                      SELECT 1 FROM pg_depend d
                      WHERE d.classid = 'pg_class'::regclass
                        AND d.objid = c.oid
                        AND d.deptype = 'e'
                  )
                "#
            ),
            &[],
        )
        .await?;

    let types = client
        .query_one(
            &format!(
                r#"
                SELECT
                    count(*) FILTER (
                        WHERE t.typtype = 'c'
                          AND (SELECT c.relkind FROM pg_class c WHERE c.oid = t.typrelid) = 'c'
                    ) AS composite_types,
                    count(*) FILTER (WHERE t.typtype = 'd') AS domains
                FROM pg_type t
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE {USER_NAMESPACE}
                  AND NOT EXISTS (
                      SELECT 1 FROM pg_depend d
                      WHERE d.classid = 'pg_type'::regclass
                        AND d.objid = t.oid
                        AND d.deptype = 'e'
                  )
                "#
            ),
            &[],
        )
        .await?;

    let functions = client
        .query_one(
            &format!(
                r#"
                SELECT count(*)
                FROM pg_proc p
                JOIN pg_namespace n ON n.oid = p.pronamespace
                WHERE {USER_NAMESPACE}
                  AND NOT EXISTS (
                      SELECT 1 FROM pg_depend d
                      WHERE d.classid = 'pg_proc'::regclass
                        AND d.objid = p.oid
                        AND d.deptype = 'e'
                  )
                "#
            ),
            &[],
        )
        .await?;

    Ok(ObjectCounts {
        schemas: schemas.get(0),
        tables: relations.get("tables"),
        views: relations.get("views"),
        materialized_views: relations.get("materialized_views"),
        foreign_tables: relations.get("foreign_tables"),
        composite_types: types.get("composite_types"),
        functions: functions.get(0),
        domains: types.get("domains"),
    })
}

/// Column names of a table, in attribute order.
pub async fn table_columns(client: &Client, schema: &str, table: &str) -> Result<Vec<String>> {
    let rows = client
        .query(
            r#"
            SELECT a.attname
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1
              AND c.relname = $2
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY a.attnum
            "#,
            &[&schema, &table],
        )
        .await?;

    Ok(rows.iter().map(|r| r.get("attname")).collect())
}

/// Direct parents of a table, in declaration order.
pub async fn table_parents(client: &Client, schema: &str, table: &str) -> Result<Vec<String>> {
    let rows = client
        .query(
            r#"
            SELECT pn.nspname || '.' || p.relname AS parent
            FROM pg_inherits i
            JOIN pg_class c ON c.oid = i.inhrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_class p ON p.oid = i.inhparent
            JOIN pg_namespace pn ON pn.oid = p.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
            ORDER BY i.inhseqno
            "#,
            &[&schema, &table],
        )
        .await?;

    Ok(rows.iter().map(|r| r.get("parent")).collect())
}

/// Domains carrying a non-empty comment.
pub async fn domain_comments(client: &Client) -> Result<Vec<DomainComment>> {
    let rows = client
        .query(
            &format!(
                r#"
                SELECT n.nspname AS schema, t.typname AS name, d.description AS comment
                FROM pg_type t
                JOIN pg_namespace n ON n.oid = t.typnamespace
                JOIN pg_description d
                  ON d.objoid = t.oid AND d.classoid = 'pg_type'::regclass
                WHERE t.typtype = 'd'
                  AND {USER_NAMESPACE}
                  AND d.description <> ''
                ORDER BY n.nspname, t.typname
                "#
            ),
            &[],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|r| DomainComment {
            schema: r.get("schema"),
            name: r.get("name"),
            comment: r.get("comment"),
        })
        .collect())
}

pub async fn database_exists(client: &Client, name: &str) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1) AS exists",
            &[&name],
        )
        .await?;
    Ok(row.get("exists"))
}

/// Which foreign environment objects exist, seen from the primary database.
pub async fn foreign_state(primary: &Client, foreign_database: &str) -> Result<ForeignState> {
    let row = primary
        .query_one(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM pg_extension WHERE extname = $1) AS extension,
                EXISTS(SELECT 1 FROM pg_foreign_server WHERE srvname = $2) AS server,
                EXISTS(
                    SELECT 1 FROM pg_class WHERE relkind = 'f' AND relname = $3
                ) AS foreign_table
            "#,
            &[&FDW_EXTENSION, &SERVER_NAME, &FOREIGN_TABLE],
        )
        .await?;

    Ok(ForeignState {
        extension: row.get("extension"),
        server: row.get("server"),
        foreign_table: row.get("foreign_table"),
        database: database_exists(primary, foreign_database).await?,
    })
}
