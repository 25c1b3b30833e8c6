//! SQL utilities for PostgreSQL identifier and literal handling.

/// Quote a PostgreSQL identifier unconditionally.
///
/// Always wraps the identifier in double quotes and escapes any embedded
/// double quotes by doubling them. Quoting preserves case, so `Inh1` stays
/// `Inh1` rather than folding to `inh1`.
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote a value as a standard-conforming string literal.
///
/// Used for server options, user mapping options and comments, none of which
/// accept bind parameters.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Schema-qualified, quoted name.
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}
