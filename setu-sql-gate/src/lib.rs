//! Parse-level rejection of anything but a single read-only `SELECT`.
//! Spec.md §4.6 — lexical substring search is insufficient, so this parses
//! and inspects AST node kinds rather than scanning text.

use setu_catalog::SourceKind;
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::{
    Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    #[error("sql did not parse: {0}")]
    ParseError(String),

    #[error("only a single statement is allowed, found {0}")]
    MultipleStatements(usize),

    #[error("sql comments are not allowed")]
    CommentNotAllowed,

    #[error("statement is not a read-only SELECT")]
    NotReadOnlySelect,
}

/// Pick the `sqlparser` dialect matching a source kind. Warehouses without a
/// dedicated `sqlparser` dialect fall back to `GenericDialect`, which is
/// permissive enough for standard SELECT/CTE syntax.
fn dialect_for(kind: SourceKind) -> Box<dyn Dialect> {
    match kind {
        SourceKind::Postgres | SourceKind::CockroachDb | SourceKind::Redshift => {
            Box::new(PostgreSqlDialect {})
        }
        SourceKind::MySql => Box::new(MySqlDialect {}),
        SourceKind::SqlServer => Box::new(MsSqlDialect {}),
        SourceKind::DuckDb => Box::new(SQLiteDialect {}),
        _ => Box::new(GenericDialect {}),
    }
}

fn reject_comment_tokens(sql: &str, dialect: &dyn Dialect) -> Result<(), GateError> {
    let mut tokenizer = Tokenizer::new(dialect, sql);
    let tokens = tokenizer
        .tokenize()
        .map_err(|e| GateError::ParseError(e.to_string()))?;
    for token in tokens {
        if matches!(
            token,
            Token::Whitespace(sqlparser::tokenizer::Whitespace::SingleLineComment { .. })
                | Token::Whitespace(sqlparser::tokenizer::Whitespace::MultiLineComment(_))
        ) {
            return Err(GateError::CommentNotAllowed);
        }
    }
    Ok(())
}

/// True if a query body is, recursively, a plain SELECT — allowing set
/// operations (UNION/INTERSECT/EXCEPT) of SELECTs, since those remain
/// read-only, but rejecting anything else (e.g. `INSERT ... SELECT` is not
/// representable as a bare `SetExpr` anyway and is caught at the statement
/// level).
fn is_read_only_query(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(_) => true,
        SetExpr::Query(query) => is_read_only_query(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_query(left) && is_read_only_query(right)
        }
        SetExpr::Values(_) => true,
        SetExpr::Table(_) => true,
        _ => false,
    }
}

/// Validate `sql` is a single, read-only SELECT (CTEs and window functions
/// allowed) for the given source kind's dialect.
pub fn validate_select_only(sql: &str, kind: SourceKind) -> Result<(), GateError> {
    let dialect = dialect_for(kind);

    reject_comment_tokens(sql, dialect.as_ref())?;

    let statements = Parser::parse_sql(dialect.as_ref(), sql)
        .map_err(|e| GateError::ParseError(e.to_string()))?;

    if statements.len() != 1 {
        return Err(GateError::MultipleStatements(statements.len()));
    }

    match &statements[0] {
        Statement::Query(query) => {
            if is_read_only_query(&query.body) {
                Ok(())
            } else {
                Err(GateError::NotReadOnlySelect)
            }
        }
        _ => Err(GateError::NotReadOnlySelect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_passes() {
        assert!(validate_select_only("SELECT id, name FROM users", SourceKind::Postgres).is_ok());
    }

    #[test]
    fn cte_select_passes() {
        let sql = "WITH recent AS (SELECT id FROM orders) SELECT * FROM recent";
        assert!(validate_select_only(sql, SourceKind::Postgres).is_ok());
    }

    #[test]
    fn window_function_select_passes() {
        let sql = "SELECT id, ROW_NUMBER() OVER (ORDER BY id) FROM orders";
        assert!(validate_select_only(sql, SourceKind::Postgres).is_ok());
    }

    #[test]
    fn insert_is_rejected() {
        let err = validate_select_only("INSERT INTO users (id) VALUES (1)", SourceKind::Postgres)
            .unwrap_err();
        assert_eq!(err, GateError::NotReadOnlySelect);
    }

    #[test]
    fn ddl_is_rejected() {
        let err = validate_select_only("DROP TABLE users", SourceKind::Postgres).unwrap_err();
        assert_eq!(err, GateError::NotReadOnlySelect);
    }

    #[test]
    fn multiple_statements_are_rejected() {
        let err = validate_select_only(
            "SELECT 1; SELECT 2",
            SourceKind::Postgres,
        )
        .unwrap_err();
        assert_eq!(err, GateError::MultipleStatements(2));
    }

    #[test]
    fn line_comment_is_rejected() {
        let err = validate_select_only(
            "SELECT id FROM users -- drop everything later\n",
            SourceKind::Postgres,
        )
        .unwrap_err();
        assert_eq!(err, GateError::CommentNotAllowed);
    }

    #[test]
    fn block_comment_is_rejected() {
        let err = validate_select_only(
            "SELECT id /* sneaky */ FROM users",
            SourceKind::Postgres,
        )
        .unwrap_err();
        assert_eq!(err, GateError::CommentNotAllowed);
    }
}
