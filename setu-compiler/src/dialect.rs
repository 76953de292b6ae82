//! Per-warehouse-kind rendering knobs. The compiler itself is dialect-blind:
//! one rewrite pass reads this table, no per-kind branch in the compile
//! algorithm beyond it (spec.md §4.4 step 7).

use setu_catalog::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `$1, $2, ...` — Postgres, CockroachDB, Redshift.
    Dollar,
    /// `?` positional — MySQL, SQLite, DuckDB.
    QuestionMark,
    /// `@p1, @p2, ...` — SQL Server.
    AtP,
    /// `:name` — Oracle.
    NamedColon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSyntax {
    /// `LIMIT n OFFSET m`.
    LimitOffset,
    /// `TOP n` (no OFFSET support assumed; SQL Server uses OFFSET/FETCH instead, see below).
    Top,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`.
    OffsetFetch,
}

#[derive(Debug, Clone, Copy)]
pub struct DialectDescriptor {
    pub kind: SourceKind,
    pub quote_char: char,
    pub param_style: ParamStyle,
    pub limit_syntax: LimitSyntax,
    /// `strftime`-style format used to render date/datetime literals.
    pub date_literal_format: &'static str,
    /// SQL fragment prepended as a statement-level timeout hint, `{ms}` is
    /// substituted with the timeout in milliseconds. `None` if the kind has
    /// no session-level statement timeout primitive the gateway can set
    /// inline (left to the connection pool / driver option instead).
    pub statement_timeout_prefix: Option<&'static str>,
    /// Cheap query used to validate a pooled connection is alive.
    pub ping_query: &'static str,
}

impl DialectDescriptor {
    pub fn quote_identifier(&self, ident: &str) -> String {
        let q = self.quote_char;
        format!("{q}{}{q}", ident.replace(q, &format!("{q}{q}")))
    }

    pub fn placeholder(&self, index: usize) -> String {
        match self.param_style {
            ParamStyle::Dollar => format!("${index}"),
            ParamStyle::QuestionMark => "?".to_string(),
            ParamStyle::AtP => format!("@p{index}"),
            ParamStyle::NamedColon => format!(":p{index}"),
        }
    }

    pub fn render_limit_offset(&self, limit: u64, offset: u64) -> String {
        match self.limit_syntax {
            LimitSyntax::LimitOffset => format!("LIMIT {limit} OFFSET {offset}"),
            LimitSyntax::Top => format!("TOP {limit}"), // applied at SELECT position by the compiler
            LimitSyntax::OffsetFetch => {
                format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
            }
        }
    }
}

pub fn descriptor_for(kind: SourceKind) -> DialectDescriptor {
    use LimitSyntax::*;
    use ParamStyle::*;
    use SourceKind::*;

    match kind {
        Postgres | CockroachDb | Redshift => DialectDescriptor {
            kind,
            quote_char: '"',
            param_style: Dollar,
            limit_syntax: LimitOffset,
            date_literal_format: "%Y-%m-%d %H:%M:%S",
            statement_timeout_prefix: Some("SET LOCAL statement_timeout = {ms}"),
            ping_query: "SELECT 1",
        },
        MySql => DialectDescriptor {
            kind,
            quote_char: '`',
            param_style: QuestionMark,
            limit_syntax: LimitOffset,
            date_literal_format: "%Y-%m-%d %H:%M:%S",
            statement_timeout_prefix: Some("SET SESSION MAX_EXECUTION_TIME={ms}"),
            ping_query: "SELECT 1",
        },
        ClickHouse | DuckDb => DialectDescriptor {
            kind,
            quote_char: '"',
            param_style: QuestionMark,
            limit_syntax: LimitOffset,
            date_literal_format: "%Y-%m-%d %H:%M:%S",
            statement_timeout_prefix: None,
            ping_query: "SELECT 1",
        },
        Snowflake | BigQuery | Databricks => DialectDescriptor {
            kind,
            quote_char: '"',
            param_style: QuestionMark,
            limit_syntax: LimitOffset,
            date_literal_format: "%Y-%m-%d %H:%M:%S",
            statement_timeout_prefix: None,
            ping_query: "SELECT 1",
        },
        SqlServer => DialectDescriptor {
            kind,
            quote_char: '"',
            param_style: AtP,
            limit_syntax: OffsetFetch,
            date_literal_format: "%Y-%m-%d %H:%M:%S",
            statement_timeout_prefix: None,
            ping_query: "SELECT 1",
        },
        Oracle => DialectDescriptor {
            kind,
            quote_char: '"',
            param_style: NamedColon,
            limit_syntax: OffsetFetch,
            date_literal_format: "%Y-%m-%d %H:%M:%S",
            statement_timeout_prefix: None,
            ping_query: "SELECT 1 FROM DUAL",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_uses_dollar_placeholders() {
        let d = descriptor_for(SourceKind::Postgres);
        assert_eq!(d.placeholder(1), "$1");
        assert_eq!(d.placeholder(2), "$2");
    }

    #[test]
    fn mysql_quotes_with_backticks() {
        let d = descriptor_for(SourceKind::MySql);
        assert_eq!(d.quote_identifier("region"), "`region`");
    }

    #[test]
    fn sql_server_uses_offset_fetch() {
        let d = descriptor_for(SourceKind::SqlServer);
        assert_eq!(
            d.render_limit_offset(10, 20),
            "OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }
}
