//! Splitting migration scripts into executable statements

use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use super::definitions::StatementSplitter;
use crate::backends::SqlDialect;

const LINE_COMMENT: &str = "--";

/// Split `sql` into statements using the configured strategy
pub fn split_statements(sql: &str, splitter: StatementSplitter, dialect: SqlDialect) -> Vec<String> {
    match splitter {
        StatementSplitter::Naive => split_naive(sql),
        StatementSplitter::Parsed => split_parsed(sql, dialect),
    }
}

/// Split on every `;`, dropping comment lines and blank statements.
///
/// Semicolons inside string literals or procedure bodies are not understood.
pub fn split_naive(sql: &str) -> Vec<String> {
    strip_comment_lines(sql)
        .split(';')
        .map(|piece| strip_comment_lines(piece).trim().to_string())
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

/// Split with sqlparser, falling back to [`split_naive`] when the script
/// does not parse in the given dialect
pub fn split_parsed(sql: &str, dialect: SqlDialect) -> Vec<String> {
    let parser_dialect = parser_dialect(dialect);

    match Parser::parse_sql(parser_dialect.as_ref(), sql) {
        Ok(parsed) => parsed.into_iter().map(|stmt| stmt.to_string()).collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            split_naive(sql)
        }
    }
}

fn parser_dialect(dialect: SqlDialect) -> Box<dyn Dialect> {
    match dialect {
        SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
        SqlDialect::MySQL => Box::new(MySqlDialect {}),
        SqlDialect::SQLite => Box::new(SQLiteDialect {}),
    }
}

fn strip_comment_lines(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with(LINE_COMMENT))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_single_statement() {
        assert_eq!(
            split_naive("CREATE TABLE users (id INTEGER PRIMARY KEY);"),
            vec!["CREATE TABLE users (id INTEGER PRIMARY KEY)"]
        );
    }

    #[test]
    fn test_naive_trims_and_skips_blanks() {
        let sql = "\n  CREATE TABLE a (id INTEGER);\n\n;;  INSERT INTO a VALUES (1)  ;\n";
        assert_eq!(
            split_naive(sql),
            vec!["CREATE TABLE a (id INTEGER)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_naive_skips_comments() {
        let sql = "-- Migration: create users\n\
                   -- Created: 2023-01-01 12:00:00\n\
                   CREATE TABLE users (id INTEGER); -- trailing note\n\
                   -- DROP TABLE IF EXISTS users;\n";
        assert_eq!(split_naive(sql), vec!["CREATE TABLE users (id INTEGER)"]);
    }

    #[test]
    fn test_naive_comment_only_script_is_empty() {
        assert!(split_naive("-- nothing to do;\n-- really;").is_empty());
        assert!(split_naive("   \n").is_empty());
    }

    #[test]
    fn test_naive_splits_inside_literals() {
        // Known limitation: literal semicolons split the statement.
        let stmts = split_naive("INSERT INTO t VALUES ('a;b');");
        assert_eq!(stmts, vec!["INSERT INTO t VALUES ('a", "b')"]);
    }

    #[test]
    fn test_parsed_respects_literals() {
        let stmts = split_parsed("INSERT INTO t VALUES ('a;b'); SELECT 1;", SqlDialect::PostgreSQL);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("'a;b'"));
    }

    #[test]
    fn test_parsed_falls_back_on_error() {
        let stmts = split_parsed("THIS IS NOT SQL; NOR THIS;", SqlDialect::SQLite);
        assert_eq!(stmts, vec!["THIS IS NOT SQL", "NOR THIS"]);
    }

    #[test]
    fn test_split_dispatch() {
        let sql = "SELECT 1; SELECT 2;";
        assert_eq!(
            split_statements(sql, StatementSplitter::Naive, SqlDialect::MySQL),
            vec!["SELECT 1", "SELECT 2"]
        );
        assert_eq!(
            split_statements(sql, StatementSplitter::Parsed, SqlDialect::MySQL).len(),
            2
        );
    }
}
