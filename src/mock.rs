//! Scripted in-memory executor for unit tests.
//!
//! `MockExecutor` answers each `query_all` call with the next scripted
//! response and records every statement it was given, so tests can assert on
//! both the rendered SQL and the decoded results without a database.

use crate::executor::{ProjectionError, QueryExecutor, Statement};
use crate::metadata::HintPrecedence;
use crate::row::QueryRow;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Executor returning scripted rows in call order
///
/// Once the script is exhausted every further call returns no rows.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<Result<Vec<QueryRow>, String>>>,
    statements: Mutex<Vec<Statement>>,
    precedence: HintPrecedence,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next unanswered call
    #[must_use]
    pub fn with_rows(self, rows: Vec<QueryRow>) -> Self {
        lock(&self.responses).push_back(Ok(rows));
        self
    }

    /// Queue a `ProjectionError::QueryError` for the next unanswered call
    #[must_use]
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.responses).push_back(Err(message.into()));
        self
    }

    #[must_use]
    pub fn with_hint_precedence(mut self, precedence: HintPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Every statement received, in call order
    pub fn statements(&self) -> Vec<Statement> {
        lock(&self.statements).clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        lock(&self.statements).iter().map(|s| s.sql.clone()).collect()
    }

    /// A single-column `count` row, as a `COUNT(*)` query returns it
    pub fn count_row(count: i64) -> QueryRow {
        QueryRow::new().with("count", count)
    }
}

impl QueryExecutor for MockExecutor {
    fn query_all(&self, statement: &Statement) -> Result<Vec<QueryRow>, ProjectionError> {
        lock(&self.statements).push(statement.clone());
        match lock(&self.responses).pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(ProjectionError::QueryError(message)),
            None => Ok(Vec::new()),
        }
    }

    fn hint_precedence(&self) -> HintPrecedence {
        self.precedence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::Values;

    fn statement(sql: &str) -> Statement {
        Statement::new(sql.to_string(), Values(Vec::new()))
    }

    #[test]
    fn test_responses_in_order_then_empty() {
        let executor = MockExecutor::new()
            .with_rows(vec![MockExecutor::count_row(4)])
            .with_error("boom");

        let rows = executor.query_all(&statement("SELECT COUNT(*)")).unwrap();
        assert_eq!(rows[0].get::<i64>(0).unwrap(), 4);
        assert!(executor.query_all(&statement("SELECT 1")).is_err());
        assert!(executor.query_all(&statement("SELECT 2")).unwrap().is_empty());

        assert_eq!(
            executor.executed_sql(),
            vec!["SELECT COUNT(*)", "SELECT 1", "SELECT 2"]
        );
    }
}
