//! Execution methods for assembled queries and the page reader.
//!
//! Every method renders its statement, hands it to a [`QueryExecutor`] and
//! decodes the returned [`QueryRow`]s.
//!
//! [`QueryRow`]: crate::row::QueryRow

use crate::executor::{ProjectionError, QueryExecutor};
use crate::page::{Page, PageRequest, Pageable};
use crate::query::select::{CountQuery, TypedQuery};
use crate::query::selection::Selection;
use crate::query::traits::Entity;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

impl<'s, E, S> TypedQuery<'s, E, S>
where
    E: Entity,
    S: Selection<E> + ?Sized,
{
    /// Execute the query and decode every row
    ///
    /// # Errors
    ///
    /// Returns the executor's error, or `ProjectionError::Extraction` if a row
    /// does not decode.
    pub fn get_result_list<X: QueryExecutor + ?Sized>(
        &self,
        executor: &X,
    ) -> Result<Vec<S::Output>, ProjectionError> {
        let rows = executor.query_all(&self.to_statement())?;
        rows.iter().map(|row| self.selection.from_row(row)).collect()
    }

    /// Execute the query expecting at most one row
    ///
    /// Fetches with `LIMIT 2` so a second match is detected without reading
    /// the whole result.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::NonUniqueResult` if more than one row matches.
    pub fn get_single_result<X: QueryExecutor + ?Sized>(
        mut self,
        executor: &X,
    ) -> Result<Option<S::Output>, ProjectionError> {
        self.set_max_results(2);
        let mut rows = executor.query_all(&self.to_statement())?;
        match rows.len() {
            0 => Ok(None),
            1 => {
                let row = rows.remove(0);
                self.selection.from_row(&row).map(Some)
            }
            count => Err(ProjectionError::NonUniqueResult { count }),
        }
    }
}

impl<E: Entity> CountQuery<E> {
    /// Execute the count query, summing partial counts
    ///
    /// Grouped specifications yield one row per group; NULL partials count as
    /// zero and no rows at all means zero.
    ///
    /// # Errors
    ///
    /// Returns the executor's error, or `ProjectionError::QueryError` if a
    /// partial count is negative or the sum overflows.
    pub fn fetch_total<X: QueryExecutor + ?Sized>(
        &self,
        executor: &X,
    ) -> Result<u64, ProjectionError> {
        let rows = executor.query_all(&self.to_statement())?;
        let mut total: u64 = 0;
        for row in &rows {
            let partial = row.get::<Option<i64>>(0)?.unwrap_or(0);
            let partial = u64::try_from(partial).map_err(|_| {
                ProjectionError::QueryError(format!("Count cannot be negative: {partial}"))
            })?;
            total = total.checked_add(partial).ok_or_else(|| {
                ProjectionError::QueryError("Count overflowed u64".to_string())
            })?;
        }
        Ok(total)
    }
}

/// Read one page: count the matches, then fetch content only when the
/// requested offset lies inside the result.
///
/// # Errors
///
/// Returns any error from the count or content query.
pub fn read_page<E, S, X>(
    mut query: TypedQuery<'_, E, S>,
    request: &PageRequest,
    count: &CountQuery<E>,
    executor: &X,
) -> Result<Page<S::Output>, ProjectionError>
where
    E: Entity,
    S: Selection<E> + ?Sized,
    X: QueryExecutor + ?Sized,
{
    query
        .set_first_result(request.offset())
        .set_max_results(request.limit());

    let total = count.fetch_total(executor)?;
    let content = if request.offset() < total {
        query.get_result_list(executor)?
    } else {
        log::debug!(
            "skipping content query: offset {} is not below total {}",
            request.offset(),
            total
        );
        #[cfg(feature = "metrics")]
        METRICS.record_page_short_circuit();
        Vec::new()
    };

    Ok(Page::new(content, Pageable::Paged(request.clone()), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use crate::query::select::{build_count_query, build_query};
    use crate::query::selection::ColumnSelection;
    use crate::row::QueryRow;
    use sea_query::Value;

    #[derive(Default)]
    struct FooBar;

    impl Entity for FooBar {
        type Model = (String, i64);

        fn table_name(&self) -> &'static str {
            "foo_bar"
        }

        fn primary_key(&self) -> &'static str {
            "bar"
        }

        fn column_names(&self) -> &'static [&'static str] {
            &["foo", "bar"]
        }
    }

    fn foo(value: &str) -> QueryRow {
        QueryRow::new().with("foo", value)
    }

    #[test]
    fn test_single_result() {
        let selection = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);

        let executor = MockExecutor::new().with_rows(vec![]);
        let query = build_query(None, &selection, None).unwrap();
        assert_eq!(query.get_single_result(&executor).unwrap(), None);

        let executor = MockExecutor::new().with_rows(vec![foo("bar")]);
        let query = build_query(None, &selection, None).unwrap();
        assert_eq!(
            query.get_single_result(&executor).unwrap(),
            Some(("bar".to_string(),))
        );
        assert!(executor.executed_sql()[0].ends_with("LIMIT $1"));

        let executor = MockExecutor::new().with_rows(vec![foo("a"), foo("b")]);
        let query = build_query(None, &selection, None).unwrap();
        assert!(matches!(
            query.get_single_result(&executor),
            Err(ProjectionError::NonUniqueResult { count: 2 })
        ));
    }

    #[test]
    fn test_fetch_total_sums_partials() {
        let executor = MockExecutor::new().with_rows(vec![
            MockExecutor::count_row(2),
            QueryRow::new().with("count", Value::BigInt(None)),
            MockExecutor::count_row(5),
        ]);
        let total = build_count_query::<FooBar>(None).fetch_total(&executor).unwrap();
        assert_eq!(total, 7);

        let executor = MockExecutor::new().with_rows(vec![]);
        assert_eq!(build_count_query::<FooBar>(None).fetch_total(&executor).unwrap(), 0);
    }

    #[test]
    fn test_fetch_total_rejects_negative() {
        let executor = MockExecutor::new().with_rows(vec![MockExecutor::count_row(-1)]);
        assert!(build_count_query::<FooBar>(None).fetch_total(&executor).is_err());
    }

    #[test]
    fn test_read_page_counts_then_fetches() {
        let selection = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);
        let executor = MockExecutor::new()
            .with_rows(vec![MockExecutor::count_row(3)])
            .with_rows(vec![foo("bar")]);
        let request = PageRequest::of(0, 1).unwrap();

        let page = read_page(
            build_query(None, &selection, None).unwrap(),
            &request,
            &build_count_query(None),
            &executor,
        )
        .unwrap();
        assert_eq!(page.total_elements(), 3);
        assert_eq!(page.content(), &[("bar".to_string(),)]);

        let sql = executor.executed_sql();
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("SELECT COUNT(*)"));
        assert!(sql[1].ends_with("LIMIT $1 OFFSET $2"), "{}", sql[1]);
    }

    #[test]
    fn test_read_page_short_circuits_past_total() {
        let selection = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);
        let executor = MockExecutor::new().with_rows(vec![MockExecutor::count_row(3)]);
        let request = PageRequest::with_offset(3, 5).unwrap();

        let page = read_page(
            build_query(None, &selection, None).unwrap(),
            &request,
            &build_count_query(None),
            &executor,
        )
        .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_elements(), 3);
        assert_eq!(executor.executed_sql().len(), 1);
    }
}
