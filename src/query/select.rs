//! Query assembly: specification + selection (+ sort) into an executable query.
//!
//! [`build_query`] produces a [`TypedQuery`] whose rows decode through the
//! selection; [`build_count_query`] produces the matching [`CountQuery`] from the
//! same specification. Execution methods live in the execution module.

use crate::executor::{ProjectionError, Statement};
use crate::metadata::QueryHints;
use crate::query::criteria::{CriteriaQuery, Root};
use crate::query::selection::Selection;
use crate::query::sort::{to_orders, Sort};
use crate::query::specification::Specification;
use crate::query::traits::Entity;
use sea_query::{Asterisk, Expr, Func, PostgresQueryBuilder, SelectStatement};
use std::marker::PhantomData;

/// Assembled select query returning `S::Output` per row
///
/// Holds the rendered-to-be statement, the hints attached by the metadata
/// applier and a borrow of the selection used to decode rows.
pub struct TypedQuery<'s, E: Entity, S: Selection<E> + ?Sized> {
    statement: SelectStatement,
    hints: QueryHints,
    pub(crate) selection: &'s S,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity, S: Selection<E> + ?Sized> TypedQuery<'s, E, S> {
    /// Mutable access to the underlying statement (locks, extra clauses)
    pub fn statement_mut(&mut self) -> &mut SelectStatement {
        &mut self.statement
    }

    pub fn hints(&self) -> &QueryHints {
        &self.hints
    }

    pub fn set_hints(&mut self, hints: QueryHints) -> &mut Self {
        self.hints = hints;
        self
    }

    /// `OFFSET`
    pub fn set_first_result(&mut self, offset: u64) -> &mut Self {
        self.statement.offset(offset);
        self
    }

    /// `LIMIT`
    pub fn set_max_results(&mut self, limit: u64) -> &mut Self {
        self.statement.limit(limit);
        self
    }

    /// Render SQL and bind values for an executor
    pub fn to_statement(&self) -> Statement {
        let (sql, values) = self.statement.build(PostgresQueryBuilder);
        log::debug!("assembled query: {}", sql);
        Statement {
            sql,
            values,
            hints: self.hints.clone(),
        }
    }
}

/// Count of the rows a specification matches
///
/// May return several partial rows when the specification groups; callers
/// sum them (see `fetch_total`).
pub struct CountQuery<E: Entity> {
    statement: SelectStatement,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> CountQuery<E> {
    pub fn to_statement(&self) -> Statement {
        let (sql, values) = self.statement.build(PostgresQueryBuilder);
        log::debug!("assembled count query: {}", sql);
        Statement::new(sql, values)
    }
}

fn restrict<E: Entity>(
    spec: Option<&dyn Specification<E>>,
    root: &Root<E>,
    query: &mut CriteriaQuery<E>,
) {
    if let Some(condition) = spec.and_then(|spec| spec.to_predicate(root, query)) {
        query.restrict(condition);
    }
}

/// Assemble a query selecting `selection`, filtered by `spec` and ordered by `sort`.
///
/// A sorted `sort` replaces any ordering the specification requested; without
/// one the specification's ordering is kept.
///
/// # Errors
///
/// Returns `ProjectionError::EmptySelection` if the selection yields no
/// expressions, or `ProjectionError::UnknownProperty` for an unresolvable sort
/// or column.
pub fn build_query<'s, E, S>(
    spec: Option<&dyn Specification<E>>,
    selection: &'s S,
    sort: Option<&Sort>,
) -> Result<TypedQuery<'s, E, S>, ProjectionError>
where
    E: Entity,
    S: Selection<E> + ?Sized,
{
    let root = Root::<E>::new();
    let mut query = CriteriaQuery::new(&root);
    restrict(spec, &root, &mut query);

    let items = selection.to_selection(&root, &mut query)?;
    if items.is_empty() {
        return Err(ProjectionError::EmptySelection);
    }

    let sort_orders = match sort {
        Some(sort) if sort.is_sorted() => Some(to_orders(sort, &root)?),
        _ => None,
    };

    let (mut statement, distinct, requested_orders) = query.into_parts();
    if distinct {
        statement.distinct();
    }
    for item in items {
        item.apply(&mut statement);
    }
    for order in sort_orders.unwrap_or(requested_orders) {
        order.apply(&mut statement);
    }

    Ok(TypedQuery {
        statement,
        hints: QueryHints::new(),
        selection,
        _entity: PhantomData,
    })
}

/// Assemble the count query for `spec`, discarding any requested ordering.
pub fn build_count_query<E: Entity>(spec: Option<&dyn Specification<E>>) -> CountQuery<E> {
    let root = Root::<E>::new();
    let mut query = CriteriaQuery::new(&root);
    restrict(spec, &root, &mut query);

    let (mut statement, distinct, _orders) = query.into_parts();
    if distinct {
        statement.expr(Func::count_distinct(root.primary_key()));
    } else {
        statement.expr(Func::count(Expr::col(Asterisk)));
    }

    CountQuery {
        statement,
        _entity: PhantomData,
    }
}
