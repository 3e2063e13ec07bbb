//! Query-building context handed to specifications and selections.
//!
//! [`Root`] references the entity being queried and produces qualified column
//! expressions. [`CriteriaQuery`] is the statement under construction; a
//! specification may mark it distinct, join other tables, group it or request
//! an ordering. The assemblers decide which of those requests survive (a count
//! query drops every ordering).

use crate::executor::ProjectionError;
use crate::query::traits::Entity;
use sea_query::{
    Asterisk, Condition, Expr, Iden, IntoCondition, JoinType, NullOrdering, Order,
    SelectStatement,
};
use std::marker::PhantomData;

/// Identifier with a static name (table or column)
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ident(pub(crate) &'static str);

impl Iden for Ident {
    fn unquoted(&self) -> &str {
        self.0
    }
}

/// Identifier with a runtime name (select aliases)
#[derive(Debug, Clone)]
pub(crate) struct OwnedIdent(pub(crate) String);

impl Iden for OwnedIdent {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// Reference to the queried entity
pub struct Root<E: Entity> {
    entity: E,
}

impl<E: Entity> Default for Root<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Root<E> {
    pub fn new() -> Self {
        Self {
            entity: E::default(),
        }
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn table_name(&self) -> &'static str {
        self.entity.table_name()
    }

    /// Column of the root table, qualified with the table name
    pub fn col(&self, column: &'static str) -> Expr {
        Expr::col((Ident(self.table_name()), Ident(column)))
    }

    /// Column for a property the entity declares
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::UnknownProperty` if the entity does not declare it.
    pub fn get(&self, property: &str) -> Result<Expr, ProjectionError> {
        self.entity
            .column(property)
            .map(|column| self.col(column))
            .ok_or_else(|| ProjectionError::UnknownProperty {
                entity: self.entity.entity_name().to_string(),
                property: property.to_string(),
            })
    }

    /// The entity's primary-key column
    pub fn primary_key(&self) -> Expr {
        self.col(self.entity.primary_key())
    }

    /// `"table".*`
    pub fn asterisk(&self) -> Expr {
        Expr::col((Ident(self.table_name()), Asterisk))
    }
}

/// One requested ordering
#[derive(Debug, Clone)]
pub(crate) struct OrderRequest {
    pub(crate) expr: Expr,
    pub(crate) order: Order,
    pub(crate) nulls: Option<NullOrdering>,
}

impl OrderRequest {
    pub(crate) fn apply(self, statement: &mut SelectStatement) {
        match self.nulls {
            Some(nulls) => {
                statement.order_by_expr_with_nulls(self.expr, self.order, nulls);
            }
            None => {
                statement.order_by_expr(self.expr, self.order);
            }
        }
    }
}

/// Select statement under construction
pub struct CriteriaQuery<E: Entity> {
    statement: SelectStatement,
    table: &'static str,
    distinct: bool,
    orders: Vec<OrderRequest>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> CriteriaQuery<E> {
    /// Statement selecting from the root entity's table, with no columns yet
    pub(crate) fn new(root: &Root<E>) -> Self {
        let table = root.table_name();
        let mut statement = SelectStatement::default();
        statement.from(Ident(table));
        Self {
            statement,
            table,
            distinct: false,
            orders: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Ask for distinct results; counts switch to `COUNT(DISTINCT pk)`.
    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Request an ordering. Dropped by count queries and replaced by an
    /// explicit sort.
    pub fn order_by(&mut self, expr: Expr, order: Order) -> &mut Self {
        self.orders.push(OrderRequest {
            expr,
            order,
            nulls: None,
        });
        self
    }

    pub fn has_orders(&self) -> bool {
        !self.orders.is_empty()
    }

    /// `INNER JOIN table ON ...`
    pub fn join<C: IntoCondition>(&mut self, table: &'static str, on: C) -> &mut Self {
        self.statement.join(JoinType::InnerJoin, Ident(table), on);
        self
    }

    /// `LEFT JOIN table ON ...`
    pub fn left_join<C: IntoCondition>(&mut self, table: &'static str, on: C) -> &mut Self {
        self.statement.join(JoinType::LeftJoin, Ident(table), on);
        self
    }

    /// `GROUP BY` a root column. Count queries keep grouping, yielding one
    /// partial count per group.
    pub fn group_by(&mut self, column: &'static str) -> &mut Self {
        self.statement.group_by_col((Ident(self.table), Ident(column)));
        self
    }

    pub fn having(&mut self, condition: Expr) -> &mut Self {
        self.statement.and_having(condition);
        self
    }

    pub(crate) fn restrict(&mut self, condition: Condition) {
        self.statement.cond_where(condition);
    }

    pub(crate) fn into_parts(self) -> (SelectStatement, bool, Vec<OrderRequest>) {
        (self.statement, self.distinct, self.orders)
    }
}
