//! What a query returns: the whole entity, or a projection of it.
//!
//! A [`Selection`] contributes the select list while the query is assembled
//! and decodes each result row into its `Output`. Both steps see the same
//! [`Root`] and [`CriteriaQuery`] a specification sees, so a selection may
//! reference joined tables a predicate introduced.

use crate::executor::ProjectionError;
use crate::query::criteria::{CriteriaQuery, OwnedIdent, Root};
use crate::query::traits::Entity;
use crate::row::{FromQueryRow, QueryRow};
use sea_query::{Expr, SelectStatement};
use std::marker::PhantomData;

/// One entry of the select list
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub(crate) fn apply(self, statement: &mut SelectStatement) {
        match self.alias {
            Some(alias) => {
                statement.expr_as(self.expr, OwnedIdent(alias));
            }
            None => {
                statement.expr(self.expr);
            }
        }
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        Self { expr, alias: None }
    }
}

/// Projection over entity `E` producing `Output` per row
pub trait Selection<E: Entity> {
    type Output;

    /// Select expressions, in result-column order
    ///
    /// # Errors
    ///
    /// Implementations return `ProjectionError` for references the entity
    /// cannot resolve. An empty list is rejected by the query assembler.
    fn to_selection(
        &self,
        root: &Root<E>,
        query: &mut CriteriaQuery<E>,
    ) -> Result<Vec<SelectItem>, ProjectionError>;

    /// Decode one result row
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::Extraction` when a column does not convert.
    fn from_row(&self, row: &QueryRow) -> Result<Self::Output, ProjectionError>;
}

impl<E: Entity, S: Selection<E> + ?Sized> Selection<E> for &S {
    type Output = S::Output;

    fn to_selection(
        &self,
        root: &Root<E>,
        query: &mut CriteriaQuery<E>,
    ) -> Result<Vec<SelectItem>, ProjectionError> {
        (**self).to_selection(root, query)
    }

    fn from_row(&self, row: &QueryRow) -> Result<Self::Output, ProjectionError> {
        (**self).from_row(row)
    }
}

/// Selects every column of the root entity and decodes `E::Model`
pub struct EntitySelection<E>(PhantomData<fn() -> E>);

impl<E> EntitySelection<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EntitySelection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Selection<E> for EntitySelection<E>
where
    E: Entity,
    E::Model: FromQueryRow,
{
    type Output = E::Model;

    fn to_selection(
        &self,
        root: &Root<E>,
        _query: &mut CriteriaQuery<E>,
    ) -> Result<Vec<SelectItem>, ProjectionError> {
        Ok(vec![root.asterisk().into()])
    }

    fn from_row(&self, row: &QueryRow) -> Result<E::Model, ProjectionError> {
        E::Model::from_query_row(row)
    }
}

/// Selects the named entity properties and decodes them as `T`
///
/// `T` is usually a tuple whose arity matches the property list, or a DTO
/// implementing [`FromQueryRow`].
///
/// ```
/// use lifeguard_projection::{ColumnSelection, Entity};
///
/// # #[derive(Default)]
/// # struct FooBar;
/// # impl Entity for FooBar {
/// #     type Model = ();
/// #     fn table_name(&self) -> &'static str { "foo_bar" }
/// #     fn column_names(&self) -> &'static [&'static str] { &["foo", "bar"] }
/// # }
/// let foo_only = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);
/// ```
pub struct ColumnSelection<E, T> {
    properties: Vec<String>,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E: Entity, T: FromQueryRow> ColumnSelection<E, T> {
    pub fn new(properties: &[&str]) -> Self {
        Self {
            properties: properties.iter().map(|p| (*p).to_string()).collect(),
            _marker: PhantomData,
        }
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }
}

impl<E: Entity, T: FromQueryRow> Selection<E> for ColumnSelection<E, T> {
    type Output = T;

    fn to_selection(
        &self,
        root: &Root<E>,
        _query: &mut CriteriaQuery<E>,
    ) -> Result<Vec<SelectItem>, ProjectionError> {
        self.properties
            .iter()
            .map(|property| root.get(property).map(SelectItem::from))
            .collect()
    }

    fn from_row(&self, row: &QueryRow) -> Result<T, ProjectionError> {
        T::from_query_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FooBar;

    impl Entity for FooBar {
        type Model = (String, i64);

        fn table_name(&self) -> &'static str {
            "foo_bar"
        }

        fn entity_name(&self) -> &'static str {
            "FooBar"
        }

        fn primary_key(&self) -> &'static str {
            "bar"
        }

        fn column_names(&self) -> &'static [&'static str] {
            &["foo", "bar"]
        }
    }

    #[test]
    fn test_entity_selection_selects_all_columns() {
        let root = Root::<FooBar>::new();
        let mut query = CriteriaQuery::new(&root);
        let items = EntitySelection::new().to_selection(&root, &mut query).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].alias.is_none());

        let row = QueryRow::new().with("foo", "x").with("bar", 4i64);
        let model = EntitySelection::<FooBar>::new().from_row(&row).unwrap();
        assert_eq!(model, ("x".to_string(), 4));
    }

    #[test]
    fn test_column_selection_rejects_unknown_property() {
        let root = Root::<FooBar>::new();
        let mut query = CriteriaQuery::new(&root);
        let selection = ColumnSelection::<FooBar, (String,)>::new(&["foo", "baz"]);
        assert!(matches!(
            selection.to_selection(&root, &mut query),
            Err(ProjectionError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_column_selection_decodes_tuple() {
        let selection = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);
        assert_eq!(selection.properties(), ["foo".to_string()]);
        let row = QueryRow::new().with("foo", "bar");
        assert_eq!(selection.from_row(&row).unwrap(), ("bar".to_string(),));
    }
}
