//! Core entity trait for projection queries.

use crate::metadata::QueryHints;

/// A mapped record type: the root every criteria query selects from.
///
/// Following lifeguard's entity pattern, the entity is a zero-sized `Default`
/// marker and its full-row representation is the associated `Model`.
///
/// # Example
///
/// ```
/// use lifeguard_projection::Entity;
///
/// #[derive(Default)]
/// struct FooBar;
///
/// impl Entity for FooBar {
///     type Model = (String, i64);
///
///     fn table_name(&self) -> &'static str {
///         "foo_bar"
///     }
///
///     fn primary_key(&self) -> &'static str {
///         "bar"
///     }
///
///     fn column_names(&self) -> &'static [&'static str] {
///         &["foo", "bar"]
///     }
/// }
///
/// assert_eq!(FooBar.column("foo"), Some("foo"));
/// assert_eq!(FooBar.column("baz"), None);
/// ```
pub trait Entity: Default {
    /// Full-row type decoded by [`crate::EntitySelection`]
    type Model;

    fn table_name(&self) -> &'static str;

    /// Name used for fallback entity-graph lookups; defaults to the table name.
    fn entity_name(&self) -> &'static str {
        self.table_name()
    }

    /// Column counted by `COUNT(DISTINCT ...)` when a predicate asks for
    /// distinct results.
    fn primary_key(&self) -> &'static str {
        "id"
    }

    /// Every column a sort or a column selection may reference
    fn column_names(&self) -> &'static [&'static str];

    /// Hints contributed by the named entity graph, if the entity declares it.
    fn entity_graph(&self, _name: &str) -> Option<QueryHints> {
        None
    }

    /// Resolve a property name to its declared column
    fn column(&self, property: &str) -> Option<&'static str> {
        self.column_names().iter().copied().find(|c| *c == property)
    }
}
