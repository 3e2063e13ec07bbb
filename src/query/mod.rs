//! Criteria queries with arbitrary projections.
//!
//! # Architecture
//!
//! - **Traits**: the [`Entity`] a query is rooted at
//! - **Criteria**: [`Root`] and [`CriteriaQuery`], the build context
//! - **Specification**: composable predicates
//! - **Selection**: what each row decodes into
//! - **Sort**: orderings resolved against entity properties
//! - **Select**: assembly of data and count queries
//! - **Execution**: running assembled queries, reading pages
//! - **Value Conversion**: SeaQuery `Value` to `ToSql` parameter binding
//!
//! # Examples
//!
//! ```no_run
//! use lifeguard_projection::{
//!     build_query, where_fn, ColumnSelection, CriteriaQuery, Entity, MayPostgresExecutor, Root,
//!     Sort,
//! };
//! use sea_query::{ExprTrait, IntoCondition};
//!
//! # #[derive(Default)]
//! # struct FooBar;
//! # impl Entity for FooBar {
//! #     type Model = ();
//! #     fn table_name(&self) -> &'static str { "foo_bar" }
//! #     fn column_names(&self) -> &'static [&'static str] { &["foo", "bar"] }
//! # }
//! # fn run(executor: &MayPostgresExecutor) -> Result<(), lifeguard_projection::ProjectionError> {
//! let spec = where_fn(|root: &Root<FooBar>, _query: &mut CriteriaQuery<FooBar>| {
//!     Some(root.col("bar").lt(10i64).into_condition())
//! });
//! let foos = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);
//!
//! let rows = build_query(Some(&spec), &foos, Some(&Sort::by(&["foo"])))?
//!     .get_result_list(executor)?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
#[doc(inline)]
pub use traits::Entity;

pub mod criteria;
#[doc(inline)]
pub use criteria::{CriteriaQuery, Root};

pub mod specification;
#[doc(inline)]
pub use specification::{not, where_fn, And, FnSpecification, Not, Or, Specification, SpecificationExt};

pub mod selection;
#[doc(inline)]
pub use selection::{ColumnSelection, EntitySelection, SelectItem, Selection};

pub mod sort;
#[doc(inline)]
pub use sort::{Direction, NullHandling, Sort, SortOrder};

pub mod select;
#[doc(inline)]
pub use select::{build_count_query, build_query, CountQuery, TypedQuery};

pub mod execution;
#[doc(inline)]
pub use execution::read_page;

pub(crate) mod value_conversion;
