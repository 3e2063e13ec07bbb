//! # Lifeguard Projection
//!
//! Criteria queries over lifeguard entities that project into an arbitrary
//! result shape, with paging, sorting, row locks and planner hints.
//!
//! A [`Specification`] filters, a [`Selection`] decides what each row becomes,
//! and a [`SelectionRepository`] runs both through a [`QueryExecutor`]
//! (`may_postgres` in production, [`mock::MockExecutor`] in tests).

pub mod config;
pub mod connection;
pub mod executor;
pub mod metadata;
pub mod metrics;
pub mod page;
pub mod query;
pub mod repository;
pub mod row;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{DatabaseConfig, HintsConfig, PagingConfig, ProjectionConfig};
pub use connection::{connect, connect_with_config, ConnectionError};
pub use executor::{MayPostgresExecutor, ProjectionError, QueryExecutor, Statement};
pub use metadata::{
    apply_metadata, EntityGraph, HintPrecedence, LockMode, LockWait, QueryHints, QueryMetadata,
};
pub use page::{Page, PageRequest, Pageable};
pub use query::{
    build_count_query, build_query, not, read_page, where_fn, ColumnSelection, CountQuery,
    CriteriaQuery, Direction, Entity, EntitySelection, NullHandling, Root, SelectItem, Selection,
    Sort, SortOrder, Specification, SpecificationExt, TypedQuery,
};
pub use repository::{SelectionRepository, SpecificationSelectionExecutor};
pub use row::{FromQueryRow, QueryRow, TryGetable, ValueExtractionError};
