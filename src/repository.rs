//! Repository operations combining a specification with a projection.
//!
//! [`SelectionRepository`] is the caller-facing entry point: it assembles the
//! query, applies the repository's [`QueryMetadata`] and runs it through a
//! [`QueryExecutor`].
//!
//! # Example
//!
//! ```no_run
//! use lifeguard_projection::{
//!     where_fn, ColumnSelection, CriteriaQuery, Entity, MayPostgresExecutor, PageRequest,
//!     ProjectionError, Root, SelectionRepository, Sort, SpecificationExt,
//!     SpecificationSelectionExecutor,
//! };
//! use sea_query::{ExprTrait, IntoCondition};
//!
//! # #[derive(Default)]
//! # struct FooBar;
//! # impl Entity for FooBar {
//! #     type Model = ();
//! #     fn table_name(&self) -> &'static str { "foo_bar" }
//! #     fn primary_key(&self) -> &'static str { "bar" }
//! #     fn column_names(&self) -> &'static [&'static str] { &["foo", "bar"] }
//! # }
//! # fn run(executor: &MayPostgresExecutor) -> Result<(), ProjectionError> {
//! let repository = SelectionRepository::<FooBar, _>::new(executor);
//! let bar_in = where_fn(|root: &Root<FooBar>, _q: &mut CriteriaQuery<FooBar>| {
//!     Some(root.col("bar").is_in([1i64, 2, 3]).into_condition())
//! });
//! let foo = ColumnSelection::<FooBar, (String,)>::new(&["foo"]);
//!
//! let first = repository.find_page(
//!     Some(&bar_in),
//!     &foo,
//!     PageRequest::of_sorted(0, 1, Sort::by(&["foo"]))?.into(),
//! )?;
//! assert_eq!(first.total_elements(), 3);
//! # Ok(())
//! # }
//! ```

use crate::config::PagingConfig;
use crate::executor::{ProjectionError, QueryExecutor};
use crate::metadata::{apply_metadata, QueryMetadata};
use crate::page::{Page, PageRequest, Pageable};
use crate::query::execution::read_page;
use crate::query::select::{build_count_query, build_query, TypedQuery};
use crate::query::selection::Selection;
use crate::query::sort::Sort;
use crate::query::specification::Specification;
use crate::query::traits::Entity;
use std::marker::PhantomData;

/// Projection-aware lookups over entity `E`
///
/// Every operation takes an optional specification (`None` matches every
/// record) and a mandatory selection deciding the result shape.
pub trait SpecificationSelectionExecutor<E: Entity> {
    /// The single match, `None` when nothing matches
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::NonUniqueResult` when more than one record matches.
    fn find_one<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
    ) -> Result<Option<S::Output>, ProjectionError>;

    /// Every match, in storage order
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError` if assembly or execution fails.
    fn find_all<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
    ) -> Result<Vec<S::Output>, ProjectionError>;

    /// Every match, ordered by `sort`
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::UnknownProperty` for a sort property the
    /// entity does not declare.
    fn find_all_sorted<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
        sort: &Sort,
    ) -> Result<Vec<S::Output>, ProjectionError>;

    /// One page of matches plus the total count
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError` if assembly, counting or execution fails.
    fn find_page<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
        pageable: Pageable,
    ) -> Result<Page<S::Output>, ProjectionError>;
}

/// [`SpecificationSelectionExecutor`] backed by a [`QueryExecutor`]
pub struct SelectionRepository<'e, E, X: ?Sized> {
    executor: &'e X,
    metadata: Option<QueryMetadata>,
    max_page_size: Option<u64>,
    _entity: PhantomData<fn() -> E>,
}

impl<'e, E, X> SelectionRepository<'e, E, X>
where
    E: Entity,
    X: QueryExecutor + ?Sized,
{
    pub fn new(executor: &'e X) -> Self {
        Self {
            executor,
            metadata: None,
            max_page_size: None,
            _entity: PhantomData,
        }
    }

    /// Lock, hints and entity graph applied to every data query
    #[must_use]
    pub fn with_metadata(mut self, metadata: QueryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Clamp page requests to `config.max_page_size`; zero leaves them uncapped.
    #[must_use]
    pub fn with_paging(mut self, config: &PagingConfig) -> Self {
        self.max_page_size = (config.max_page_size > 0).then_some(config.max_page_size);
        self
    }

    pub fn metadata(&self) -> Option<&QueryMetadata> {
        self.metadata.as_ref()
    }

    /// Number of records matching `spec`
    ///
    /// # Errors
    ///
    /// Returns the executor's error or `ProjectionError::QueryError` for an
    /// invalid count.
    pub fn count(&self, spec: Option<&dyn Specification<E>>) -> Result<u64, ProjectionError> {
        build_count_query(spec).fetch_total(self.executor)
    }

    fn query<'s, S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &'s S,
        sort: Option<&Sort>,
        operation: &str,
    ) -> Result<TypedQuery<'s, E, S>, ProjectionError> {
        let query = build_query(spec, selection, sort)?;
        Ok(apply_metadata(
            query,
            self.metadata.as_ref(),
            operation,
            self.executor.hint_precedence(),
        ))
    }

    fn clamp(&self, request: PageRequest) -> Result<PageRequest, ProjectionError> {
        match self.max_page_size {
            Some(max) if request.limit() > max => {
                log::warn!(
                    "page size {} exceeds the maximum of {}, clamping",
                    request.limit(),
                    max
                );
                let sort = request.sort().clone();
                Ok(PageRequest::with_offset(request.offset(), max)?.with_sort(sort))
            }
            _ => Ok(request),
        }
    }
}

impl<'e, E, X> SpecificationSelectionExecutor<E> for SelectionRepository<'e, E, X>
where
    E: Entity,
    X: QueryExecutor + ?Sized,
{
    fn find_one<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
    ) -> Result<Option<S::Output>, ProjectionError> {
        self.query(spec, selection, None, "find_one")?
            .get_single_result(self.executor)
    }

    fn find_all<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
    ) -> Result<Vec<S::Output>, ProjectionError> {
        self.query(spec, selection, None, "find_all")?
            .get_result_list(self.executor)
    }

    fn find_all_sorted<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
        sort: &Sort,
    ) -> Result<Vec<S::Output>, ProjectionError> {
        self.query(spec, selection, Some(sort), "find_all")?
            .get_result_list(self.executor)
    }

    fn find_page<S: Selection<E> + ?Sized>(
        &self,
        spec: Option<&dyn Specification<E>>,
        selection: &S,
        pageable: Pageable,
    ) -> Result<Page<S::Output>, ProjectionError> {
        match pageable {
            Pageable::Unpaged => {
                let content = self
                    .query(spec, selection, None, "find_page")?
                    .get_result_list(self.executor)?;
                Ok(Page::unpaged(content))
            }
            Pageable::Paged(request) => {
                let request = self.clamp(request)?;
                let query = self.query(spec, selection, Some(request.sort()), "find_page")?;
                read_page(query, &request, &build_count_query(spec), self.executor)
            }
        }
    }
}
