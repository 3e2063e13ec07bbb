//! Page requests and page results.

use crate::executor::ProjectionError;
use crate::query::sort::Sort;
use serde::{Deserialize, Serialize};

const MAX_ROW: u64 = i64::MAX as u64;

/// Offset-based slice request with an optional sort
///
/// `limit` is always positive and `offset + limit` never exceeds `i64::MAX`,
/// the largest `OFFSET`/`LIMIT` PostgreSQL accepts as a `BIGINT` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PageRequestRepr")]
pub struct PageRequest {
    offset: u64,
    limit: u64,
    sort: Sort,
}

#[derive(Deserialize)]
struct PageRequestRepr {
    #[serde(default)]
    offset: u64,
    limit: u64,
    #[serde(default)]
    sort: Sort,
}

impl TryFrom<PageRequestRepr> for PageRequest {
    type Error = ProjectionError;

    fn try_from(repr: PageRequestRepr) -> Result<Self, Self::Error> {
        PageRequest::with_offset(repr.offset, repr.limit).map(|r| r.with_sort(repr.sort))
    }
}

impl PageRequest {
    /// Zero-based `page` of `size` elements
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::InvalidPageRequest` if `size` is zero or the
    /// resulting offset overflows.
    pub fn of(page: u64, size: u64) -> Result<Self, ProjectionError> {
        if size == 0 {
            return Err(ProjectionError::InvalidPageRequest(
                "page size must be greater than zero".to_string(),
            ));
        }
        let offset = page.checked_mul(size).ok_or_else(|| {
            ProjectionError::InvalidPageRequest(format!("page {page} of size {size} overflows"))
        })?;
        Self::with_offset(offset, size)
    }

    /// # Errors
    ///
    /// Same as [`PageRequest::of`].
    pub fn of_sorted(page: u64, size: u64, sort: Sort) -> Result<Self, ProjectionError> {
        Self::of(page, size).map(|r| r.with_sort(sort))
    }

    /// Raw `offset`/`limit` request
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::InvalidPageRequest` if `limit` is zero or
    /// `offset + limit` exceeds `i64::MAX`.
    pub fn with_offset(offset: u64, limit: u64) -> Result<Self, ProjectionError> {
        if limit == 0 {
            return Err(ProjectionError::InvalidPageRequest(
                "limit must be greater than zero".to_string(),
            ));
        }
        if !matches!(offset.checked_add(limit), Some(end) if end <= MAX_ROW) {
            return Err(ProjectionError::InvalidPageRequest(format!(
                "offset {offset} with limit {limit} exceeds {MAX_ROW}"
            )));
        }
        Ok(Self {
            offset,
            limit,
            sort: Sort::unsorted(),
        })
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Zero-based page number; an offset between page boundaries rounds down.
    pub fn page_number(&self) -> u64 {
        self.offset / self.limit
    }

    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }

    /// Request for the following page, saturating at the largest valid offset
    #[must_use]
    pub fn next(&self) -> Self {
        let offset = self.offset.saturating_add(self.limit).min(MAX_ROW - self.limit);
        Self {
            offset,
            limit: self.limit,
            sort: self.sort.clone(),
        }
    }

    #[must_use]
    pub fn previous_or_first(&self) -> Self {
        Self {
            offset: self.offset.saturating_sub(self.limit),
            limit: self.limit,
            sort: self.sort.clone(),
        }
    }

    #[must_use]
    pub fn first(&self) -> Self {
        Self {
            offset: 0,
            limit: self.limit,
            sort: self.sort.clone(),
        }
    }
}

/// Either a page request or "everything in one go"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pageable {
    #[default]
    Unpaged,
    Paged(PageRequest),
}

impl Pageable {
    pub fn is_paged(&self) -> bool {
        matches!(self, Pageable::Paged(_))
    }

    pub fn is_unpaged(&self) -> bool {
        !self.is_paged()
    }

    pub fn page_request(&self) -> Option<&PageRequest> {
        match self {
            Pageable::Paged(request) => Some(request),
            Pageable::Unpaged => None,
        }
    }
}

impl From<PageRequest> for Pageable {
    fn from(request: PageRequest) -> Self {
        Pageable::Paged(request)
    }
}

impl From<Option<PageRequest>> for Pageable {
    fn from(request: Option<PageRequest>) -> Self {
        request.map_or(Pageable::Unpaged, Pageable::Paged)
    }
}

/// One slice of results plus the total number of matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<R> {
    content: Vec<R>,
    pageable: Pageable,
    total: u64,
}

impl<R> Page<R> {
    pub fn new(content: Vec<R>, pageable: Pageable, total: u64) -> Self {
        Self {
            content,
            pageable,
            total,
        }
    }

    /// Every match in a single page
    pub fn unpaged(content: Vec<R>) -> Self {
        let total = content.len() as u64;
        Self::new(content, Pageable::Unpaged, total)
    }

    pub fn content(&self) -> &[R] {
        &self.content
    }

    pub fn into_content(self) -> Vec<R> {
        self.content
    }

    pub fn pageable(&self) -> &Pageable {
        &self.pageable
    }

    /// Total number of matches, ignoring paging
    pub fn total_elements(&self) -> u64 {
        self.total
    }

    /// Zero-based page number
    pub fn number(&self) -> u64 {
        self.pageable.page_request().map_or(0, PageRequest::page_number)
    }

    /// Requested page size; for an unpaged result, the content length
    pub fn size(&self) -> u64 {
        match &self.pageable {
            Pageable::Paged(request) => request.limit(),
            Pageable::Unpaged => self.content.len() as u64,
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn total_pages(&self) -> u64 {
        let size = self.size();
        if size == 0 {
            1
        } else {
            self.total.div_ceil(size)
        }
    }

    pub fn has_next(&self) -> bool {
        self.number() + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number() > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Convert the content, keeping paging information
    pub fn map<U, F: FnMut(R) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
            total: self.total,
        }
    }
}
