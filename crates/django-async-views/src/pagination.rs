//! Pagination over any [`ObjectList`].
//!
//! A [`Paginator`] splits a list (a `Vec` or a lazy `QuerySet`) into pages
//! of `per_page` items. Trailing remainders of up to `orphans` items are
//! folded into the last page instead of forming a near-empty page of their
//! own. The total count is fetched once and cached; each page then costs a
//! single `fetch_range`.
//!
//! # Examples
//!
//! ```
//! use django_async_views::pagination::Paginator;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let items: Vec<i32> = (1..=100).collect();
//! let paginator = Paginator::new(items, 30);
//! assert_eq!(paginator.num_pages().await.unwrap(), 4);
//!
//! let last = paginator.page_for_token("last").await.unwrap();
//! assert_eq!(last.object_list(), &[91, 92, 93, 94, 95, 96, 97, 98, 99, 100]);
//! assert_eq!(last.start_index(), 91);
//! # }
//! ```

use std::fmt;
use std::ops::RangeInclusive;

use django_async_core::DjangoError;
use django_async_db::ObjectList;
use serde::Serialize;
use serde_json::json;
use tokio::sync::OnceCell;

/// The marker shown for gaps in an elided page range.
pub const ELLIPSIS: &str = "…";

/// Why a page could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    /// The page token is not a whole number.
    #[error("{0}")]
    PageNotAnInteger(String),
    /// The page number is out of range.
    #[error("{0}")]
    EmptyPage(String),
    /// Counting or fetching the underlying list failed.
    #[error(transparent)]
    Backend(#[from] DjangoError),
}

impl PaginationError {
    fn not_an_integer() -> Self {
        Self::PageNotAnInteger("That page number is not an integer".to_string())
    }

    fn less_than_one() -> Self {
        Self::EmptyPage("That page number is less than 1".to_string())
    }

    fn no_results() -> Self {
        Self::EmptyPage("That page contains no results".to_string())
    }

    /// Whether this is a bad page request rather than a backend failure.
    pub const fn is_invalid_page(&self) -> bool {
        matches!(self, Self::PageNotAnInteger(_) | Self::EmptyPage(_))
    }
}

impl From<PaginationError> for DjangoError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::PageNotAnInteger(msg) | PaginationError::EmptyPage(msg) => {
                Self::NotFound(msg)
            }
            PaginationError::Backend(inner) => inner,
        }
    }
}

/// One entry of [`Paginator::get_elided_page_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRangeItem {
    Page(usize),
    Ellipsis,
}

impl PageRangeItem {
    /// A page number as a JSON number, a gap as `"…"`.
    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Page(n) => json!(n),
            Self::Ellipsis => json!(ELLIPSIS),
        }
    }
}

impl fmt::Display for PageRangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str(ELLIPSIS),
        }
    }
}

/// Parses a page token: an integer, or a float with no fractional part.
#[allow(clippy::cast_possible_truncation)]
fn parse_page_number(token: &str) -> Result<i64, PaginationError> {
    let token = token.trim();
    if let Ok(n) = token.parse::<i64>() {
        return Ok(n);
    }
    match token.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
        _ => Err(PaginationError::not_an_integer()),
    }
}

/// Splits an [`ObjectList`] into pages.
pub struct Paginator<L: ObjectList> {
    object_list: L,
    per_page: usize,
    orphans: usize,
    allow_empty_first_page: bool,
    count: OnceCell<usize>,
}

impl<L: ObjectList> fmt::Debug for Paginator<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("per_page", &self.per_page)
            .field("orphans", &self.orphans)
            .field("allow_empty_first_page", &self.allow_empty_first_page)
            .field("count", &self.count.get())
            .finish_non_exhaustive()
    }
}

impl<L: ObjectList> Paginator<L> {
    /// Creates a paginator. A `per_page` of zero is treated as one.
    ///
    /// Logs a warning when `object_list` has no defined order, since pages
    /// of an unordered query may overlap.
    pub fn new(object_list: L, per_page: usize) -> Self {
        if !object_list.is_ordered() {
            let name = object_list
                .model_meta()
                .map_or("object_list", |meta| meta.object_name);
            tracing::warn!(
                "Pagination may yield inconsistent results with an unordered object_list: {name}"
            );
        }
        Self {
            object_list,
            per_page: per_page.max(1),
            orphans: 0,
            allow_empty_first_page: true,
            count: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn orphans(mut self, orphans: usize) -> Self {
        self.orphans = orphans;
        self
    }

    #[must_use]
    pub const fn allow_empty_first_page(mut self, allow: bool) -> Self {
        self.allow_empty_first_page = allow;
        self
    }

    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    pub const fn object_list(&self) -> &L {
        &self.object_list
    }

    /// The total number of items, counted on first use.
    pub async fn count(&self) -> Result<usize, PaginationError> {
        let count = self
            .count
            .get_or_try_init(|| async { self.object_list.count().await })
            .await?;
        Ok(*count)
    }

    /// The number of pages, counting a short trailing page as part of the
    /// previous one when it has at most `orphans` items.
    pub async fn num_pages(&self) -> Result<usize, PaginationError> {
        let count = self.count().await?;
        if count == 0 && !self.allow_empty_first_page {
            return Ok(0);
        }
        let hits = count.saturating_sub(self.orphans).max(1);
        Ok(hits.div_ceil(self.per_page))
    }

    /// 1-based page numbers. Empty when there are no pages.
    pub async fn page_range(&self) -> Result<RangeInclusive<usize>, PaginationError> {
        Ok(1..=self.num_pages().await?)
    }

    async fn validate_page(&self, number: i64) -> Result<usize, PaginationError> {
        let Ok(number) = usize::try_from(number) else {
            return Err(PaginationError::less_than_one());
        };
        if number < 1 {
            return Err(PaginationError::less_than_one());
        }
        if number > self.num_pages().await? && !(number == 1 && self.allow_empty_first_page) {
            return Err(PaginationError::no_results());
        }
        Ok(number)
    }

    /// Validates a page token and returns it as a page number.
    pub async fn validate_number(&self, token: &str) -> Result<usize, PaginationError> {
        let number = parse_page_number(token)?;
        self.validate_page(number).await
    }

    /// Returns page `number`.
    pub async fn page(&self, number: i64) -> Result<Page<L::Item>, PaginationError> {
        let number = self.validate_page(number).await?;
        let count = self.count().await?;
        let bottom = (number - 1) * self.per_page;
        let mut top = bottom + self.per_page;
        if top + self.orphans >= count {
            top = count;
        }
        let object_list = self.object_list.fetch_range(bottom, top).await?;
        Ok(Page {
            object_list,
            number,
            count,
            num_pages: self.num_pages().await?,
            per_page: self.per_page,
        })
    }

    /// Returns the page for a URL token: a number, or `"last"`.
    pub async fn page_for_token(&self, token: &str) -> Result<Page<L::Item>, PaginationError> {
        let number = if token == "last" {
            i64::try_from(self.num_pages().await?).unwrap_or(i64::MAX)
        } else {
            parse_page_number(token)?
        };
        self.page(number).await
    }

    /// Like [`page_for_token`](Self::page_for_token) but forgiving: a
    /// non-number gives the first page and an out-of-range number the last.
    pub async fn get_page(&self, token: &str) -> Result<Page<L::Item>, PaginationError> {
        let number = match self.validate_number(token).await {
            Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Err(PaginationError::PageNotAnInteger(_)) => 1,
            Err(PaginationError::EmptyPage(_)) => {
                i64::try_from(self.num_pages().await?).unwrap_or(i64::MAX)
            }
            Err(err) => return Err(err),
        };
        self.page(number).await
    }

    /// Page numbers around `number` with the ends kept and gaps elided.
    ///
    /// With 100 pages, page 50 and the defaults (3, 2) gives
    /// `1 2 … 47 48 49 50 51 52 53 … 99 100`.
    pub async fn get_elided_page_range(
        &self,
        number: usize,
        on_each_side: usize,
        on_ends: usize,
    ) -> Result<Vec<PageRangeItem>, PaginationError> {
        let number = self
            .validate_page(i64::try_from(number).unwrap_or(i64::MAX))
            .await?;
        let num_pages = self.num_pages().await?;

        if num_pages <= (on_each_side + on_ends) * 2 {
            return Ok((1..=num_pages).map(PageRangeItem::Page).collect());
        }

        let mut items = Vec::new();
        if number > on_each_side + on_ends + 2 {
            items.extend((1..=on_ends).map(PageRangeItem::Page));
            items.push(PageRangeItem::Ellipsis);
            items.extend((number - on_each_side..=number).map(PageRangeItem::Page));
        } else {
            items.extend((1..=number).map(PageRangeItem::Page));
        }

        if number + on_each_side + on_ends + 1 < num_pages {
            items.extend((number + 1..=number + on_each_side).map(PageRangeItem::Page));
            items.push(PageRangeItem::Ellipsis);
            items.extend((num_pages - on_ends + 1..=num_pages).map(PageRangeItem::Page));
        } else {
            items.extend((number + 1..=num_pages).map(PageRangeItem::Page));
        }
        Ok(items)
    }

    /// The paginator as template data.
    pub async fn to_context(&self) -> Result<serde_json::Value, PaginationError> {
        let num_pages = self.num_pages().await?;
        Ok(json!({
            "count": self.count().await?,
            "num_pages": num_pages,
            "per_page": self.per_page,
            "orphans": self.orphans,
            "page_range": (1..=num_pages).collect::<Vec<_>>(),
        }))
    }
}

/// One page of a [`Paginator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    object_list: Vec<T>,
    number: usize,
    count: usize,
    num_pages: usize,
    per_page: usize,
}

impl<T> Page<T> {
    pub fn object_list(&self) -> &[T] {
        &self.object_list
    }

    pub fn into_object_list(self) -> Vec<T> {
        self.object_list
    }

    /// The 1-based page number.
    pub const fn number(&self) -> usize {
        self.number
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub const fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_page_number(&self) -> Result<usize, PaginationError> {
        if self.has_next() {
            Ok(self.number + 1)
        } else {
            Err(PaginationError::no_results())
        }
    }

    pub fn previous_page_number(&self) -> Result<usize, PaginationError> {
        if self.has_previous() {
            Ok(self.number - 1)
        } else {
            Err(PaginationError::less_than_one())
        }
    }

    /// The 1-based index of the first item, or 0 when the list is empty.
    pub const fn start_index(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        self.per_page * (self.number - 1) + 1
    }

    /// The 1-based index of the last item.
    pub const fn end_index(&self) -> usize {
        if self.number == self.num_pages {
            return self.count;
        }
        self.number * self.per_page
    }
}

impl<T: Serialize> Page<T> {
    /// The page as template data.
    pub fn to_context(&self) -> serde_json::Value {
        json!({
            "object_list": self.object_list,
            "number": self.number,
            "has_next": self.has_next(),
            "has_previous": self.has_previous(),
            "has_other_pages": self.has_other_pages(),
            "next_page_number": self.next_page_number().ok(),
            "previous_page_number": self.previous_page_number().ok(),
            "start_index": self.start_index(),
            "end_index": self.end_index(),
        })
    }
}
