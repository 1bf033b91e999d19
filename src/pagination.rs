// 📄 Paginator - fixed-size pages over an ordered listing
//
// Pages are 1-based. Page 0 is rejected rather than clamped; a page past the
// end of the listing is simply empty.

use thiserror::Error;

/// Page size of the question listing
pub const QUESTIONS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page numbers start at 1")]
    InvalidPage,

    #[error("page size must be positive")]
    InvalidPageSize,
}

/// Slice of `items` belonging to `page`
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Result<&[T], PaginationError> {
    if page == 0 {
        return Err(PaginationError::InvalidPage);
    }
    if page_size == 0 {
        return Err(PaginationError::InvalidPageSize);
    }

    let start = match (page - 1).checked_mul(page_size) {
        Some(start) if start < items.len() => start,
        _ => return Ok(&[]),
    };
    let end = start.saturating_add(page_size).min(items.len());

    Ok(&items[start..end])
}

/// `paginate` with the listing page size
pub fn paginate_questions<T>(items: &[T], page: usize) -> Result<&[T], PaginationError> {
    paginate(items, page, QUESTIONS_PER_PAGE)
}

/// Number of non-empty pages
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}
