//! Pure page math. No cache or network access; everything here is
//! synchronous and total, so out-of-range requests can be rejected before
//! any RPC quota is spent.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based, clamped into `[1, max(1, total_pages)]`.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// `ceil(total_items / page_size)`; 0 for an empty collection.
    pub total_pages: usize,
}

impl PageInfo {
    pub fn new(page: usize, page_size: usize, total_items: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(page_size);
        Self {
            page: page.clamp(1, total_pages.max(1)),
            page_size,
            total_items,
            total_pages,
        }
    }
}

/// Slice one page out of a full result set. The requested page is clamped
/// rather than rejected: callers land on the nearest valid page and the
/// returned `PageInfo` says which one that was.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> (Vec<T>, PageInfo) {
    let info = PageInfo::new(page, page_size, items.len());
    let start = (info.page - 1) * info.page_size;
    let end = (start + info.page_size).min(items.len());
    let slice = if start >= items.len() {
        Vec::new()
    } else {
        items[start..end].to_vec()
    };
    (slice, info)
}

/// Validate a page-change request against known page counts. `None` means
/// reject as a no-op: page numbers are 1-based and must not run past the
/// last page (an empty collection has no valid target at all).
pub fn change_page(info: &PageInfo, requested_page: usize) -> Option<usize> {
    if requested_page >= 1 && requested_page <= info.total_pages {
        Some(requested_page)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<u32> {
        (1..=n as u32).collect()
    }

    #[test]
    fn last_partial_page() {
        let (slice, info) = paginate(&items(23), 3, 10);
        assert_eq!(slice, vec![21, 22, 23]);
        assert_eq!(info.page, 3);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.total_items, 23);
    }

    #[test]
    fn exact_multiple_has_no_ghost_page() {
        let (_, info) = paginate(&items(20), 1, 10);
        assert_eq!(info.total_pages, 2);
    }

    #[test]
    fn out_of_range_page_clamps_to_nearest() {
        let (slice, info) = paginate(&items(23), 9, 10);
        assert_eq!(info.page, 3);
        assert_eq!(slice, vec![21, 22, 23]);

        let (slice, info) = paginate(&items(23), 0, 10);
        assert_eq!(info.page, 1);
        assert_eq!(slice, items(10));
    }

    #[test]
    fn empty_collection() {
        let (slice, info) = paginate(&items(0), 1, 10);
        assert!(slice.is_empty());
        assert_eq!(info.page, 1);
        assert_eq!(info.total_pages, 0);
    }

    #[test]
    fn zero_page_size_treated_as_one() {
        let (slice, info) = paginate(&items(3), 2, 0);
        assert_eq!(info.page_size, 1);
        assert_eq!(slice, vec![2]);
        assert_eq!(info.total_pages, 3);
    }

    #[test]
    fn change_page_bounds() {
        let info = PageInfo::new(1, 10, 23);
        assert_eq!(change_page(&info, 1), Some(1));
        assert_eq!(change_page(&info, 3), Some(3));
        assert_eq!(change_page(&info, 4), None);
        assert_eq!(change_page(&info, 0), None);
    }

    #[test]
    fn change_page_on_empty_rejects_everything() {
        let info = PageInfo::new(1, 10, 0);
        assert_eq!(change_page(&info, 1), None);
    }
}
