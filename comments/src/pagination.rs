use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        PageRequest { page, page_size }
    }

    pub fn validate(&self, max_page_size: usize) -> Result<()> {
        if self.page < 1 {
            return Err(Error::validation("Page must be at least 1"));
        }

        if self.page_size < 1 {
            return Err(Error::validation("Page size must be at least 1"));
        }

        if self.page_size > max_page_size {
            return Err(Error::validation(format!(
                "Page size too large (max {max_page_size})"
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Slices `[(page - 1) * page_size, page * page_size)` out of the full
/// result. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Result<Paginated<T>> {
    if request.page < 1 || request.page_size < 1 {
        return Err(Error::validation("Page and page size must be at least 1"));
    }

    let total = items.len();
    let start = (request.page - 1).saturating_mul(request.page_size);
    let items = items
        .into_iter()
        .skip(start)
        .take(request.page_size)
        .collect();

    Ok(Paginated {
        items,
        total,
        page: request.page,
        page_size: request.page_size,
        total_pages: total.div_ceil(request.page_size),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paginate_slices_pages() {
        let items: Vec<u32> = (1..=5).collect();

        let first = paginate(items.clone(), PageRequest::new(1, 2)).unwrap();
        assert_eq!(first.items, vec![1, 2]);
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages, 3);

        let last = paginate(items.clone(), PageRequest::new(3, 2)).unwrap();
        assert_eq!(last.items, vec![5]);

        let past_the_end = paginate(items, PageRequest::new(4, 2)).unwrap();
        assert!(past_the_end.items.is_empty());
        assert_eq!(past_the_end.total, 5);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), PageRequest::default()).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_zero_page_is_rejected() {
        assert!(matches!(
            paginate(vec![1], PageRequest::new(0, 10)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            PageRequest::new(1, 0).validate(100),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            PageRequest::new(1, 101).validate(100),
            Err(Error::Validation(_))
        ));
        assert!(PageRequest::new(1, 100).validate(100).is_ok());
    }
}
