//! Fixed-size page slicing for listings

use serde::Serialize;

/// Items per listing page
pub const PAGE_SIZE: i64 = 10;

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: i64,
    pub num_pages: i64,
    /// Total items across all pages
    pub count: i64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

/// Number of pages for `count` items; an empty listing still has one page.
pub fn num_pages(count: i64) -> i64 {
    if count <= 0 {
        1
    } else {
        (count + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// Pick the page to serve from a raw `?page=` value.
///
/// Missing or non-numeric values select the first page; numbers outside
/// `1..=num_pages` clamp to the nearest valid page.
pub fn resolve_page(raw: Option<&str>, count: i64) -> i64 {
    let last = num_pages(count);
    match raw.map(str::trim).and_then(|raw| raw.parse::<i64>().ok()) {
        Some(n) => n.clamp(1, last),
        None => 1,
    }
}
