//! Page arithmetic for listings.

use serde::Serialize;

/// Page size for public recipe and blog listings.
pub const PUBLIC_PAGE_SIZE: u32 = 12;
/// Page size for the admin back-office tables.
pub const ADMIN_PAGE_SIZE: u32 = 25;

/// A 1-indexed page of fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: u32,
    size: u32,
}

impl PageRequest {
    /// Pages below 1 clamp to 1; a zero size is treated as 1.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.number) - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// ceil(total / size); zero when there are no rows.
pub fn total_pages(total: i64, size: u32) -> u32 {
    if total <= 0 {
        return 0;
    }
    let size = i64::from(size.max(1));
    u32::try_from((total + size - 1) / size).unwrap_or(u32::MAX)
}

/// One page of results plus the numbers needed to render pagination links.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.number(),
            page_size: request.size(),
            total_pages: total_pages(total, request.size()),
        }
    }

    /// Slice an already filtered and sorted collection.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(request.size() as usize)
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}
