//! Page/limit pagination shared by list operations.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// 1-based page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> DomainResult<Self> {
        if page == 0 {
            return Err(DomainError::validation("page must be >= 1"));
        }
        if limit == 0 {
            return Err(DomainError::validation("limit must be >= 1"));
        }
        Ok(Self { page, limit })
    }

    /// Build from optional adapter input, applying defaults and the upper bound.
    pub fn resolve(
        page: Option<u32>,
        limit: Option<u32>,
        default_limit: u32,
        max_limit: u32,
    ) -> DomainResult<Self> {
        let req = Self::new(page.unwrap_or(1), limit.unwrap_or(default_limit))?;
        Ok(req.clamped(max_limit))
    }

    pub fn clamped(self, max_limit: u32) -> Self {
        Self {
            page: self.page,
            limit: self.limit.min(max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Slice an already-ordered, fully materialized result set.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit as usize)
            .collect();
        Page {
            items,
            page: self.page,
            limit: self.limit,
            total,
        }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) * (self.limit as u64) < self.total
    }
}
