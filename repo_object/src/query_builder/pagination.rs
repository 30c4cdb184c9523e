//! Page requests

use crate::errors::RepositoryError;

/// One page of a bulk read: page `index` (zero based) of `offset` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationRequest {
    pub index: u32,
    pub offset: i32,
}

impl PaginationRequest {
    pub fn new(index: u32, offset: i32) -> Self {
        Self { index, offset }
    }

    /// Reject page sizes that would request zero or a negative row count
    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.offset <= 0 {
            return Err(RepositoryError::InvalidPageSize(self.offset));
        }
        Ok(())
    }

    /// Rows to skip: `index * offset`
    pub fn skip(&self) -> u64 {
        u64::from(self.index) * self.take()
    }

    /// Rows to take: the page size
    pub fn take(&self) -> u64 {
        u64::try_from(self.offset).unwrap_or(0)
    }
}
