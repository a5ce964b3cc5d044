use super::errors::DomainError;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

/// 1-based page window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaginationRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PaginationRequest {
    /// Builds a window from raw query values, clamping `limit` to `1..=MAX_LIMIT`.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Result<Self, DomainError> {
        let page = match page {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| {
                    DomainError::ValidationError(format!("page must be a positive integer, got '{raw}'"))
                })?,
            None => 1,
        };
        let limit = match limit {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DomainError::ValidationError(format!("limit must be a positive integer, got '{raw}'"))
            })?,
            None => DEFAULT_LIMIT,
        };

        Ok(Self {
            page,
            limit: limit.clamp(1, MAX_LIMIT),
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
