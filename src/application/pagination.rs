//! Offset pagination shared by every paginated read path.
//!
//! All defaults live here; call sites pick a [`PageDefaults`] preset instead of
//! repeating numbers.

use thiserror::Error;

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_OFFSET: u32 = 0;
pub const DEFAULT_RELATED_LIMIT: u32 = 3;
pub const DEFAULT_COMMENT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    pub limit: u32,
    pub offset: u32,
}

impl PageDefaults {
    pub const LISTING: Self = Self {
        limit: DEFAULT_LIMIT,
        offset: DEFAULT_OFFSET,
    };
    pub const RELATED: Self = Self {
        limit: DEFAULT_RELATED_LIMIT,
        offset: DEFAULT_OFFSET,
    };
    pub const COMMENTS: Self = Self {
        limit: DEFAULT_COMMENT_LIMIT,
        offset: DEFAULT_OFFSET,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    offset: u32,
}

impl PageRequest {
    /// Limits above [`MAX_LIMIT`] are clamped.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.min(MAX_LIMIT),
            offset,
        }
    }

    pub fn listing() -> Self {
        Self::from_defaults(PageDefaults::LISTING)
    }

    pub fn related() -> Self {
        Self::from_defaults(PageDefaults::RELATED)
    }

    pub fn comments() -> Self {
        Self::from_defaults(PageDefaults::COMMENTS)
    }

    pub fn from_defaults(defaults: PageDefaults) -> Self {
        Self::new(defaults.limit, defaults.offset)
    }

    /// Resolve optional caller input against `defaults`.
    pub fn from_input(
        limit: Option<i64>,
        offset: Option<i64>,
        defaults: PageDefaults,
    ) -> Result<Self, PaginationError> {
        let limit = resolve("limit", limit, defaults.limit)?;
        let offset = resolve("offset", offset, defaults.offset)?;
        Ok(Self::new(limit, offset))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }

    /// Apply the window to an already ordered sequence.
    pub fn slice<T, I>(&self, items: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::listing()
    }
}

fn resolve(field: &'static str, value: Option<i64>, fallback: u32) -> Result<u32, PaginationError> {
    match value {
        None => Ok(fallback),
        Some(value) if value < 0 => Err(PaginationError::Negative { field, value }),
        Some(value) => Ok(u32::try_from(value).unwrap_or(u32::MAX)),
    }
}
