//! Heap configuration parameters.

use strata_core::HeapError;

/// Configuration for a [`crate::Heap`].
///
/// Controls the depth of the generation ring and the page size of every
/// pool. Validated at construction; immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Number of generations kept in the ring (K).
    ///
    /// Default: 2 (the head plus the generation it was copied from, which
    /// is what [`crate::Heap::update`] resolves against). Must be at least 2,
    /// because a step copies out of the head into a different generation.
    pub depth: usize,

    /// Number of record slots per page (N).
    ///
    /// Default: 256. Must be at least 1.
    pub page_capacity: usize,
}

impl HeapConfig {
    /// Default ring depth.
    pub const DEFAULT_DEPTH: usize = 2;

    /// Default slots per page.
    pub const DEFAULT_PAGE_CAPACITY: usize = 256;

    /// Create a config with the given ring depth and the default page size.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            page_capacity: Self::DEFAULT_PAGE_CAPACITY,
        }
    }

    /// Replace the page size.
    pub fn with_page_capacity(mut self, page_capacity: usize) -> Self {
        self.page_capacity = page_capacity;
        self
    }

    /// Check the documented bounds.
    pub fn validate(&self) -> Result<(), HeapError> {
        if self.depth < 2 {
            return Err(HeapError::InvalidConfig {
                reason: format!("depth must be >= 2 (got {})", self.depth),
            });
        }
        if self.page_capacity == 0 {
            return Err(HeapError::InvalidConfig {
                reason: "page_capacity must be >= 1 (got 0)".into(),
            });
        }
        if u32::try_from(self.page_capacity).is_err() {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "page_capacity must fit in u32 (got {})",
                    self.page_capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEPTH)
    }
}
