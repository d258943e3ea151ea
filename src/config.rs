//! Engine configuration.

use crate::error::{Error, Result};

/// Default number of pages the buffer pool caches.
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Default on-disk page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Knobs shared by the buffer pool and every table file it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    /// Maximum number of pages resident in the buffer pool.
    pub buffer_pool_pages: usize,
    /// Size of one page in bytes. Only tests should change this.
    pub page_size: usize,
}

impl DbConfig {
    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_pool_pages == 0 {
            return Err(Error::InvalidConfig(
                "buffer pool must hold at least one page".to_string(),
            ));
        }
        if self.page_size < 2 {
            return Err(Error::InvalidPageSize {
                page_size: self.page_size,
                reason: "a page must hold a header byte and at least one slot".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.buffer_pool_pages, 50);
        assert_eq!(config.page_size, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = DbConfig::default()
            .with_buffer_pool_pages(2)
            .with_page_size(64);
        assert_eq!(config.buffer_pool_pages, 2);
        assert_eq!(config.page_size, 64);
        assert!(config.validate().is_ok());

        assert!(DbConfig::default().with_buffer_pool_pages(0).validate().is_err());
        assert!(DbConfig::default().with_page_size(1).validate().is_err());
    }
}
