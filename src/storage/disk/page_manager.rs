use crate::error::{Error, Result};
use crate::storage::page::PageId;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Raw positional access to a file of fixed-size pages.
pub struct PageManager {
    file: File,
    page_size: usize,
}

impl PageManager {
    /// Creates (or truncates) a page file.
    pub fn create(path: &Path, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self { file, page_size })
    }

    /// Opens an existing page file, creating an empty one if it is missing.
    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self { file, page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        self.check_buffer(buf.len())?;

        let offset = self.page_offset(page_id);
        let num_pages = self.num_pages()?;

        if page_id.page_no >= num_pages {
            return Err(Error::PageOutOfRange { page_id, num_pages });
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;

        Ok(())
    }

    /// Writes a full page, growing the file when the page lies past its end.
    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        self.check_buffer(data.len())?;

        let offset = self.page_offset(page_id);
        let file_size = self.file.metadata()?.len();

        if offset >= file_size {
            self.file.set_len(offset + self.page_size as u64)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Whole pages in the file; a torn trailing page is not counted.
    pub fn num_pages(&self) -> Result<u32> {
        let file_size = self.file.metadata()?.len();
        Ok((file_size / self.page_size as u64) as u32)
    }

    /// Appends one all-zero page and returns its number. A torn trailing page is overwritten.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let page_no = self.num_pages()?;
        let offset = page_no as u64 * self.page_size as u64;
        // Drop any torn tail; the extension is zero-filled.
        self.file.set_len(offset)?;
        self.file.set_len(offset + self.page_size as u64)?;
        self.file.sync_all()?;

        Ok(page_no)
    }

    fn check_buffer(&self, len: usize) -> Result<()> {
        if len != self.page_size {
            return Err(Error::InvalidPageSize {
                page_size: len,
                reason: format!("buffer must be exactly {} bytes", self.page_size),
            });
        }
        Ok(())
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        page_id.page_no as u64 * self.page_size as u64
    }
}
