//! # Pager
//!
//! The pager owns the backing file and a fixed-capacity cache of page
//! buffers. Pages are loaded lazily on first access: a cache miss allocates
//! a zeroed buffer and, if the page exists on disk, fills it from the file.
//! Callers receive a mutable reference to the cached buffer and interpret
//! it through the node codecs in `crate::btree`.
//!
//! ## Cache Model
//!
//! ```text
//! Pager
//! ├── file          backing file, held open for the pager's lifetime
//! ├── file_length   byte length at open time; grows only through flush
//! ├── num_pages     count of pages known to exist (disk + freshly created)
//! └── pages[100]    Option<Box<[u8; 4096]>> slots, all empty at open
//! ```
//!
//! `num_pages` grows when a page index at or past the current count is
//! fetched for the first time. [`Pager::allocate_page`] simply hands out
//! `num_pages` as the next unused index; the caller is expected to fetch it
//! immediately, which performs the actual extension.
//!
//! ## Flushing
//!
//! [`Pager::flush`] always writes the full page. Node headers and internal
//! nodes depend on whole-page layout, so partial writes would corrupt the
//! tail of a reused page.
//!
//! ## Error Policy
//!
//! All I/O failures and invariant violations (out-of-bounds page index,
//! flushing an empty slot, a file that is not a whole number of pages) are
//! reported as errors and treated as fatal by the caller. There is no retry
//! and no recovery.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use eyre::{bail, ensure, Result, WrapErr};

use super::{PAGE_SIZE, TABLE_MAX_PAGES};

/// An owned, heap-allocated page buffer.
pub type PageBuf = [u8; PAGE_SIZE];

#[derive(Debug)]
pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    pages: Vec<Option<Box<PageBuf>>>,
}

impl Pager {
    /// Opens the database file, creating it if absent, and initializes an
    /// empty page cache sized to `TABLE_MAX_PAGES`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())
            .wrap_err_with(|| {
                format!("unable to open file '{}'", path.as_ref().display())
            })?;

        let file_length = file
            .seek(SeekFrom::End(0))
            .wrap_err("failed to determine database file length")?;

        ensure!(
            file_length % PAGE_SIZE as u64 == 0,
            "DB file is not a whole number of pages"
        );

        let mut pages = Vec::with_capacity(TABLE_MAX_PAGES);
        pages.resize_with(TABLE_MAX_PAGES, || None);

        Ok(Self {
            file,
            file_length,
            num_pages: (file_length / PAGE_SIZE as u64) as u32,
            pages,
        })
    }

    /// Count of pages considered to exist, cached or not.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the cached buffer for `page_num`, loading it from disk on a
    /// miss. A page past the end of the file comes back zero-filled.
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut PageBuf> {
        ensure!(
            (page_num as usize) < TABLE_MAX_PAGES,
            "tried to fetch page number out of bounds: {} >= {}",
            page_num,
            TABLE_MAX_PAGES
        );

        if self.pages[page_num as usize].is_none() {
            let mut buf: Box<PageBuf> = Box::new([0u8; PAGE_SIZE]);

            let pages_on_disk = self.file_length.div_ceil(PAGE_SIZE as u64) as u32;
            if page_num < pages_on_disk {
                self.read_page(page_num, &mut buf)?;
            }

            self.pages[page_num as usize] = Some(buf);
            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        match self.pages[page_num as usize].as_deref_mut() {
            Some(page) => Ok(page),
            None => bail!("page {} absent from cache after load", page_num),
        }
    }

    /// Next unused page index. The caller must `get_page` it immediately,
    /// which extends `num_pages` past the returned index.
    pub fn allocate_page(&self) -> u32 {
        self.num_pages
    }

    /// Writes the full cached page at its file offset.
    pub fn flush(&mut self, page_num: u32) -> Result<()> {
        let page = match self
            .pages
            .get(page_num as usize)
            .and_then(|slot| slot.as_deref())
        {
            Some(page) => page,
            None => bail!("tried to flush null page: {}", page_num),
        };

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))
            .wrap_err_with(|| format!("failed to seek to page {}", page_num))?;
        self.file
            .write_all(page)
            .wrap_err_with(|| format!("failed to write page {}", page_num))?;

        let end = (page_num as u64 + 1) * PAGE_SIZE as u64;
        if end > self.file_length {
            self.file_length = end;
        }

        Ok(())
    }

    /// Flushes and drops every cached page, then syncs the file. The file
    /// descriptor itself is released when the pager is dropped.
    pub fn close(&mut self) -> Result<()> {
        for i in 0..self.num_pages {
            if self.pages[i as usize].is_some() {
                self.flush(i)?;
                self.pages[i as usize] = None;
            }
        }

        self.file
            .sync_all()
            .wrap_err("failed to sync database file")?;
        Ok(())
    }

    fn read_page(&mut self, page_num: u32, buf: &mut PageBuf) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))
            .wrap_err_with(|| format!("failed to seek to page {}", page_num))?;

        // A short read is tolerated for the last page only; the tail of the
        // buffer stays zeroed.
        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = self
                .file
                .read(&mut buf[filled..])
                .wrap_err_with(|| format!("failed to read page {}", page_num))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let pager = Pager::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn open_rejects_partial_page_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 1]).unwrap();

        let result = Pager::open(&path);

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a whole number of pages"));
    }

    #[test]
    fn get_page_returns_zeroed_fresh_page() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let page = pager.get_page(0).unwrap();

        assert!(page.iter().all(|&b| b == 0));
        assert_eq!(pager.num_pages(), 1);
    }

    #[test]
    fn get_page_out_of_bounds_fails() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let result = pager.get_page(TABLE_MAX_PAGES as u32);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("out of bounds"));
    }

    #[test]
    fn allocate_page_returns_next_unused_index() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        assert_eq!(pager.allocate_page(), 0);
        pager.get_page(0).unwrap();
        assert_eq!(pager.allocate_page(), 1);
    }

    #[test]
    fn flush_null_page_fails() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let result = pager.flush(0);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("null page"));
    }

    #[test]
    fn pages_round_trip_through_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            let page = pager.get_page(0).unwrap();
            page[0] = 0xAB;
            page[PAGE_SIZE - 1] = 0xCD;
            pager.close().unwrap();
        }

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 1);
        let page = pager.get_page(0).unwrap();
        assert_eq!(page[0], 0xAB);
        assert_eq!(page[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn close_writes_whole_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        pager.get_page(0).unwrap();
        pager.get_page(1).unwrap();
        pager.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 2 * PAGE_SIZE as u64);
    }

    #[test]
    fn num_pages_tracks_highest_fetched_index() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        pager.get_page(3).unwrap();

        assert_eq!(pager.num_pages(), 4);
    }
}
