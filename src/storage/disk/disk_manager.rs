use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{PageId, Result, PAGE_SIZE};

/// DiskManager reads and writes fixed-size pages of a single database file.
///
/// Reads past the end of the file come back zero-filled; writes extend the
/// file as needed. Deallocated page ids are remembered for reuse by
/// `allocate_page`. Read/write/deallocation counters are kept for tests and
/// introspection.
pub struct DiskManager {
    file: Mutex<File>,
    db_path: PathBuf,
    num_pages: AtomicU32,
    num_reads: AtomicU32,
    num_writes: AtomicU32,
    num_deallocations: AtomicU32,
    free_pages: Mutex<Vec<PageId>>,
}

impl DiskManager {
    /// Opens (or creates) the database file at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        let pages_on_disk = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file: Mutex::new(file),
            db_path,
            num_pages: AtomicU32::new(pages_on_disk),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
            num_deallocations: AtomicU32::new(0),
            free_pages: Mutex::new(Vec::new()),
        })
    }

    /// Reads a page into `data` (must be PAGE_SIZE bytes). A short read
    /// zero-fills the remainder.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "buffer must be PAGE_SIZE bytes");
        debug_assert!(page_id.is_valid());

        let offset = page_id.as_u32() as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page from `data` (must be PAGE_SIZE bytes).
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "buffer must be PAGE_SIZE bytes");
        debug_assert!(page_id.is_valid());

        let offset = page_id.as_u32() as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_pages.fetch_max(page_id.as_u32() + 1, Ordering::Relaxed);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Hands out a page id, preferring previously deallocated ones. The
    /// buffer pool allocates its own monotonic ids and does not call this.
    pub fn allocate_page(&self) -> Result<PageId> {
        if let Some(page_id) = self.free_pages.lock().pop() {
            return Ok(page_id);
        }
        let page_id = PageId::new(self.num_pages.fetch_add(1, Ordering::SeqCst));
        self.write_page(page_id, &[0u8; PAGE_SIZE])?;
        Ok(page_id)
    }

    /// Marks a page id reusable.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        self.free_pages.lock().push(page_id);
        self.num_deallocations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::Relaxed)
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn num_deallocations(&self) -> u32 {
        self.num_deallocations.load(Ordering::Relaxed)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Forces file contents to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}
