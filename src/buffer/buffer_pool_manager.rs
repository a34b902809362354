use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::common::{FrameId, PageId, Result, StrataError, PAGE_SIZE, PAGE_TABLE_BUCKET_SIZE};
use crate::container::ExtendibleHashTable;
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{FrameHeader, LruKReplacer, ReadPageGuard, WritePageGuard};

/// Pool bookkeeping guarded by the pool mutex
struct PoolState {
    /// Frames holding no page
    free_list: VecDeque<FrameId>,
    /// Next page id handed out; page 0 is reserved for the header page
    next_page_id: u32,
}

/// State shared between the pool and its page guards
pub(crate) struct PoolCore {
    frames: Vec<Arc<FrameHeader>>,
    state: Mutex<PoolState>,
    /// page id -> frame id for every resident page
    page_table: ExtendibleHashTable<PageId, FrameId>,
    replacer: LruKReplacer,
    disk: DiskScheduler,
}

impl PoolCore {
    /// Unpin step run when a guard drops: OR the dirty mark into the frame
    /// and make the frame evictable once the pin count reaches zero. The
    /// caller must have released the frame's data latch already.
    pub(crate) fn release(&self, frame_id: FrameId, is_dirty: bool) {
        let _state = self.state.lock();
        let frame = &self.frames[frame_id.as_usize()];
        if is_dirty {
            frame.set_dirty(true);
        }
        if let Some(0) = frame.unpin() {
            self.replacer.set_evictable(frame_id, true);
        }
    }

    /// Obtains an empty frame: from the free list if possible, otherwise by
    /// evicting a replacer victim (writing it back first when dirty). The
    /// victim's page-table entry is erased before the frame is reused.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.replacer.evict() else {
            return Err(StrataError::PoolExhausted);
        };
        let frame = &self.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            debug!("evicting dirty {old_page_id} from {frame_id}, writing back");
            let mut buf = [0u8; PAGE_SIZE];
            frame.copy_into(&mut buf);
            if let Err(e) = self.disk.schedule_write_sync(old_page_id, &buf) {
                // The page is gone from the pool either way; keep the frame
                // usable and surface the I/O failure
                self.page_table.remove(&old_page_id);
                frame.reset();
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        }

        self.page_table.remove(&old_page_id);
        frame.reset();
        Ok(frame_id)
    }
}

/// BufferPoolManager caches a bounded number of disk pages in memory.
///
/// It owns the frame array, free list, page table and LRU-K replacer, and
/// serves new/fetch/flush/delete. Pages are handed out through pinning RAII
/// guards; a guard's drop is the unpin. Lock order is fixed: the pool mutex
/// first, then the replacer or page-table mutex, never the reverse.
pub struct BufferPoolManager {
    pool_size: usize,
    core: Arc<PoolCore>,
}

impl BufferPoolManager {
    /// Creates a pool with `pool_size` frames and an LRU-K replacer with the
    /// given `replacer_k`, backed by `disk_manager`.
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        let core = Arc::new(PoolCore {
            frames,
            state: Mutex::new(PoolState {
                free_list,
                next_page_id: 1,
            }),
            page_table: ExtendibleHashTable::new(PAGE_TABLE_BUCKET_SIZE),
            replacer: LruKReplacer::new(replacer_k, pool_size),
            disk: DiskScheduler::new(disk_manager),
        });

        Self { pool_size, core }
    }

    /// Allocates a fresh page id and returns it pinned in a zeroed frame.
    /// Fails with `PoolExhausted` when no free or evictable frame exists.
    pub fn new_page(&self) -> Result<WritePageGuard> {
        let core = &self.core;
        let (page_id, frame) = {
            let mut state = core.state.lock();
            let frame_id = core.acquire_frame(&mut state)?;
            let page_id = PageId::new(state.next_page_id);
            state.next_page_id += 1;

            let frame = Arc::clone(&core.frames[frame_id.as_usize()]);
            frame.set_page_id(page_id);
            frame.pin();
            core.replacer.record_access(frame_id);
            core.replacer.set_evictable(frame_id, false);
            core.page_table.insert(page_id, frame_id);
            (page_id, frame)
        };

        // The frame is pinned; the data latch is taken outside the pool mutex
        Ok(unsafe { WritePageGuard::new(page_id, frame, Arc::clone(core)) })
    }

    /// Fetches a page for shared access, reading it from disk on a miss.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        let frame = self.fetch_frame(page_id)?;
        Ok(unsafe { ReadPageGuard::new(page_id, frame, Arc::clone(&self.core)) })
    }

    /// Fetches a page for exclusive access, reading it from disk on a miss.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        let frame = self.fetch_frame(page_id)?;
        Ok(unsafe { WritePageGuard::new(page_id, frame, Arc::clone(&self.core)) })
    }

    /// Pins the frame holding `page_id`, pulling the page in from disk when
    /// it is not resident.
    fn fetch_frame(&self, page_id: PageId) -> Result<Arc<FrameHeader>> {
        if !page_id.is_valid() {
            return Err(StrataError::InvalidPageId(page_id));
        }

        let core = &self.core;
        let mut state = core.state.lock();

        if let Some(frame_id) = core.page_table.find(&page_id) {
            let frame = Arc::clone(&core.frames[frame_id.as_usize()]);
            frame.pin();
            core.replacer.record_access(frame_id);
            core.replacer.set_evictable(frame_id, false);
            return Ok(frame);
        }

        let frame_id = core.acquire_frame(&mut state)?;
        let frame = Arc::clone(&core.frames[frame_id.as_usize()]);

        let mut buf = [0u8; PAGE_SIZE];
        if let Err(e) = core.disk.schedule_read_sync(page_id, &mut buf) {
            state.free_list.push_back(frame_id);
            return Err(e);
        }
        frame.set_page_id(page_id);
        frame.fill_from(&buf);
        frame.set_dirty(false);
        frame.pin();

        core.replacer.record_access(frame_id);
        core.replacer.set_evictable(frame_id, false);
        core.page_table.insert(page_id, frame_id);
        Ok(frame)
    }

    /// Writes a resident page to disk and clears its dirty flag. Returns
    /// false when the page is not resident. Pin count and evictability are
    /// unaffected.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Ok(false);
        }
        let core = &self.core;
        let _state = core.state.lock();

        let Some(frame_id) = core.page_table.find(&page_id) else {
            return Ok(false);
        };
        let frame = &core.frames[frame_id.as_usize()];

        let mut buf = [0u8; PAGE_SIZE];
        frame.copy_into(&mut buf);
        core.disk.schedule_write_sync(page_id, &buf)?;
        frame.set_dirty(false);
        Ok(true)
    }

    /// Writes every resident page to disk, clearing dirty flags.
    pub fn flush_all_pages(&self) -> Result<()> {
        let core = &self.core;
        let _state = core.state.lock();

        for frame in &core.frames {
            let page_id = frame.page_id();
            if !page_id.is_valid() {
                continue;
            }
            let mut buf = [0u8; PAGE_SIZE];
            frame.copy_into(&mut buf);
            core.disk.schedule_write_sync(page_id, &buf)?;
            frame.set_dirty(false);
        }
        Ok(())
    }

    /// Removes a page from the pool and deallocates it on disk. Returns
    /// false when the page is resident and pinned; a non-resident page is
    /// trivial success.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let core = &self.core;
        let mut state = core.state.lock();

        let Some(frame_id) = core.page_table.find(&page_id) else {
            return Ok(true);
        };
        let frame = &core.frames[frame_id.as_usize()];
        if frame.pin_count() > 0 {
            return Ok(false);
        }

        core.replacer.remove(frame_id);
        frame.reset();
        core.page_table.remove(&page_id);
        state.free_list.push_back(frame_id);
        core.disk.disk_manager().deallocate_page(page_id)?;
        Ok(true)
    }

    /// Pin count of a resident page, None when not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let core = &self.core;
        let _state = core.state.lock();
        core.page_table
            .find(&page_id)
            .map(|frame_id| core.frames[frame_id.as_usize()].pin_count())
    }

    /// Dirty flag of a resident page, None when not resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let core = &self.core;
        let _state = core.state.lock();
        core.page_table
            .find(&page_id)
            .map(|frame_id| core.frames[frame_id.as_usize()].is_dirty())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.core.state.lock().free_list.len()
    }

    /// The disk manager backing this pool.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.core.disk.disk_manager()
    }
}
