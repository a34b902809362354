use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId, PAGE_SIZE};

use super::buffer_pool_manager::PoolCore;
use super::FrameHeader;

/// RAII guard for shared access to a pinned page. Dropping the guard unpins
/// the page; the frame stays resident for the guard's whole lifetime.
pub struct ReadPageGuard {
    page_id: PageId,
    frame_id: FrameId,
    core: Arc<PoolCore>,
    /// Keeps the frame alive while the lifetime-erased data guard exists
    _frame: Arc<FrameHeader>,
    data: Option<RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    /// # Safety
    /// The frame must stay alive for the guard's lifetime; the held `Arc`
    /// guarantees this.
    pub(crate) unsafe fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        core: Arc<PoolCore>,
    ) -> Self {
        let frame_id = frame.frame_id();
        let data = frame.data.read();
        let data: RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>> = std::mem::transmute(data);
        Self {
            page_id,
            frame_id,
            core,
            _frame: frame,
            data: Some(data),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data.as_ref().expect("data guard alive")[..]
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Release the data latch before touching pool state
        self.data.take();
        self.core.release(self.frame_id, false);
    }
}

/// RAII guard for exclusive access to a pinned page. Mutable access marks
/// the guard dirty; dropping it unpins the page, OR-ing the dirty mark into
/// the frame so a later clean unpin cannot mask it.
pub struct WritePageGuard {
    page_id: PageId,
    frame_id: FrameId,
    core: Arc<PoolCore>,
    _frame: Arc<FrameHeader>,
    data: Option<RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>>,
    is_dirty: bool,
}

impl WritePageGuard {
    /// # Safety
    /// The frame must stay alive for the guard's lifetime; the held `Arc`
    /// guarantees this.
    pub(crate) unsafe fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        core: Arc<PoolCore>,
    ) -> Self {
        let frame_id = frame.frame_id();
        let data = frame.data.write();
        let data: RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>> = std::mem::transmute(data);
        Self {
            page_id,
            frame_id,
            core,
            _frame: frame,
            data: Some(data),
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data.as_ref().expect("data guard alive")[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        &mut self.data.as_mut().expect("data guard alive")[..]
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        // Release the data latch before touching pool state
        self.data.take();
        self.core.release(self.frame_id, self.is_dirty);
    }
}
