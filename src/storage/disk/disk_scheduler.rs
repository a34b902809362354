use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::common::{PageId, Result, StrataError, PAGE_SIZE};

use super::DiskManager;

/// A queued disk I/O request. Requests own their page buffer; reads hand the
/// filled buffer back through the completion channel.
enum DiskRequest {
    Read {
        page_id: PageId,
        done: mpsc::Sender<Result<Box<[u8; PAGE_SIZE]>>>,
    },
    Write {
        page_id: PageId,
        data: Box<[u8; PAGE_SIZE]>,
        done: mpsc::Sender<Result<()>>,
    },
}

/// DiskScheduler funnels page I/O through a background worker thread fed by
/// a bounded queue. The synchronous helpers block the caller until the
/// worker signals completion.
pub struct DiskScheduler {
    disk_manager: Arc<DiskManager>,
    request_tx: Sender<DiskRequest>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (request_tx, request_rx) = bounded::<DiskRequest>(128);
        let shutdown = Arc::new(AtomicBool::new(false));

        let dm = Arc::clone(&disk_manager);
        let stop = Arc::clone(&shutdown);
        let worker = thread::spawn(move || Self::run_worker(dm, request_rx, stop));

        Self {
            disk_manager,
            request_tx,
            shutdown,
            worker: Some(worker),
        }
    }

    /// Reads a page and blocks until the worker completes it.
    pub fn schedule_read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (done, rx) = mpsc::channel();
        self.submit(DiskRequest::Read { page_id, done })?;

        let buf = Self::wait(rx)??;
        data.copy_from_slice(&buf[..]);
        Ok(())
    }

    /// Writes a page and blocks until the worker completes it.
    pub fn schedule_write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let mut buf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);

        let (done, rx) = mpsc::channel();
        self.submit(DiskRequest::Write {
            page_id,
            data: buf,
            done,
        })?;

        Self::wait(rx)?
    }

    fn submit(&self, request: DiskRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|_| StrataError::DiskScheduler("request queue closed".to_string()))
    }

    fn wait<T>(rx: mpsc::Receiver<T>) -> Result<T> {
        rx.recv()
            .map_err(|_| StrataError::DiskScheduler("worker dropped completion".to_string()))
    }

    fn run_worker(
        disk_manager: Arc<DiskManager>,
        requests: Receiver<DiskRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Finish whatever is already queued before exiting
                while let Ok(request) = requests.try_recv() {
                    Self::process(&disk_manager, request);
                }
                break;
            }

            match requests.recv_timeout(Duration::from_millis(100)) {
                Ok(request) => Self::process(&disk_manager, request),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process(disk_manager: &DiskManager, request: DiskRequest) {
        match request {
            DiskRequest::Read { page_id, done } => {
                let mut buf = Box::new([0u8; PAGE_SIZE]);
                let result = disk_manager
                    .read_page(page_id, &mut buf[..])
                    .map(|()| buf);
                let _ = done.send(result);
            }
            DiskRequest::Write {
                page_id,
                data,
                done,
            } => {
                let _ = done.send(disk_manager.write_page(page_id, &data[..]));
            }
        }
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
