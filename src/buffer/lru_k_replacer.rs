use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{FrameId, Timestamp};

/// Access bookkeeping for a single frame
#[derive(Debug)]
struct FrameRecord {
    /// Up to the last k access timestamps, oldest at the front
    history: VecDeque<Timestamp>,
    /// Total number of recorded accesses
    accesses: u64,
    /// Whether this frame may currently be evicted
    evictable: bool,
}

impl FrameRecord {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            accesses: 0,
            evictable: false,
        }
    }

    fn record(&mut self, now: Timestamp, k: usize) {
        self.history.push_back(now);
        while self.history.len() > k {
            self.history.pop_front();
        }
        self.accesses += 1;
    }

    /// Timestamp of the most recent access
    fn last_access(&self) -> Timestamp {
        *self.history.back().expect("record has at least one access")
    }

    /// Timestamp of the k-th most recent access; only meaningful once the
    /// frame has k or more accesses, when it sits at the front of the window
    fn kth_access(&self) -> Timestamp {
        *self.history.front().expect("record has at least one access")
    }
}

/// LRU-K replacement policy.
///
/// Frames with fewer than k recorded accesses form the history set, frames
/// with k or more the cache set. Eviction prefers the history set; within
/// history the frame with the oldest most-recent access is chosen, within
/// cache the frame whose k-th most recent access is oldest (the largest
/// backward k-distance). Timestamps are ticks of a monotonic counter.
pub struct LruKReplacer {
    k: usize,
    num_frames: usize,
    inner: Mutex<ReplacerInner>,
}

struct ReplacerInner {
    clock: Timestamp,
    frames: HashMap<FrameId, FrameRecord>,
    num_evictable: usize,
}

impl LruKReplacer {
    /// Creates a replacer tracking up to `num_frames` frames with history
    /// parameter `k` (k >= 1).
    pub fn new(k: usize, num_frames: usize) -> Self {
        assert!(k >= 1, "LRU-K requires k >= 1");
        Self {
            k,
            num_frames,
            inner: Mutex::new(ReplacerInner {
                clock: 0,
                frames: HashMap::new(),
                num_evictable: 0,
            }),
        }
    }

    /// Chooses and removes a victim frame, or None when nothing is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.num_evictable == 0 {
            return None;
        }

        let mut history_victim: Option<(FrameId, Timestamp)> = None;
        let mut cache_victim: Option<(FrameId, Timestamp)> = None;

        for (&frame_id, rec) in inner.frames.iter() {
            if !rec.evictable {
                continue;
            }
            if rec.accesses < self.k as u64 {
                let last = rec.last_access();
                if history_victim.map_or(true, |(_, best)| last < best) {
                    history_victim = Some((frame_id, last));
                }
            } else {
                let kth = rec.kth_access();
                if cache_victim.map_or(true, |(_, best)| kth < best) {
                    cache_victim = Some((frame_id, kth));
                }
            }
        }

        let (victim, _) = history_victim.or(cache_victim)?;
        inner.frames.remove(&victim);
        inner.num_evictable -= 1;
        Some(victim)
    }

    /// Records an access to the given frame. Out-of-range frame ids are
    /// ignored.
    pub fn record_access(&self, frame_id: FrameId) {
        if frame_id.as_usize() >= self.num_frames {
            return;
        }
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.clock += 1;
        let now = inner.clock;
        inner
            .frames
            .entry(frame_id)
            .or_insert_with(FrameRecord::new)
            .record(now, self.k);
    }

    /// Toggles a frame's evictable flag. The replacer size changes only on
    /// an actual transition; frames without a recorded access are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        if frame_id.as_usize() >= self.num_frames {
            return;
        }
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(rec) = inner.frames.get_mut(&frame_id) else {
            return;
        };
        if rec.evictable != evictable {
            rec.evictable = evictable;
            if evictable {
                inner.num_evictable += 1;
            } else {
                inner.num_evictable -= 1;
            }
        }
    }

    /// Drops a frame's bookkeeping entirely. Out-of-range or never-accessed
    /// frames are a no-op; removing a tracked non-evictable frame is a
    /// programming error.
    pub fn remove(&self, frame_id: FrameId) {
        if frame_id.as_usize() >= self.num_frames {
            return;
        }
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(rec) = inner.frames.get(&frame_id) else {
            return;
        };
        if !rec.evictable {
            panic!("LruKReplacer::remove called on non-evictable {frame_id}");
        }
        inner.frames.remove(&frame_id);
        inner.num_evictable -= 1;
    }

    /// Number of currently evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().num_evictable
    }

    /// The history parameter of this replacer.
    pub fn k(&self) -> usize {
        self.k
    }
}
