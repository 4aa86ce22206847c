//! Two sample buffers that trade places between the controller and the audio thread.
//!
//! Buffers are owned `Vec<f32>`s that physically move:
//! - the audio thread holds the *play* buffer outside the lock while it writes it;
//! - the controller *takes* the work buffer out of the slot ([`DoubleBuffer::take_work`]),
//!   fills it outside the lock, and hands it back ([`DoubleBuffer::return_work`]).
//!
//! [`DoubleBuffer::swap`] exchanges the audio thread's buffer with the one in the
//! slot, flips the play index and marks the slot dirty. If the work buffer is
//! out being filled, the swap waits for it to come back; a fill is bounded and
//! never waits on the audio thread, so this cannot deadlock. The lock itself
//! only ever covers a few field updates and a `mem::swap` of two `Vec` headers.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct Slot {
    /// Buffer index (0 or 1) currently owned by the audio thread.
    play_index: usize,
    /// Work buffer was drained and must be refilled before the next swap.
    dirty: bool,
    /// `None` while the controller fills it.
    work: Option<Vec<f32>>,
    /// Parked play buffer, until the audio thread claims it.
    play: Option<Vec<f32>>,
    swaps: u64,
    closed: bool,
}

#[derive(Debug)]
pub struct DoubleBuffer {
    slot: Mutex<Slot>,
    returned: Condvar,
    len: usize,
}

impl DoubleBuffer {
    /// Two zeroed buffers of `len` samples. Buffer 0 starts as the play
    /// buffer; buffer 1 is the work buffer and starts dirty so the first
    /// request fills it.
    pub fn new(len: usize) -> Self {
        Self {
            slot: Mutex::new(Slot {
                play_index: 0,
                dirty: true,
                work: Some(vec![0.0; len]),
                play: Some(vec![0.0; len]),
                swaps: 0,
                closed: false,
            }),
            returned: Condvar::new(),
            len,
        }
    }

    /// Samples per buffer.
    #[inline] pub fn len(&self) -> usize { self.len }

    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Hand the initial play buffer to the audio thread. Only the first call
    /// gets it.
    pub fn claim_play(&self) -> Option<Vec<f32>> {
        self.slot.lock().play.take()
    }

    /// Take the work buffer for filling, clearing the dirty flag. `None` if
    /// it is still fresh (not swapped since the last fill) or already out.
    pub fn take_work(&self) -> Option<Vec<f32>> {
        let mut slot = self.slot.lock();
        if !slot.dirty || slot.closed {
            return None;
        }
        let work = slot.work.take()?;
        slot.dirty = false;
        Some(work)
    }

    /// Give a filled work buffer back.
    pub fn return_work(&self, buf: Vec<f32>) {
        {
            let mut slot = self.slot.lock();
            debug_assert!(slot.work.is_none(), "work buffer returned twice");
            slot.work = Some(buf);
        }
        self.returned.notify_one();
    }

    /// Exchange `play` with the work buffer. Returns the new play index, or
    /// `None` once [`close`](Self::close) has been called.
    pub fn swap(&self, play: &mut Vec<f32>) -> Option<usize> {
        let mut slot = self.slot.lock();
        loop {
            if slot.closed {
                return None;
            }
            if let Some(work) = slot.work.as_mut() {
                std::mem::swap(work, play);
                break;
            }
            // controller is mid-fill; waits at most one fill, never on I/O
            self.returned.wait(&mut slot);
        }
        slot.play_index ^= 1;
        slot.dirty = true;
        slot.swaps += 1;
        Some(slot.play_index)
    }

    /// Release a swap blocked waiting for the work buffer and make every
    /// later swap return `None`.
    pub fn close(&self) {
        self.slot.lock().closed = true;
        self.returned.notify_all();
    }

    pub fn play_index(&self) -> usize {
        self.slot.lock().play_index
    }

    pub fn is_dirty(&self) -> bool {
        self.slot.lock().dirty
    }

    /// Number of completed swaps.
    pub fn swaps(&self) -> u64 {
        self.slot.lock().swaps
    }

    /// Best-effort copy of the work buffer for visualizers. Returns `false`
    /// (leaving `out` untouched) while the buffer is out being filled.
    pub fn copy_work(&self, out: &mut Vec<f32>) -> bool {
        let slot = self.slot.lock();
        match slot.work.as_deref() {
            Some(work) => {
                out.clear();
                out.extend_from_slice(work);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_alternate_strictly() {
        let db = DoubleBuffer::new(8);
        let mut play = db.claim_play().unwrap();
        assert!(db.claim_play().is_none());
        assert_eq!(db.play_index(), 0);

        let first = play.as_ptr();
        let mut seen = vec![first];
        for n in 1..=101_u64 {
            let idx = db.swap(&mut play).unwrap();
            assert_eq!(idx as u64, n % 2);
            assert_eq!(db.play_index() as u64, n % 2);
            seen.push(play.as_ptr());
        }
        assert_eq!(db.swaps(), 101);
        for pair in seen.windows(2) {
            assert_ne!(pair[0], pair[1], "same allocation played twice in a row");
        }
        for (i, p) in seen.iter().enumerate() {
            assert_eq!(*p == first, i % 2 == 0);
        }
    }

    #[test]
    fn work_is_only_handed_out_when_dirty() {
        let db = DoubleBuffer::new(4);
        let mut play = db.claim_play().unwrap();
        assert!(db.is_dirty());

        let mut work = db.take_work().unwrap();
        assert!(!db.is_dirty());
        work.fill(0.5);
        db.return_work(work);
        assert!(db.take_work().is_none(), "fresh buffer must not be refilled");

        db.swap(&mut play).unwrap();
        assert_eq!(play, vec![0.5; 4]);
        assert!(db.is_dirty());
        assert!(db.take_work().is_some());
    }

    #[test]
    fn visualizer_copy_sees_work_buffer() {
        let db = DoubleBuffer::new(3);
        let mut out = vec![9.0];
        let mut work = db.take_work().unwrap();
        assert!(!db.copy_work(&mut out), "out being filled");
        assert_eq!(out, vec![9.0]);
        work.copy_from_slice(&[0.1, 0.2, 0.3]);
        db.return_work(work);
        assert!(db.copy_work(&mut out));
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn close_releases_a_blocked_swap() {
        use std::sync::Arc;

        let db = Arc::new(DoubleBuffer::new(4));
        let mut play = db.claim_play().unwrap();
        let _held = db.take_work().unwrap();
        let waiter = {
            let db = Arc::clone(&db);
            std::thread::spawn(move || db.swap(&mut play))
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        db.close();
        assert_eq!(waiter.join().unwrap(), None);
        assert!(db.take_work().is_none());
    }
}
