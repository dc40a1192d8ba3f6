//! Deferred GPU work queue.
//!
//! Texture creation and release may only happen on the thread that drives
//! the frame callback. Lifecycle signals (load-started, device remount)
//! arrive outside it, so instead of touching GPU state they enqueue a
//! closure here; the frame callback drains the queue before any other
//! per-frame logic runs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Cloneable handle to a FIFO of deferred work items. Clones share the
/// same underlying queue.
#[derive(Clone, Default)]
pub struct DeferredGpuWorkQueue {
    items: Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>,
}

impl DeferredGpuWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, work: impl FnOnce() + 'static) {
        self.items.borrow_mut().push_back(Box::new(work));
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Run every queued item in FIFO order until the queue is empty,
    /// including items enqueued by earlier items during this drain.
    pub fn drain(&self) {
        loop {
            // The borrow must end before the item runs, since the item may
            // enqueue more work through a clone of this handle.
            let next = self.items.borrow_mut().pop_front();
            match next {
                Some(work) => work(),
                None => break,
            }
        }
    }
}
