//! Cycle detection for traversals of shared payloads
//!
//! Arrays cannot contain themselves, but a reference cell or an object can
//! reach itself through its own content. Traversals that walk into those
//! payloads (serialization, `Debug`) mark them while inside and stop when
//! they meet a marked one again.

use std::cell::RefCell;

thread_local! {
    static VISITING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks one payload as being traversed until dropped
pub(crate) struct Visit(usize);

impl Visit {
    /// `None` when `addr` is already being traversed further up
    pub(crate) fn enter(addr: usize) -> Option<Visit> {
        VISITING.with(|visiting| {
            let mut visiting = visiting.borrow_mut();
            if visiting.contains(&addr) {
                return None;
            }
            visiting.push(addr);
            Some(Visit(addr))
        })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        VISITING.with(|visiting| {
            let mut visiting = visiting.borrow_mut();
            if let Some(pos) = visiting.iter().rposition(|addr| *addr == self.0) {
                visiting.remove(pos);
            }
        });
    }
}
