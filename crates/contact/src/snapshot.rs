//! Cached member state with lock-free reads and serialised writes.

use arc_swap::ArcSwap;
use groupwire_core::error::{Error, Result};
use groupwire_core::transport::GroupMemberInfo;
use std::cell::Cell;
use std::sync::{Arc, Mutex};

thread_local! {
    /// Address of the snapshot whose card-change callback is running on this
    /// thread, 0 when none.
    static NOTIFYING: Cell<usize> = const { Cell::new(0) };
}

/// Marks a snapshot as notifying for the current thread; restores the outer
/// value on drop so nested notifications for other members unwind cleanly.
struct NotifyScope {
    outer: usize,
}

impl NotifyScope {
    fn enter(snapshot: &MemberSnapshot) -> Self {
        let outer = NOTIFYING.with(|cell| cell.replace(snapshot.address()));
        Self { outer }
    }
}

impl Drop for NotifyScope {
    fn drop(&mut self) {
        NOTIFYING.with(|cell| cell.set(self.outer));
    }
}

/// The locally cached raw record of one member.
///
/// Readers load the current `Arc` and never observe a half-written record.
/// Writers replace the whole record under a per-snapshot lock, so two updates
/// cannot interleave.
pub struct MemberSnapshot {
    current: ArcSwap<GroupMemberInfo>,
    writer: Mutex<()>,
}

impl MemberSnapshot {
    pub fn new(raw: GroupMemberInfo) -> Self {
        Self {
            current: ArcSwap::from_pointee(raw),
            writer: Mutex::new(()),
        }
    }

    /// The current record.
    pub fn load(&self) -> Arc<GroupMemberInfo> {
        self.current.load_full()
    }

    fn address(&self) -> usize {
        self as *const Self as usize
    }

    /// Replace the record with `incoming`.
    ///
    /// When the card differs from the previous record, `on_card_change` runs
    /// with `(previous, incoming)` before the swap, while readers still see the
    /// previous record. Returns whether the card changed.
    ///
    /// # Errors
    ///
    /// The callback runs under the writer lock. Calling `apply_update` on the
    /// same snapshot from inside it would deadlock, so that call fails with
    /// [`Error::InvalidArgument`] instead and the outer update proceeds.
    pub fn apply_update<F>(&self, incoming: GroupMemberInfo, on_card_change: F) -> Result<bool>
    where
        F: FnOnce(&GroupMemberInfo, &GroupMemberInfo),
    {
        if NOTIFYING.with(Cell::get) == self.address() {
            return Err(Error::InvalidArgument(format!(
                "member {} cannot be updated from its own card-change listener",
                incoming.user_id
            )));
        }

        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.current.load_full();
        let changed = previous.card != incoming.card;
        if changed {
            let _scope = NotifyScope::enter(self);
            on_card_change(&previous, &incoming);
        }
        self.current.store(Arc::new(incoming));
        Ok(changed)
    }

    /// Copy-modify-swap the current record.
    pub fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut GroupMemberInfo),
    {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = GroupMemberInfo::clone(&self.current.load());
        f(&mut next);
        self.current.store(Arc::new(next));
    }
}

impl std::fmt::Debug for MemberSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MemberSnapshot").field(&self.load()).finish()
    }
}
