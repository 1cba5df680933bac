//! Member lifecycle events and the broadcaster that delivers them.
//!
//! Events are raised synchronously by the adapter. Cancellation is a typed
//! result ([`BroadcastResult`]) that the raiser inspects, never a control-flow
//! signal thrown through the listeners.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::message::{MessageChain, MessageReceipt};

/// All events raised by member objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberEvent {
    /// A member's group card differs between two snapshots.
    CardChanged {
        group_id: i64,
        member_id: i64,
        old: String,
        new: String,
    },

    /// A temporary message is about to be sent. Cancellable.
    TempMessagePreSend {
        group_id: i64,
        target_id: i64,
        message: MessageChain,
    },

    /// A temporary message send attempt finished, successfully or not.
    TempMessagePostSend {
        group_id: i64,
        target_id: i64,
        message: MessageChain,
        error: Option<String>,
        receipt: Option<MessageReceipt>,
    },
}

impl MemberEvent {
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::TempMessagePreSend { .. })
    }

    pub fn group_id(&self) -> i64 {
        match self {
            Self::CardChanged { group_id, .. }
            | Self::TempMessagePreSend { group_id, .. }
            | Self::TempMessagePostSend { group_id, .. } => *group_id,
        }
    }
}

/// What a listener wants done with the event it just saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerAction {
    Continue,
    /// Veto the event. Ignored for events that are not cancellable.
    Cancel,
}

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    pub cancelled: bool,
}

/// Delivers events to zero or more observers.
pub trait EventBroadcaster: Send + Sync {
    fn broadcast(&self, event: MemberEvent) -> BroadcastResult;
}

/// A synchronous observer. Runs on the raising task, so it must not block.
///
/// # Re-entrancy
///
/// `CardChanged` is raised while the member's snapshot is being written.
/// Listeners can read the member, which still shows the previous record, but
/// updating that same member from `on_event` is refused with an error. Do such
/// follow-up work from an async subscriber instead.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &MemberEvent) -> ListenerAction;
}

impl<F> EventListener for F
where
    F: Fn(&MemberEvent) -> ListenerAction + Send + Sync,
{
    fn on_event(&self, event: &MemberEvent) -> ListenerAction {
        self(event)
    }
}

/// In-process event bus.
///
/// Registered [`EventListener`]s run synchronously, in registration order, and
/// may cancel cancellable events. Afterwards the event is fanned out over a
/// `tokio::sync::broadcast` channel for async subscribers, which can only
/// observe.
pub struct EventBus {
    sender: broadcast::Sender<Arc<MemberEvent>>,
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a synchronous listener.
    pub fn register(&self, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Subscribe to receive events asynchronously.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<MemberEvent>> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBroadcaster for EventBus {
    fn broadcast(&self, event: MemberEvent) -> BroadcastResult {
        // Snapshot the list so listeners can register others without deadlocking.
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut cancelled = false;
        for listener in &listeners {
            if listener.on_event(&event) == ListenerAction::Cancel {
                if event.is_cancellable() {
                    cancelled = true;
                } else {
                    debug!(event = ?event, "Ignoring cancel on a non-cancellable event");
                }
            }
        }

        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
        BroadcastResult { cancelled }
    }
}
