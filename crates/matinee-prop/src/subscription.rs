//! Subscription registry and event dispatch.
//!
//! Each node carries its own list of subscriptions. Mutators snapshot that
//! list, enqueue one pending delivery per subscriber onto a thread-local
//! queue, and flush. The flush is re-entrancy aware: while a drain is in
//! progress, nested flushes return immediately and leave their events for
//! the drain already running.
//!
//! # Invariants
//!
//! 1. Callbacks never nest. Exactly one drain loop runs at a time, and it
//!    invokes callbacks with no `RefCell` borrows held, so callbacks may
//!    freely mutate the tree, subscribe, or unsubscribe.
//! 2. `Destroyed` is the last event a subscription observes, and at the
//!    moment it is delivered the subscription is still registered on its
//!    (now zombie) node. Delivery detaches it.
//! 3. A detached subscription never fires again, even for deliveries that
//!    were already queued.
//!
//! # Failure Modes
//!
//! Callback errors follow one policy, applied per delivery:
//!
//! | Node state after the callback | Effect |
//! |-------------------------------|--------|
//! | Destroyed (already dead at dispatch) | Suppressed, debug log |
//! | Destroyed (died during the callback) | Suppressed, debug log |
//! | Alive | Wrapped in [`PropError::Callback`]; the first such error is returned from the outermost mutating call, later ones are logged |

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::error::{CallbackResult, PropError, PropResult};
use crate::event::PropEvent;
use crate::node::{Node, NodeId};

bitflags::bitflags! {
    /// Behavior flags for [`Prop::subscribe`](crate::Prop::subscribe).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SubOpts: u8 {
        /// Keep the subscription alive until the node is destroyed, even
        /// after the [`SubscriptionHandle`] is dropped. The callback is
        /// released when the node dies.
        const AUTO_DESTROY = 1 << 0;
        /// Do not deliver void values; used by consumers that only care
        /// about real data.
        const IGNORE_VOID = 1 << 1;
        /// Skip the synchronous replay of the current state at subscribe
        /// time.
        const NO_INITIAL_UPDATE = 1 << 2;
        /// Log every delivery to this subscription.
        const DEBUG = 1 << 3;
    }
}

// ---------------------------------------------------------------------------
// Subscription state
// ---------------------------------------------------------------------------

static NEXT_SUB_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a subscription, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubId(u64);

impl SubId {
    fn next() -> Self {
        SubId(NEXT_SUB_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

type SubCallback = dyn Fn(&PropEvent) -> CallbackResult;

pub(crate) struct SubState {
    id: SubId,
    node_id: NodeId,
    opts: SubOpts,
    node: Weak<RefCell<Node>>,
    callback: RefCell<Option<Rc<SubCallback>>>,
    detached: Cell<bool>,
}

pub(crate) type SubRef = Rc<SubState>;

impl SubState {
    pub(crate) fn register(
        node_id: NodeId,
        opts: SubOpts,
        node: Weak<RefCell<Node>>,
        callback: impl Fn(&PropEvent) -> CallbackResult + 'static,
    ) -> SubRef {
        Rc::new(SubState {
            id: SubId::next(),
            node_id,
            opts,
            node,
            callback: RefCell::new(Some(Rc::new(callback))),
            detached: Cell::new(false),
        })
    }

    pub(crate) fn opts(&self) -> SubOpts {
        self.opts
    }
}

/// Removes a subscription from its node and drops the callback.
/// Idempotent; pending queue entries for it are skipped at delivery.
fn detach_sub(sub: &SubRef) {
    if sub.detached.replace(true) {
        return;
    }
    sub.callback.borrow_mut().take();
    if let Some(rc) = sub.node.upgrade() {
        rc.borrow_mut().subs.retain(|s| !Rc::ptr_eq(s, sub));
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner side of a subscription.
///
/// Dropping the handle detaches the subscription unless
/// [`SubOpts::AUTO_DESTROY`] was set, in which case the subscription stays
/// with the node for the node's lifetime.
#[must_use = "dropping the handle detaches the subscription unless AUTO_DESTROY is set"]
pub struct SubscriptionHandle {
    sub: SubRef,
}

impl SubscriptionHandle {
    pub(crate) fn new(sub: SubRef) -> Self {
        SubscriptionHandle { sub }
    }

    /// Identifier of this subscription.
    #[must_use]
    pub fn id(&self) -> SubId {
        self.sub.id
    }

    /// Flags the subscription was registered with.
    #[must_use]
    pub fn opts(&self) -> SubOpts {
        self.sub.opts
    }

    /// True while the subscription is still registered on its node.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.sub.detached.get()
    }

    /// Explicitly detaches the subscription, regardless of flags.
    pub fn unsubscribe(self) {
        detach_sub(&self.sub);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if !self.sub.opts.contains(SubOpts::AUTO_DESTROY) {
            detach_sub(&self.sub);
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.sub.id.get())
            .field("node", &self.sub.node_id.get())
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Dispatch queue
// ---------------------------------------------------------------------------

pub(crate) mod dispatch {
    use super::*;

    #[derive(Default)]
    struct Queue {
        pending: RefCell<VecDeque<Pending>>,
        draining: Cell<bool>,
    }

    struct Pending {
        sub: SubRef,
        event: PropEvent,
    }

    thread_local! {
        static QUEUE: Queue = Queue::default();
    }

    /// Queues one delivery of `event` per subscriber.
    pub(crate) fn enqueue(subs: &[SubRef], event: PropEvent) {
        if subs.is_empty() {
            return;
        }
        QUEUE.with(|q| {
            let mut pending = q.pending.borrow_mut();
            for sub in subs {
                if sub.detached.get() {
                    continue;
                }
                pending.push_back(Pending { sub: Rc::clone(sub), event: event.clone() });
            }
        });
    }

    /// Queues one delivery for a single subscriber; used for the replay
    /// at subscribe time.
    pub(crate) fn enqueue_one(sub: &SubRef, event: PropEvent) {
        if sub.detached.get() {
            return;
        }
        QUEUE.with(|q| q.pending.borrow_mut().push_back(Pending { sub: Rc::clone(sub), event }));
    }

    struct DrainGuard<'a>(&'a Cell<bool>);

    impl Drop for DrainGuard<'_> {
        fn drop(&mut self) {
            self.0.set(false);
        }
    }

    /// Drains the queue unless a drain is already running further up the
    /// stack; in that case the running drain picks the new entries up.
    pub(crate) fn flush() -> PropResult<()> {
        QUEUE.with(|q| {
            if q.draining.get() {
                return Ok(());
            }
            q.draining.set(true);
            let _guard = DrainGuard(&q.draining);
            drain(q)
        })
    }

    fn drain(q: &Queue) -> PropResult<()> {
        let mut first_err: Option<PropError> = None;
        loop {
            let next = q.pending.borrow_mut().pop_front();
            let Some(Pending { sub, event }) = next else {
                break;
            };
            let finalize = matches!(event, PropEvent::Destroyed);
            if sub.detached.get() {
                continue;
            }
            let callback = sub.callback.borrow().clone();
            let Some(callback) = callback else {
                if finalize {
                    detach_sub(&sub);
                }
                continue;
            };
            let dead_before = sub.node.upgrade().map_or(true, |rc| rc.borrow().is_zombie());
            if sub.opts.contains(SubOpts::DEBUG) {
                trace!(
                    sub = sub.id.get(),
                    node = %sub.node_id,
                    event = event.kind_name(),
                    "delivering event"
                );
            }
            // No borrows are held here: the callback may mutate the tree.
            let outcome = callback(&event);
            if let Err(cb_err) = outcome {
                let dead_after = sub.node.upgrade().map_or(true, |rc| rc.borrow().is_zombie());
                if dead_after && dead_before {
                    debug!(
                        node = %sub.node_id,
                        event = event.kind_name(),
                        error = %cb_err,
                        "callback failed on a node that was dead before dispatch; suppressed"
                    );
                } else if dead_after {
                    debug!(
                        node = %sub.node_id,
                        event = event.kind_name(),
                        error = %cb_err,
                        "node destroyed during callback; error suppressed"
                    );
                } else if first_err.is_none() {
                    first_err = Some(PropError::Callback {
                        event: event.kind_name(),
                        node: sub.node_id,
                        message: cb_err.message().to_owned(),
                    });
                } else {
                    warn!(
                        node = %sub.node_id,
                        event = event.kind_name(),
                        error = %cb_err,
                        "subsequent callback failure; only the first is returned"
                    );
                }
            }
            if finalize {
                detach_sub(&sub);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
