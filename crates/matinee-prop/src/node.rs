//! The property tree: ordered, named, observable nodes.
//!
//! A [`Prop`] is a cheap-to-clone handle onto one node of a shared tree.
//! Nodes hold either a scalar [`PropValue`] or an ordered list of children,
//! and every mutation is observable through subscriptions registered on the
//! mutated node (see [`crate::subscription`]).
//!
//! # Design
//!
//! Handles are `Rc<RefCell<..>>`; children are owned by their parent and
//! point back through a `Weak` link, so subtrees are freed as soon as the
//! last external handle goes away. Mutators enqueue events onto a
//! thread-local dispatch queue and then flush it. Only the outermost
//! mutating call actually drains the queue, which keeps subscriber
//! callbacks from ever nesting inside each other even when a callback
//! mutates the tree again.
//!
//! # Invariants
//!
//! 1. A node is a scalar, a directory, or a zombie. Creating a child of a
//!    scalar node silently promotes it to a directory and drops the scalar.
//! 2. Zombie is terminal. Writes to a zombie fail with
//!    [`PropError::DeadNode`]; reads return empty defaults so render paths
//!    need no special casing.
//! 3. Children keep insertion order. [`Prop::child`] returns the first
//!    child with a matching name and never reorders.
//! 4. For one node, events are delivered in mutation order, and each event
//!    reaches every subscriber before the next event is delivered.
//! 5. Destruction runs leaf-up: descendants report `Destroyed` before
//!    their ancestors do. `ChildRemoved` fires only for the top of the
//!    destroyed subtree, toward its surviving parent; subscribers inside
//!    the subtree see no per-child removals, just their own `Destroyed`.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Write to a destroyed node | `Err(PropError::DeadNode)` |
//! | Subscriber callback fails, node alive | First failure returned from the outermost mutator, rest logged |
//! | Subscriber callback fails, node destroyed | Suppressed with a debug log |
//! | Reorder with a non-sibling anchor | Ignored with a warning |
//! | Attach that would create a cycle | Ignored with a warning |

use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::error::{CallbackResult, PropError, PropResult};
use crate::event::{ExtEvent, PropEvent};
use crate::kind::NodeKind;
use crate::subscription::{dispatch, SubOpts, SubRef, SubState, SubscriptionHandle};
use crate::value::PropValue;

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier of a node, unique for the lifetime of the process.
///
/// Ids survive destruction, so diagnostics can name a node after its
/// handle went dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn test(raw: u64) -> Self {
        NodeId(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Node storage
// ---------------------------------------------------------------------------

pub(crate) enum Payload {
    Value(PropValue),
    Directory(Vec<Prop>),
    Zombie,
}

pub(crate) struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: Option<Rc<str>>,
    pub(crate) parent: Weak<RefCell<Node>>,
    pub(crate) kind: NodeKind,
    pub(crate) payload: Payload,
    pub(crate) subs: SmallVec<[SubRef; 2]>,
    pub(crate) selected: Option<Weak<RefCell<Node>>>,
}

impl Node {
    pub(crate) fn is_zombie(&self) -> bool {
        matches!(self.payload, Payload::Zombie)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle onto one node of the property tree.
///
/// Clones are shallow: they refer to the same node, and [`PartialEq`]
/// compares node identity rather than contents.
#[derive(Clone)]
pub struct Prop {
    pub(crate) inner: Rc<RefCell<Node>>,
}

impl PartialEq for Prop {
    fn eq(&self, other: &Prop) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Prop {}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(n) => {
                let state = match &n.payload {
                    Payload::Value(v) => v.type_name(),
                    Payload::Directory(_) => "directory",
                    Payload::Zombie => "zombie",
                };
                f.debug_struct("Prop")
                    .field("id", &n.id.get())
                    .field("name", &n.name.as_deref().unwrap_or("<anon>"))
                    .field("state", &state)
                    .finish()
            }
            Err(_) => f.write_str("Prop(<borrowed>)"),
        }
    }
}

/// One-line summary in the same shape [`Prop::format_tree`] prints.
impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(n) => {
                let name = n.name.as_deref().unwrap_or("<anon>");
                match &n.payload {
                    Payload::Zombie => write!(f, "{name}#{} (zombie)", n.id),
                    Payload::Value(v) => write!(f, "{name}#{} [{}] = {v}", n.id, n.kind),
                    Payload::Directory(c) => {
                        write!(f, "{name}#{} [{}] ({} children)", n.id, n.kind, c.len())
                    }
                }
            }
            Err(_) => f.write_str("<borrowed>"),
        }
    }
}

impl Prop {
    fn with_parent(name: Option<&str>, parent: Weak<RefCell<Node>>) -> Prop {
        Prop {
            inner: Rc::new(RefCell::new(Node {
                id: NodeId::next(),
                name: name.map(Rc::from),
                parent,
                kind: NodeKind::Item,
                payload: Payload::Value(PropValue::Void),
                subs: SmallVec::new(),
                selected: None,
            })),
        }
    }

    /// Creates a detached, anonymous root node.
    #[must_use]
    pub fn root() -> Prop {
        Prop::with_parent(None, Weak::new())
    }

    /// Creates a detached root with a name.
    #[must_use]
    pub fn named_root(name: impl AsRef<str>) -> Prop {
        Prop::with_parent(Some(name.as_ref()), Weak::new())
    }

    // -- identity and introspection -------------------------------------

    /// Stable id of the underlying node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.borrow().id
    }

    /// Name of this node within its parent, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.inner.borrow().name.as_deref().map(str::to_owned)
    }

    /// True when both handles refer to the same node.
    #[must_use]
    pub fn is_same(&self, other: &Prop) -> bool {
        self == other
    }

    /// True once the node has been destroyed.
    #[must_use]
    pub fn is_zombie(&self) -> bool {
        self.inner.borrow().is_zombie()
    }

    /// True when the node holds ordered children.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.inner.borrow().payload, Payload::Directory(_))
    }

    /// True when the node holds a scalar value (possibly void).
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self.inner.borrow().payload, Payload::Value(_))
    }

    /// Parent node, unless this is a detached root.
    #[must_use]
    pub fn parent(&self) -> Option<Prop> {
        self.inner.borrow().parent.upgrade().map(|inner| Prop { inner })
    }

    /// Presentation kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.inner.borrow().kind.clone()
    }

    /// Sets the presentation kind.
    ///
    /// Kind changes are not delivered as events; set the kind before the
    /// node becomes reachable from a subscribed container.
    pub fn set_kind(&self, kind: NodeKind) -> PropResult<()> {
        let mut n = self.inner.borrow_mut();
        if n.is_zombie() {
            return Err(PropError::DeadNode { node: n.id, op: "set_kind" });
        }
        n.kind = kind;
        Ok(())
    }

    fn dead(&self, op: &'static str) -> PropError {
        PropError::DeadNode { node: self.id(), op }
    }

    fn is_named(&self, name: &str) -> bool {
        self.inner.borrow().name.as_deref() == Some(name)
    }

    fn has_ancestor(&self, other: &Prop) -> bool {
        let mut cur = self.parent();
        while let Some(p) = cur {
            if p.is_same(other) {
                return true;
            }
            cur = p.parent();
        }
        false
    }

    pub(crate) fn subs_snapshot(&self) -> Vec<SubRef> {
        self.inner.borrow().subs.iter().cloned().collect()
    }

    // -- children -------------------------------------------------------

    /// Returns the child with the given name, creating it when absent.
    ///
    /// Creating the first child of a scalar node promotes the node to a
    /// directory; the scalar value is dropped without an event, the new
    /// child is announced with `ChildAdded`.
    pub fn child(&self, name: impl AsRef<str>) -> PropResult<Prop> {
        let name = name.as_ref();
        let child = {
            let mut n = self.inner.borrow_mut();
            if n.is_zombie() {
                return Err(PropError::DeadNode { node: n.id, op: "child" });
            }
            if let Payload::Directory(children) = &n.payload {
                if let Some(existing) = children.iter().find(|c| c.is_named(name)) {
                    return Ok(existing.clone());
                }
            }
            let child = Prop::with_parent(Some(name), Rc::downgrade(&self.inner));
            match &mut n.payload {
                Payload::Directory(children) => children.push(child.clone()),
                payload => *payload = Payload::Directory(vec![child.clone()]),
            }
            child
        };
        let subs = self.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::ChildAdded(child.clone()));
        dispatch::flush()?;
        Ok(child)
    }

    /// Returns the named child without creating it.
    #[must_use]
    pub fn existing_child(&self, name: &str) -> Option<Prop> {
        match &self.inner.borrow().payload {
            Payload::Directory(children) => children.iter().find(|c| c.is_named(name)).cloned(),
            _ => None,
        }
    }

    /// True when a child with this name exists.
    #[must_use]
    pub fn has_child(&self, name: &str) -> bool {
        self.existing_child(name).is_some()
    }

    /// Child at a position in insertion order.
    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<Prop> {
        match &self.inner.borrow().payload {
            Payload::Directory(children) => children.get(index).cloned(),
            _ => None,
        }
    }

    /// Snapshot of all children in order. Empty for scalars and zombies.
    #[must_use]
    pub fn children(&self) -> Vec<Prop> {
        match &self.inner.borrow().payload {
            Payload::Directory(children) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Number of children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        match &self.inner.borrow().payload {
            Payload::Directory(children) => children.len(),
            _ => 0,
        }
    }

    /// Names of all named children in order.
    #[must_use]
    pub fn child_names(&self) -> Vec<String> {
        self.children().iter().filter_map(Prop::name).collect()
    }

    /// Walks a dot-separated path, creating nodes along the way.
    pub fn descend(&self, path: &str) -> PropResult<Prop> {
        let mut cur = self.clone();
        for seg in path.split('.').filter(|s| !s.is_empty()) {
            cur = cur.child(seg)?;
        }
        Ok(cur)
    }

    // -- values ---------------------------------------------------------

    /// Current scalar value. Directories and zombies read as `Void`.
    #[must_use]
    pub fn value(&self) -> PropValue {
        match &self.inner.borrow().payload {
            Payload::Value(v) => v.clone(),
            _ => PropValue::Void,
        }
    }

    /// Sets the scalar value and notifies subscribers.
    ///
    /// Writing a value equal to the current one is a no-op and delivers
    /// nothing. Writing a scalar over a directory destroys the children
    /// first, with the full removal cascade.
    pub fn set_value(&self, value: impl Into<PropValue>) -> PropResult<()> {
        let value = value.into();
        let doomed = {
            let mut n = self.inner.borrow_mut();
            match &mut n.payload {
                Payload::Zombie => {
                    return Err(PropError::DeadNode { node: n.id, op: "set_value" });
                }
                Payload::Value(cur) => {
                    if *cur == value {
                        return Ok(());
                    }
                    *cur = value.clone();
                    Vec::new()
                }
                Payload::Directory(children) => {
                    let doomed = std::mem::take(children);
                    n.payload = Payload::Value(value.clone());
                    doomed
                }
            }
        };
        for child in &doomed {
            destroy_subtree(&child.inner);
        }
        let subs = self.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::ValueChanged(value));
        dispatch::flush()
    }

    /// Sets the value of a named child, creating it when absent.
    pub fn set(&self, name: &str, value: impl Into<PropValue>) -> PropResult<()> {
        self.child(name)?.set_value(value)
    }

    /// Reads the value of a named child. Missing children read as `Void`.
    #[must_use]
    pub fn get(&self, name: &str) -> PropValue {
        self.existing_child(name).map_or(PropValue::Void, |c| c.value())
    }

    /// Adds a delta to the numeric value of this node.
    ///
    /// Non-numeric current values coerce through their integer reading;
    /// a directory coerces to zero and becomes a scalar.
    pub fn add_number(&self, delta: f64) -> PropResult<()> {
        let current = {
            let n = self.inner.borrow();
            match &n.payload {
                Payload::Zombie => {
                    return Err(PropError::DeadNode { node: n.id, op: "add_number" });
                }
                Payload::Value(v) => v.coerce_float(),
                Payload::Directory(_) => 0.0,
            }
        };
        self.set_value(PropValue::from_number(current + delta))
    }

    /// Flips the boolean reading of the value and stores it as `Bool`.
    pub fn toggle(&self) -> PropResult<()> {
        let current = {
            let n = self.inner.borrow();
            match &n.payload {
                Payload::Zombie => {
                    return Err(PropError::DeadNode { node: n.id, op: "toggle" });
                }
                Payload::Value(v) => v.truthy(),
                Payload::Directory(_) => false,
            }
        };
        self.set_value(PropValue::Bool(!current))
    }

    // -- structure ------------------------------------------------------

    /// Re-parents this node, appending it to the new parent's children.
    pub fn set_parent(&self, parent: &Prop) -> PropResult<()> {
        self.set_parent_before(parent, None)
    }

    /// Re-parents this node, inserting it before `before` when given.
    ///
    /// An anchor that is not a child of `parent` falls back to appending.
    /// Attaching a node under one of its own descendants is refused.
    pub fn set_parent_before(&self, parent: &Prop, before: Option<&Prop>) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("set_parent"));
        }
        if parent.is_zombie() {
            return Err(parent.dead("set_parent"));
        }
        if self.is_same(parent) || parent.has_ancestor(self) {
            warn!(node = %self.id(), parent = %parent.id(), "set_parent would create a cycle; ignored");
            return Ok(());
        }
        if self.parent().is_some_and(|p| p.is_same(parent)) {
            return self.move_before(before);
        }
        self.detach_from_parent();
        {
            let mut p = parent.inner.borrow_mut();
            if let Payload::Value(_) = p.payload {
                p.payload = Payload::Directory(Vec::new());
            }
            if let Payload::Directory(children) = &mut p.payload {
                let at = before
                    .and_then(|b| children.iter().position(|c| c.is_same(b)))
                    .unwrap_or(children.len());
                children.insert(at, self.clone());
            }
        }
        self.inner.borrow_mut().parent = Rc::downgrade(&parent.inner);
        let subs = parent.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::ChildAdded(self.clone()));
        dispatch::flush()
    }

    /// Detaches this node from its parent without destroying it.
    ///
    /// The subtree stays alive and can be re-attached later; the old
    /// parent's subscribers see `ChildRemoved`.
    pub fn unparent(&self) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("unparent"));
        }
        self.detach_from_parent();
        dispatch::flush()
    }

    fn detach_from_parent(&self) {
        let Some(parent_rc) = self.inner.borrow().parent.upgrade() else {
            return;
        };
        let parent_subs = {
            let mut p = parent_rc.borrow_mut();
            if let Payload::Directory(children) = &mut p.payload {
                children.retain(|c| !c.is_same(self));
            }
            p.subs.iter().cloned().collect::<Vec<_>>()
        };
        self.inner.borrow_mut().parent = Weak::new();
        dispatch::enqueue(&parent_subs, PropEvent::ChildRemoved(self.clone()));
    }

    /// Moves this node before a sibling, or to the end when `None`.
    ///
    /// A no-op when the node already sits in the requested position.
    pub fn move_before(&self, before: Option<&Prop>) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("move_before"));
        }
        let Some(parent) = self.parent() else {
            warn!(node = %self.id(), "move_before on a node without a parent; ignored");
            return Ok(());
        };
        if let Some(b) = before {
            if b.is_same(self) {
                return Ok(());
            }
            if !b.parent().is_some_and(|p| p.is_same(&parent)) {
                warn!(node = %self.id(), "move_before anchor is not a sibling; ignored");
                return Ok(());
            }
        }
        let moved = {
            let mut p = parent.inner.borrow_mut();
            let Payload::Directory(children) = &mut p.payload else {
                return Ok(());
            };
            let Some(from) = children.iter().position(|c| c.is_same(self)) else {
                return Ok(());
            };
            children.remove(from);
            let to = before
                .and_then(|b| children.iter().position(|c| c.is_same(b)))
                .unwrap_or(children.len());
            children.insert(to, self.clone());
            to != from
        };
        if !moved {
            return Ok(());
        }
        let subs = parent.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::ChildMoved(self.clone(), before.cloned()));
        dispatch::flush()
    }

    // -- destruction ----------------------------------------------------

    /// Destroys this node and its whole subtree.
    ///
    /// Every subscription on every destroyed node receives `Destroyed` as
    /// its final event; the surviving parent sees one `ChildRemoved` for
    /// the subtree root. Destroying a zombie is a no-op.
    pub fn destroy(&self) -> PropResult<()> {
        if self.is_zombie() {
            return Ok(());
        }
        destroy_subtree(&self.inner);
        dispatch::flush()
    }

    /// Destroys all children, keeping this node alive as an empty
    /// directory. A no-op on scalars and zombies.
    pub fn delete_children(&self) -> PropResult<()> {
        let doomed = {
            let mut n = self.inner.borrow_mut();
            match &mut n.payload {
                Payload::Directory(children) => std::mem::take(children),
                _ => return Ok(()),
            }
        };
        for child in &doomed {
            destroy_subtree(&child.inner);
        }
        dispatch::flush()
    }

    /// Destroys the named child if it exists.
    pub fn delete_child(&self, name: &str) -> PropResult<()> {
        match self.existing_child(name) {
            Some(child) => child.destroy(),
            None => Ok(()),
        }
    }

    // -- selection ------------------------------------------------------

    /// Marks this node as the selected child of its parent.
    pub fn select(&self) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("select"));
        }
        let Some(parent) = self.parent() else {
            warn!(node = %self.id(), "select on a node without a parent; ignored");
            return Ok(());
        };
        parent.inner.borrow_mut().selected = Some(Rc::downgrade(&self.inner));
        let subs = parent.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::SelectChild(self.clone()));
        dispatch::flush()
    }

    /// Currently selected child, if it is still one of our children.
    #[must_use]
    pub fn selected_child(&self) -> Option<Prop> {
        let n = self.inner.borrow();
        let sel = n.selected.as_ref()?.upgrade()?;
        let sel = Prop { inner: sel };
        match &n.payload {
            Payload::Directory(children) if children.iter().any(|c| c.is_same(&sel)) => Some(sel),
            _ => None,
        }
    }

    // -- consumer-to-producer signals -----------------------------------

    /// Tells the producer that consumers displayed everything and want
    /// more children appended.
    pub fn want_more_children(&self) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("want_more_children"));
        }
        let subs = self.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::WantMoreChildren);
        dispatch::flush()
    }

    /// Asks the producer that owns this container to move `child` before
    /// `before`. The tree is not reordered; the producer decides.
    pub fn request_move(&self, child: &Prop, before: Option<&Prop>) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("request_move"));
        }
        let is_mine = |c: &Prop| c.parent().is_some_and(|p| p.is_same(self));
        if !is_mine(child) {
            warn!(node = %self.id(), "request_move for a non-child; ignored");
            return Ok(());
        }
        if let Some(b) = before {
            if b.is_same(child) || !is_mine(b) {
                warn!(node = %self.id(), "request_move anchor is not a sibling; ignored");
                return Ok(());
            }
        }
        let subs = self.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::RequestMove(child.clone(), before.cloned()));
        dispatch::flush()
    }

    /// Injects an out-of-band event for this node's subscribers.
    pub fn deliver_event(&self, event: ExtEvent) -> PropResult<()> {
        if self.is_zombie() {
            return Err(self.dead("deliver_event"));
        }
        let subs = self.subs_snapshot();
        dispatch::enqueue(&subs, PropEvent::External(event));
        dispatch::flush()
    }

    // -- subscriptions --------------------------------------------------

    /// Registers a callback for changes of this node.
    ///
    /// Unless [`SubOpts::NO_INITIAL_UPDATE`] is set, the current state is
    /// replayed synchronously: the scalar value as one `ValueChanged`
    /// (suppressed for void values under [`SubOpts::IGNORE_VOID`]), or one
    /// `ChildAdded` per existing child in order, followed by the current
    /// selection. Errors from replay callbacks are logged, not returned.
    ///
    /// The returned handle detaches the subscription on drop unless
    /// [`SubOpts::AUTO_DESTROY`] is set, in which case the subscription
    /// lives until the node dies.
    pub fn subscribe(
        &self,
        opts: SubOpts,
        callback: impl Fn(&PropEvent) -> CallbackResult + 'static,
    ) -> PropResult<SubscriptionHandle> {
        let sub = {
            let mut n = self.inner.borrow_mut();
            if n.is_zombie() {
                return Err(PropError::DeadNode { node: n.id, op: "subscribe" });
            }
            let sub = SubState::register(n.id, opts, Rc::downgrade(&self.inner), callback);
            n.subs.push(Rc::clone(&sub));
            sub
        };
        if !opts.contains(SubOpts::NO_INITIAL_UPDATE) {
            self.replay_initial(&sub);
            if let Err(err) = dispatch::flush() {
                debug!(node = %self.id(), error = %err, "callback failed during initial replay");
            }
        }
        Ok(SubscriptionHandle::new(sub))
    }

    fn replay_initial(&self, sub: &SubRef) {
        let (value, children) = {
            let n = self.inner.borrow();
            match &n.payload {
                Payload::Value(v) => (Some(v.clone()), None),
                Payload::Directory(c) => (None, Some(c.clone())),
                Payload::Zombie => (None, None),
            }
        };
        if let Some(v) = value {
            if v.is_void() && sub.opts().contains(SubOpts::IGNORE_VOID) {
                return;
            }
            dispatch::enqueue_one(sub, PropEvent::ValueChanged(v));
        } else if let Some(children) = children {
            for child in children {
                dispatch::enqueue_one(sub, PropEvent::ChildAdded(child));
            }
            if let Some(sel) = self.selected_child() {
                dispatch::enqueue_one(sub, PropEvent::SelectChild(sel));
            }
        }
    }

    /// Number of live subscriptions on this node.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().subs.len()
    }

    // -- debugging ------------------------------------------------------

    /// Renders the subtree as an indented listing, one node per line.
    #[must_use]
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        format_node(&self.inner, 0, &mut out);
        out
    }
}

fn format_node(rc: &Rc<RefCell<Node>>, depth: usize, out: &mut String) {
    let prop = Prop { inner: Rc::clone(rc) };
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}{prop}");
    for child in prop.children() {
        format_node(&child.inner, depth + 1, out);
    }
}

/// Zombifies a subtree depth-first and enqueues the removal cascade.
///
/// Only the top of the destroyed subtree announces `ChildRemoved` to its
/// surviving parent; nodes inside the subtree go down silently apart from
/// their own `Destroyed`. Callers flush the dispatch queue afterwards.
pub(crate) fn destroy_subtree(rc: &Rc<RefCell<Node>>) {
    destroy_inner(rc, true);
}

fn destroy_inner(rc: &Rc<RefCell<Node>>, notify_parent: bool) {
    let children = {
        let mut n = rc.borrow_mut();
        if n.is_zombie() {
            return;
        }
        match &mut n.payload {
            Payload::Directory(c) => std::mem::take(c),
            _ => Vec::new(),
        }
    };
    for child in &children {
        destroy_inner(&child.inner, false);
    }
    let (subs, parent) = {
        let mut n = rc.borrow_mut();
        n.payload = Payload::Zombie;
        n.selected = None;
        (n.subs.iter().cloned().collect::<Vec<_>>(), n.parent.upgrade())
    };
    dispatch::enqueue(&subs, PropEvent::Destroyed);
    if let Some(parent_rc) = parent {
        let parent_subs = {
            let mut p = parent_rc.borrow_mut();
            if let Payload::Directory(siblings) = &mut p.payload {
                siblings.retain(|c| !Rc::ptr_eq(&c.inner, rc));
            }
            p.subs.iter().cloned().collect::<Vec<_>>()
        };
        rc.borrow_mut().parent = Weak::new();
        if notify_parent {
            dispatch::enqueue(&parent_subs, PropEvent::ChildRemoved(Prop { inner: Rc::clone(rc) }));
        }
    }
}
