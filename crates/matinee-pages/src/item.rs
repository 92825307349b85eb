//! Items: the per-entry façade handed out by [`crate::Page::append_item`].
//!
//! An item owns one subtree under the page's node container plus the
//! page-side bookkeeping that the tree cannot express: its slot in the
//! page's item list, its action handlers and an optional bound metadata
//! resource.
//!
//! # Invariants
//!
//! 1. List order mirrors tree order. `move_before` and `destroy` update
//!    both in the same call; there is no deferred reconciliation.
//! 2. Action handlers run with no interior borrows held, so a handler may
//!    register further handlers or destroy the item it runs for.
//! 3. A bound metadata resource is released exactly once: on rebind, on
//!    explicit unbind, on item destroy or when the binding is dropped,
//!    whichever comes first.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use matinee_prop::{
    CallbackResult, ExtEvent, NodeKind, Prop, PropEvent, SubOpts, SubscriptionHandle,
};

use crate::error::PageResult;
use crate::meta::Metadata;

/// Handler for one named action event.
pub type EventHandler = Rc<dyn Fn(&str) -> CallbackResult>;

pub(crate) type HandlerMap = Rc<RefCell<HashMap<String, Vec<EventHandler>>>>;

/// Calls every handler registered for `action`.
///
/// The matching handlers are cloned out before any of them runs, so a
/// handler may mutate the map. Every handler is invoked; the first error
/// wins the return value.
pub(crate) fn dispatch_actions(handlers: &HandlerMap, action: &str) -> CallbackResult {
    let matched: Vec<EventHandler> = handlers
        .borrow()
        .get(action)
        .map(|v| v.to_vec())
        .unwrap_or_default();
    let mut first_err = Ok(());
    for handler in matched {
        let res = handler(action);
        if res.is_err() && first_err.is_ok() {
            first_err = res;
        }
    }
    first_err
}

// ---------------------------------------------------------------------------
// Metadata binding
// ---------------------------------------------------------------------------

/// External metadata resource attached to an item.
///
/// Wraps the release action of whatever the embedder bound (an artwork
/// scraper lease, a metadata lookup, ...). Releasing twice is a no-op.
pub struct MetadataBinding {
    release: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl MetadataBinding {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: RefCell::new(Some(Box::new(release))),
        }
    }

    /// Runs the release action if it has not run yet.
    pub fn release(&self) {
        if let Some(f) = self.release.borrow_mut().take() {
            f();
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.borrow().is_none()
    }
}

impl Drop for MetadataBinding {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for MetadataBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataBinding")
            .field("released", &self.is_released())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

pub(crate) struct ItemInner {
    root: Prop,
    /// Back-reference to the owning page's item list.
    list: Weak<RefCell<Vec<Item>>>,
    handlers: HandlerMap,
    event_sub: RefCell<Option<SubscriptionHandle>>,
    binding: RefCell<Option<MetadataBinding>>,
}

/// One entry of a page. Cheap to clone; clones share the same entry.
#[derive(Clone)]
pub struct Item {
    inner: Rc<ItemInner>,
}

impl Item {
    pub(crate) fn new(root: Prop, list: &Rc<RefCell<Vec<Item>>>) -> Item {
        Item {
            inner: Rc::new(ItemInner {
                root,
                list: Rc::downgrade(list),
                handlers: Rc::new(RefCell::new(HashMap::new())),
                event_sub: RefCell::new(None),
                binding: RefCell::new(None),
            }),
        }
    }

    /// The item's node in the page tree.
    #[must_use]
    pub fn root(&self) -> Prop {
        self.inner.root.clone()
    }

    /// Whether `self` and `other` are the same entry.
    #[must_use]
    pub fn is_same(&self, other: &Item) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this item's root is `prop`.
    #[must_use]
    pub fn owns(&self, prop: &Prop) -> bool {
        self.inner.root.is_same(prop)
    }

    pub fn enable(&self) -> PageResult<()> {
        self.inner.root.set("enabled", true)?;
        Ok(())
    }

    pub fn disable(&self) -> PageResult<()> {
        self.inner.root.set("enabled", false)?;
        Ok(())
    }

    // -- context options ------------------------------------------------

    /// Adds a context option that fires `action` when invoked.
    pub fn add_opt_action(&self, title: &str, action: &str) -> PageResult<Prop> {
        let node = Prop::root();
        node.set_kind(NodeKind::Action)?;
        Metadata::new().title(title).apply_to(&node)?;
        node.set("enabled", true)?;
        node.set("action", action)?;
        self.attach_option(node)
    }

    /// Adds a context option that opens `url` when invoked.
    pub fn add_opt_url(&self, title: &str, url: &str) -> PageResult<Prop> {
        let node = Prop::root();
        node.set_kind(NodeKind::Location)?;
        Metadata::new().title(title).apply_to(&node)?;
        node.set("enabled", true)?;
        node.set("url", url)?;
        self.attach_option(node)
    }

    /// Adds a non-selectable divider between context options.
    pub fn add_opt_separator(&self, title: &str) -> PageResult<Prop> {
        let node = Prop::root();
        node.set_kind(NodeKind::Separator)?;
        Metadata::new().title(title).apply_to(&node)?;
        node.set("enabled", true)?;
        self.attach_option(node)
    }

    fn attach_option(&self, node: Prop) -> PageResult<Prop> {
        // Attach last so option watchers only ever see fully formed nodes.
        node.set_parent(&self.inner.root.child("options")?)?;
        Ok(node)
    }

    // -- events ---------------------------------------------------------

    /// Registers `handler` for action events named `event`.
    ///
    /// The underlying subscription is created on first use and lives until
    /// the item's subtree is destroyed.
    pub fn on_event(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&str) -> CallbackResult + 'static,
    ) -> PageResult<()> {
        self.ensure_event_sub()?;
        self.inner
            .handlers
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(Rc::new(handler));
        Ok(())
    }

    fn ensure_event_sub(&self) -> PageResult<()> {
        if self.inner.event_sub.borrow().is_some() {
            return Ok(());
        }
        let handlers = Rc::clone(&self.inner.handlers);
        let sub = self.inner.root.subscribe(
            SubOpts::AUTO_DESTROY | SubOpts::NO_INITIAL_UPDATE,
            move |ev| match ev {
                PropEvent::External(ExtEvent::Action(name)) => dispatch_actions(&handlers, name),
                _ => Ok(()),
            },
        )?;
        *self.inner.event_sub.borrow_mut() = Some(sub);
        Ok(())
    }

    // -- metadata binding -----------------------------------------------

    /// Attaches `binding`, releasing whatever was bound before.
    pub fn bind_metadata(&self, binding: MetadataBinding) {
        if let Some(old) = self.inner.binding.borrow_mut().replace(binding) {
            old.release();
        }
    }

    /// Releases the current binding, if any.
    pub fn unbind_metadata(&self) {
        if let Some(old) = self.inner.binding.borrow_mut().take() {
            old.release();
        }
    }

    // -- ordering and teardown ------------------------------------------

    /// Moves this item before `before`, or to the end when `None`.
    ///
    /// Both the tree and the page's item list change in this call.
    pub fn move_before(&self, before: Option<&Item>) -> PageResult<()> {
        self.inner.root.move_before(before.map(|b| &b.inner.root))?;
        if let Some(list) = self.inner.list.upgrade() {
            let mut items = list.borrow_mut();
            // An anchor from another page does not move the tree node
            // either; leave the list alone so the two stay aligned.
            if let Some(b) = before {
                if !items.iter().any(|i| i.is_same(b)) {
                    return Ok(());
                }
            }
            if let Some(from) = items.iter().position(|i| i.is_same(self)) {
                let item = items.remove(from);
                let to = match before {
                    Some(b) => items
                        .iter()
                        .position(|i| i.is_same(b))
                        .unwrap_or(items.len()),
                    None => items.len(),
                };
                items.insert(to, item);
            }
        }
        Ok(())
    }

    /// Removes the item from its page and destroys its subtree.
    pub fn destroy(&self) -> PageResult<()> {
        if let Some(list) = self.inner.list.upgrade() {
            list.borrow_mut().retain(|i| !i.is_same(self));
        }
        self.unbind_metadata();
        self.inner.root.destroy()?;
        Ok(())
    }

    /// Renders the item subtree for debugging.
    #[must_use]
    pub fn dump(&self) -> String {
        self.inner.root.format_tree()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("root", &self.inner.root)
            .field("bound", &self.inner.binding.borrow().is_some())
            .finish()
    }
}
