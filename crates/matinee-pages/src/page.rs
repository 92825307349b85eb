//! Pages: what a plugin handler receives when a URL it registered for
//! opens.
//!
//! A page wraps the raw root prop the host hands over. The wrap is thin:
//! every append and every accessor is a tree mutation underneath, so view
//! code observing the tree sees the page exactly as it is built. What the
//! page adds on top of the tree is bookkeeping the tree cannot carry: the
//! item list, the installed paginator and reorderer, the event handler
//! table and the lifecycle state.
//!
//! # Design
//!
//! A non-flat page separates `root` from `root.model`; the model holds
//! `nodes` (the entries), `actions`, `options` (a kv-backed settings
//! group) and presentation children like `metadata` and `loading`. A flat
//! page collapses model onto root; search result containers use this.
//!
//! Pagination and reordering arrive as tree events on `model.nodes`. One
//! auto-destroying subscription, installed at construction, translates
//! them into calls of the installed closures. The closures are taken out
//! of their slot for the duration of the call, so they may replace
//! themselves without tripping a borrow.
//!
//! # Invariants
//!
//! 1. `items` order always matches `model.nodes` child order for tracked
//!    items.
//! 2. After a redirect, no pagination or reorder callback runs for this
//!    page.
//! 3. Page teardown drops every installed plugin closure, so plugin
//!    cycles through the page are broken when the tree goes away.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use matinee_prop::{
    CallbackError, CallbackResult, ExtEvent, NodeKind, Prop, PropEvent, PropValue, SubOpts,
    SubscriptionHandle, guard_callback,
};

use crate::error::PageResult;
use crate::host::HostBridge;
use crate::item::{HandlerMap, Item, dispatch_actions};
use crate::meta::Metadata;
use crate::settings::SettingsGroup;

/// Supplies further entries on demand. Returns whether more may exist.
pub type Paginator = Box<dyn FnMut() -> Result<bool, CallbackError>>;

/// Applies a user-requested reorder of `moved` to before `before`.
pub type Reorderer = Box<dyn FnMut(&Item, Option<&Item>) -> CallbackResult>;

/// How a page was opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageOptions {
    /// The host blocks on this open; redirects must re-open in place.
    pub sync: bool,
    /// Collapse the model onto the root (search result containers).
    pub flat: bool,
}

/// Lifecycle of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Constructing,
    Active,
    Redirected,
    Destroyed,
}

struct PageInner {
    root: Prop,
    model: Prop,
    nodes: Prop,
    sync: bool,
    flat: bool,
    entries: Cell<i64>,
    items: Rc<RefCell<Vec<Item>>>,
    options: Option<SettingsGroup>,
    paginator: Rc<RefCell<Option<Paginator>>>,
    reorderer: Rc<RefCell<Option<Reorderer>>>,
    handlers: HandlerMap,
    event_sub: RefCell<Option<SubscriptionHandle>>,
    node_sub: RefCell<Option<SubscriptionHandle>>,
    state: Rc<Cell<PageState>>,
    bridge: Rc<dyn HostBridge>,
}

/// Plugin-facing page handle. Cheap to clone; clones share the page.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

impl Page {
    /// Wraps `root` into a page.
    ///
    /// Non-flat pages get a settings group over `model.options`, persisted
    /// in the kv scope of the page URL.
    pub fn new(root: Prop, opts: PageOptions, bridge: Rc<dyn HostBridge>) -> PageResult<Page> {
        let model = if opts.flat { root.clone() } else { root.child("model")? };
        let nodes = model.child("nodes")?;
        root.set("entries", 0i64)?;

        let options = if opts.flat {
            None
        } else {
            let url = root.get("url");
            let store = bridge.kv_store(url.as_str().unwrap_or_default(), "plugin");
            Some(SettingsGroup::attach(model.child("options")?, store))
        };

        let items: Rc<RefCell<Vec<Item>>> = Rc::new(RefCell::new(Vec::new()));
        let paginator: Rc<RefCell<Option<Paginator>>> = Rc::new(RefCell::new(None));
        let reorderer: Rc<RefCell<Option<Reorderer>>> = Rc::new(RefCell::new(None));
        let handlers: HandlerMap = Rc::new(RefCell::new(HashMap::new()));
        let state = Rc::new(Cell::new(PageState::Constructing));

        let node_sub = {
            let nodes_cb = nodes.clone();
            let model = model.clone();
            let items = Rc::clone(&items);
            let paginator = Rc::clone(&paginator);
            let reorderer = Rc::clone(&reorderer);
            let handlers = Rc::clone(&handlers);
            let state = Rc::clone(&state);
            let bridge = Rc::clone(&bridge);
            nodes.subscribe(
                SubOpts::AUTO_DESTROY | SubOpts::NO_INITIAL_UPDATE,
                move |ev| match ev {
                    PropEvent::WantMoreChildren => {
                        paginate(&paginator, &nodes_cb, &model, &bridge)
                    }
                    PropEvent::RequestMove(child, before) => {
                        reorder(&reorderer, &items, &model, child, before.as_ref())
                    }
                    PropEvent::Destroyed => {
                        state.set(PageState::Destroyed);
                        paginator.borrow_mut().take();
                        reorderer.borrow_mut().take();
                        handlers.borrow_mut().clear();
                        Ok(())
                    }
                    _ => Ok(()),
                },
            )?
        };

        state.set(PageState::Active);
        Ok(Page {
            inner: Rc::new(PageInner {
                root,
                model,
                nodes,
                sync: opts.sync,
                flat: opts.flat,
                entries: Cell::new(0),
                items,
                options,
                paginator,
                reorderer,
                handlers,
                event_sub: RefCell::new(None),
                node_sub: RefCell::new(Some(node_sub)),
                state,
                bridge,
            }),
        })
    }

    // -- appending ------------------------------------------------------

    /// Appends a tracked, openable entry.
    pub fn append_item(&self, url: &str, kind: NodeKind, metadata: &Metadata) -> PageResult<Item> {
        let root = Prop::root();
        root.set("url", url)?;
        root.set_kind(kind)?;
        metadata.apply_to(&root)?;
        self.track(root)
    }

    /// Appends a tracked entry that carries data instead of a URL.
    pub fn append_passive_item(
        &self,
        kind: NodeKind,
        data: impl Into<PropValue>,
        metadata: &Metadata,
    ) -> PageResult<Item> {
        let root = Prop::root();
        root.set_kind(kind)?;
        root.set("data", data)?;
        metadata.apply_to(&root)?;
        self.track(root)
    }

    /// Appends a page-level action under `model.actions`.
    ///
    /// Actions are not entries: they are not tracked in the item list and
    /// do not count towards `entries`.
    pub fn append_action(
        &self,
        kind: NodeKind,
        data: impl Into<PropValue>,
        enabled: bool,
        metadata: &Metadata,
    ) -> PageResult<Prop> {
        let node = Prop::root();
        node.set("enabled", enabled)?;
        node.set_kind(kind)?;
        node.set("data", data)?;
        metadata.apply_to(&node)?;
        node.set_parent(&self.inner.model.child("actions")?)?;
        Ok(node)
    }

    fn track(&self, root: Prop) -> PageResult<Item> {
        // Attach last so node watchers only ever see fully formed entries.
        root.set_parent(&self.inner.nodes)?;
        let item = Item::new(root, &self.inner.items);
        self.inner.items.borrow_mut().push(item.clone());
        let count = self.inner.entries.get() + 1;
        self.inner.entries.set(count);
        self.inner.root.set("entries", count)?;
        Ok(item)
    }

    // -- item access ----------------------------------------------------

    /// All currently tracked items, in page order.
    #[must_use]
    pub fn get_items(&self) -> Vec<Item> {
        self.inner.items.borrow().clone()
    }

    /// Finds the tracked item whose root is `prop`.
    #[must_use]
    pub fn find_item_by_prop(&self, prop: &Prop) -> Option<Item> {
        self.inner.items.borrow().iter().find(|i| i.owns(prop)).cloned()
    }

    /// Drops every entry from the page, keeping the page itself usable.
    pub fn flush(&self) -> PageResult<()> {
        self.inner.nodes.delete_children()?;
        self.inner.items.borrow_mut().clear();
        Ok(())
    }

    // -- lifecycle ------------------------------------------------------

    /// Marks the open as failed. The page shows the message, never a
    /// half-built tree.
    pub fn error(&self, message: &str) -> PageResult<()> {
        self.set_loading(false)?;
        self.inner.model.set_kind(NodeKind::OpenError)?;
        self.inner.model.set("error", message)?;
        Ok(())
    }

    /// Sends the user to `url` instead of this page.
    ///
    /// The nodes subscription is torn down first: a redirected page must
    /// not answer pagination for entries it will never show.
    pub fn redirect(&self, url: &str) -> PageResult<()> {
        if let Some(sub) = self.inner.node_sub.borrow_mut().take() {
            sub.unsubscribe();
        }
        self.inner.paginator.borrow_mut().take();
        self.inner.reorderer.borrow_mut().take();
        if self.inner.sync {
            self.inner.bridge.open(&self.inner.root, url);
        } else {
            self.inner
                .root
                .child("eventsink")?
                .deliver_event(ExtEvent::Redirect(url.to_owned()))?;
        }
        self.inner.state.set(PageState::Redirected);
        Ok(())
    }

    /// Destroys the page tree. Equivalent to the host closing the page.
    pub fn destroy(&self) -> PageResult<()> {
        self.inner.root.destroy()?;
        self.inner.state.set(PageState::Destroyed);
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> PageState {
        self.inner.state.get()
    }

    // -- events ---------------------------------------------------------

    /// Registers `handler` for action events named `event` arriving on the
    /// page's event sink.
    pub fn on_event(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&str) -> CallbackResult + 'static,
    ) -> PageResult<()> {
        if self.inner.event_sub.borrow().is_none() {
            let handlers = Rc::clone(&self.inner.handlers);
            let sink = self.inner.root.child("eventsink")?;
            let sub = sink.subscribe(
                SubOpts::AUTO_DESTROY | SubOpts::NO_INITIAL_UPDATE,
                move |ev| match ev {
                    PropEvent::External(ExtEvent::Action(name)) => {
                        dispatch_actions(&handlers, name)
                    }
                    _ => Ok(()),
                },
            )?;
            *self.inner.event_sub.borrow_mut() = Some(sub);
        }
        self.inner
            .handlers
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(Rc::new(handler));
        Ok(())
    }

    // -- pagination and reordering --------------------------------------

    /// Installs the closure that loads further entries on demand.
    pub fn set_paginator(&self, f: impl FnMut() -> Result<bool, CallbackError> + 'static) {
        *self.inner.paginator.borrow_mut() = Some(Box::new(f));
    }

    /// Installs the closure that applies user-requested reorders.
    pub fn set_reorderer(&self, f: impl FnMut(&Item, Option<&Item>) -> CallbackResult + 'static) {
        *self.inner.reorderer.borrow_mut() = Some(Box::new(f));
    }

    // -- accessors ------------------------------------------------------

    #[must_use]
    pub fn root(&self) -> Prop {
        self.inner.root.clone()
    }

    /// The model node; equals [`Self::root`] for flat pages.
    #[must_use]
    pub fn model(&self) -> Prop {
        self.inner.model.clone()
    }

    /// The entry container the host's view observes.
    #[must_use]
    pub fn nodes(&self) -> Prop {
        self.inner.nodes.clone()
    }

    /// The page's kv-backed settings group; `None` for flat pages.
    #[must_use]
    pub fn options(&self) -> Option<&SettingsGroup> {
        self.inner.options.as_ref()
    }

    /// Number of tracked entries appended so far.
    #[must_use]
    pub fn entries(&self) -> i64 {
        self.inner.entries.get()
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.inner.flat
    }

    pub fn set_kind(&self, kind: NodeKind) -> PageResult<()> {
        self.inner.model.set_kind(kind)?;
        Ok(())
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.inner.model.kind()
    }

    pub fn set_loading(&self, loading: bool) -> PageResult<()> {
        self.inner.model.set("loading", loading)?;
        Ok(())
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.model.get("loading").truthy()
    }

    /// The model's metadata directory, for direct field writes.
    pub fn metadata(&self) -> PageResult<Prop> {
        Ok(self.inner.model.child("metadata")?)
    }

    pub fn set_title(&self, title: &str) -> PageResult<()> {
        self.metadata()?.set("title", title)?;
        Ok(())
    }

    pub fn set_source(&self, source: &str) -> PageResult<()> {
        self.inner.root.set("source", source)?;
        Ok(())
    }

    #[must_use]
    pub fn source(&self) -> PropValue {
        self.inner.root.get("source")
    }

    pub fn set_url(&self, url: &str) -> PageResult<()> {
        self.inner.root.set("url", url)?;
        Ok(())
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.inner.root.get("url").as_str().unwrap_or_default().to_owned()
    }

    /// Renders the page tree for debugging.
    #[must_use]
    pub fn dump(&self) -> String {
        self.inner.root.format_tree()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("root", &self.inner.root)
            .field("state", &self.inner.state.get())
            .field("entries", &self.inner.entries.get())
            .field("flat", &self.inner.flat)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Node event translation
// ---------------------------------------------------------------------------

fn paginate(
    paginator: &Rc<RefCell<Option<Paginator>>>,
    nodes: &Prop,
    model: &Prop,
    bridge: &Rc<dyn HostBridge>,
) -> CallbackResult {
    let taken = paginator.borrow_mut().take();
    let more = match taken {
        None => false,
        Some(mut f) => {
            let res = f();
            // Put the closure back unless the call installed a new one.
            let mut slot = paginator.borrow_mut();
            if slot.is_none() {
                *slot = Some(f);
            }
            drop(slot);
            match res {
                Ok(more) => more,
                Err(err) if model.is_zombie() => {
                    debug!(
                        node = %nodes.id(),
                        error = %err,
                        "paginator failed after page teardown; suppressed"
                    );
                    false
                }
                Err(err) => {
                    bridge.have_more(nodes, false);
                    return Err(err);
                }
            }
        }
    };
    bridge.have_more(nodes, more);
    Ok(())
}

fn reorder(
    reorderer: &Rc<RefCell<Option<Reorderer>>>,
    items: &Rc<RefCell<Vec<Item>>>,
    model: &Prop,
    child: &Prop,
    before: Option<&Prop>,
) -> CallbackResult {
    let moved = items.borrow().iter().find(|i| i.owns(child)).cloned();
    let Some(moved) = moved else {
        debug!(node = %child.id(), "move requested for a prop that is not an item; ignored");
        return Ok(());
    };
    let before_item = match before {
        Some(b) => {
            let found = items.borrow().iter().find(|i| i.owns(b)).cloned();
            match found {
                Some(found) => Some(found),
                None => {
                    debug!(node = %b.id(), "move anchor is not an item; ignored");
                    return Ok(());
                }
            }
        }
        None => None,
    };
    let taken = reorderer.borrow_mut().take();
    match taken {
        None => Ok(()),
        Some(mut f) => {
            let res = guard_callback(model, "reorder", || f(&moved, before_item.as_ref()));
            let mut slot = reorderer.borrow_mut();
            if slot.is_none() {
                *slot = Some(f);
            }
            res
        }
    }
}
