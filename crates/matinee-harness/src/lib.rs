//! Recording fakes for exercising pages and settings from tests.
//!
//! The embedder side of the façade is three traits; this crate provides
//! one recording implementation of each, plus an event recorder for the
//! tree itself:
//!
//! - [`MemoryStore`]: an in-memory [`SettingsStore`] that remembers every
//!   write, for asserting persistence.
//! - [`RecordingBridge`]: a [`HostBridge`] that logs pagination signals
//!   and sync opens, and hands out one [`MemoryStore`] per kv scope.
//! - [`StubRegistry`]: a [`RouteRegistry`] that captures handlers so a
//!   test can fire a route or a search exactly like the navigator would.
//! - [`EventLog`]: a subscription that renders every delivery into a
//!   compact string, in arrival order.

#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use matinee_pages::{
    HostBridge, RawRouteHandler, RawSearchHandler, RouteRegistry, RouteToken, SettingsStore,
};
use matinee_prop::{ExtEvent, Prop, PropEvent, PropResult, PropValue, SubOpts, SubscriptionHandle};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory settings store that records every write.
#[derive(Default)]
pub struct MemoryStore {
    map: RefCell<HashMap<String, PropValue>>,
    writes: RefCell<Vec<(String, PropValue)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn shared() -> Rc<MemoryStore> {
        Rc::new(MemoryStore::default())
    }

    /// Pre-populates a key, as if persisted by an earlier run.
    pub fn seed(&self, key: &str, value: PropValue) {
        self.map.borrow_mut().insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn stored(&self, key: &str) -> Option<PropValue> {
        self.map.borrow().get(key).cloned()
    }

    /// Every write in order, including rewrites of the same key.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, PropValue)> {
        self.writes.borrow().clone()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<PropValue> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &PropValue) {
        debug!(key, value = %value, "store write");
        self.map.borrow_mut().insert(key.to_owned(), value.clone());
        self.writes.borrow_mut().push((key.to_owned(), value.clone()));
    }
}

// ---------------------------------------------------------------------------
// RecordingBridge
// ---------------------------------------------------------------------------

/// Host bridge that records everything pages tell the host.
#[derive(Default)]
pub struct RecordingBridge {
    have_more: RefCell<Vec<bool>>,
    opened: RefCell<Vec<String>>,
    scopes: RefCell<HashMap<(String, String), Rc<MemoryStore>>>,
}

impl RecordingBridge {
    #[must_use]
    pub fn shared() -> Rc<RecordingBridge> {
        Rc::new(RecordingBridge::default())
    }

    /// The store for a kv scope, created on first use.
    ///
    /// The same store is returned to the page and to the test, so writes
    /// made through the page are visible here.
    #[must_use]
    pub fn scope(&self, url: &str, domain: &str) -> Rc<MemoryStore> {
        Rc::clone(
            self.scopes
                .borrow_mut()
                .entry((url.to_owned(), domain.to_owned()))
                .or_default(),
        )
    }

    /// Every `have_more` signal, in order.
    #[must_use]
    pub fn have_more_log(&self) -> Vec<bool> {
        self.have_more.borrow().clone()
    }

    /// Every sync re-open, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl HostBridge for RecordingBridge {
    fn have_more(&self, nodes: &Prop, more: bool) {
        debug!(node = %nodes.id(), more, "have_more");
        self.have_more.borrow_mut().push(more);
    }

    fn make_url(&self, node: &Prop) -> String {
        format!("prop:{}", node.id())
    }

    fn open(&self, root: &Prop, url: &str) {
        debug!(node = %root.id(), url, "sync open");
        self.opened.borrow_mut().push(url.to_owned());
    }

    fn kv_store(&self, url: &str, domain: &str) -> Rc<dyn SettingsStore> {
        self.scope(url, domain)
    }
}

// ---------------------------------------------------------------------------
// StubRegistry
// ---------------------------------------------------------------------------

struct StubRoute {
    pattern: String,
    handler: Rc<dyn Fn(&Prop, bool, &[String])>,
}

struct StubSearcher {
    title: String,
    handler: Rc<dyn Fn(&Prop, &str, &Prop)>,
}

/// Route registry that captures handlers for tests to fire by hand.
#[derive(Default)]
pub struct StubRegistry {
    next: Cell<u64>,
    routes: RefCell<HashMap<u64, StubRoute>>,
    searchers: RefCell<HashMap<u64, StubSearcher>>,
}

impl StubRegistry {
    #[must_use]
    pub fn shared() -> Rc<StubRegistry> {
        Rc::new(StubRegistry::default())
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.borrow().len()
    }

    #[must_use]
    pub fn searcher_count(&self) -> usize {
        self.searchers.borrow().len()
    }

    /// Fires the route registered under exactly `pattern`.
    ///
    /// Returns whether a handler was found. The handler runs with `root`
    /// as the page root, like a navigator open would.
    pub fn fire_route(&self, pattern: &str, root: &Prop, sync: bool, args: &[&str]) -> bool {
        let handler = self
            .routes
            .borrow()
            .values()
            .find(|r| r.pattern == pattern)
            .map(|r| Rc::clone(&r.handler));
        let Some(handler) = handler else {
            return false;
        };
        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        handler(root, sync, &args);
        true
    }

    /// Fires the searcher registered under `title` for one query.
    pub fn fire_search(&self, title: &str, model: &Prop, query: &str, loading: &Prop) -> bool {
        let handler = self
            .searchers
            .borrow()
            .values()
            .find(|s| s.title == title)
            .map(|s| Rc::clone(&s.handler));
        let Some(handler) = handler else {
            return false;
        };
        handler(model, query, loading);
        true
    }
}

impl RouteRegistry for StubRegistry {
    fn register_route(&self, pattern: &str, handler: RawRouteHandler) -> RouteToken {
        let id = self.next.get();
        self.next.set(id + 1);
        self.routes.borrow_mut().insert(
            id,
            StubRoute {
                pattern: pattern.to_owned(),
                handler: Rc::from(handler),
            },
        );
        RouteToken::new(id)
    }

    fn register_searcher(
        &self,
        title: &str,
        _icon: Option<&str>,
        handler: RawSearchHandler,
    ) -> RouteToken {
        let id = self.next.get();
        self.next.set(id + 1);
        self.searchers.borrow_mut().insert(
            id,
            StubSearcher {
                title: title.to_owned(),
                handler: Rc::from(handler),
            },
        );
        RouteToken::new(id)
    }

    fn unregister(&self, token: RouteToken) {
        self.routes.borrow_mut().remove(&token.raw());
        self.searchers.borrow_mut().remove(&token.raw());
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Records every delivery on one node as a compact string.
pub struct EventLog {
    entries: Rc<RefCell<Vec<String>>>,
    _sub: SubscriptionHandle,
}

impl EventLog {
    /// Subscribes to `node` and starts recording.
    pub fn attach(node: &Prop, opts: SubOpts) -> PropResult<EventLog> {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let e = Rc::clone(&entries);
        let sub = node.subscribe(opts, move |ev| {
            e.borrow_mut().push(summarize(ev));
            Ok(())
        })?;
        Ok(EventLog { entries, _sub: sub })
    }

    /// Everything recorded so far, in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Returns the recording and starts over.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

/// One-line rendering of an event, stable across the harness.
#[must_use]
pub fn summarize(ev: &PropEvent) -> String {
    fn label(p: &Prop) -> String {
        p.name().unwrap_or_else(|| format!("#{}", p.id()))
    }
    match ev {
        PropEvent::ValueChanged(v) => format!("value:{v}"),
        PropEvent::ChildAdded(c) => format!("add:{}", label(c)),
        PropEvent::ChildRemoved(c) => format!("del:{}", label(c)),
        PropEvent::ChildMoved(c, before) => match before {
            Some(b) => format!("move:{}<{}", label(c), label(b)),
            None => format!("move:{}<end", label(c)),
        },
        PropEvent::SelectChild(c) => format!("select:{}", label(c)),
        PropEvent::WantMoreChildren => "want_more".to_owned(),
        PropEvent::RequestMove(c, before) => match before {
            Some(b) => format!("req_move:{}<{}", label(c), label(b)),
            None => format!("req_move:{}<end", label(c)),
        },
        PropEvent::External(ext) => match ext {
            ExtEvent::Action(name) => format!("ext:action:{name}"),
            ExtEvent::Redirect(url) => format!("ext:redirect:{url}"),
            ExtEvent::OpenUrl { url, .. } => format!("ext:open:{url}"),
        },
        PropEvent::Destroyed => "destroyed".to_owned(),
    }
}
