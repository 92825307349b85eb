//! URL routes and search providers.
//!
//! Plugins never see the raw registry callbacks: [`Route`] and
//! [`Searcher`] register themselves and wrap the plugin handler so that by
//! the time it runs, the raw prop has become a [`Page`]. Handler failures
//! against a live page surface as an open error on that page; failures
//! after the host already tore the target down are suppressed.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, error};

use matinee_prop::{CallbackResult, CounterGuard, NodeKind, Prop, guard_callback};

use crate::host::{HostBridge, RawRouteHandler, RawSearchHandler, RouteRegistry, RouteToken};
use crate::meta::Metadata;
use crate::page::{Page, PageOptions};

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A registered URL pattern. Unregisters on drop.
pub struct Route {
    registry: Rc<dyn RouteRegistry>,
    token: Cell<Option<RouteToken>>,
    pattern: String,
}

impl Route {
    /// Registers `handler` for URLs matching `pattern`.
    ///
    /// When the route fires, the handler receives a non-flat [`Page`] over
    /// the prop the host passed in, plus the captured path arguments.
    pub fn new(
        registry: Rc<dyn RouteRegistry>,
        bridge: Rc<dyn HostBridge>,
        pattern: impl Into<String>,
        handler: impl Fn(&Page, &[String]) -> CallbackResult + 'static,
    ) -> Route {
        let pattern = pattern.into();
        let raw: RawRouteHandler = Box::new({
            let bridge = Rc::clone(&bridge);
            let pattern = pattern.clone();
            move |root, sync, args| {
                open_route(&bridge, &pattern, root, sync, args, &handler);
            }
        });
        let token = registry.register_route(&pattern, raw);
        Route {
            registry,
            token: Cell::new(Some(token)),
            pattern,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Unregisters the route. Later calls are no-ops.
    pub fn destroy(&self) {
        if let Some(token) = self.token.take() {
            self.registry.unregister(token);
        }
    }
}

impl Drop for Route {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn open_route(
    bridge: &Rc<dyn HostBridge>,
    pattern: &str,
    root: &Prop,
    sync: bool,
    args: &[String],
    handler: &dyn Fn(&Page, &[String]) -> CallbackResult,
) {
    let page = match Page::new(
        root.clone(),
        PageOptions { sync, flat: false },
        Rc::clone(bridge),
    ) {
        Ok(page) => page,
        Err(err) => {
            error!(pattern, error = %err, "page construction failed");
            return;
        }
    };
    let res = guard_callback(root, "route handler", || handler(&page, args));
    if let Err(err) = res {
        error!(pattern, error = %err.message(), "route handler failed; reporting an open error");
        if let Err(report) = page.error(err.message()) {
            debug!(pattern, error = %report, "open error could not be reported");
        }
    }
}

// ---------------------------------------------------------------------------
// Searcher
// ---------------------------------------------------------------------------

/// A registered search provider. Unregisters on drop.
///
/// Per query, the provider gets a fresh flat [`Page`] whose root is a
/// directory appended under the search model, and the query's loading
/// counter is held for the duration of the handler.
pub struct Searcher {
    registry: Rc<dyn RouteRegistry>,
    token: Cell<Option<RouteToken>>,
    title: String,
}

impl Searcher {
    pub fn new(
        registry: Rc<dyn RouteRegistry>,
        bridge: Rc<dyn HostBridge>,
        title: impl Into<String>,
        icon: Option<&str>,
        handler: impl Fn(&Page, &str) -> CallbackResult + 'static,
    ) -> Searcher {
        let title = title.into();
        let raw: RawSearchHandler = Box::new({
            let bridge = Rc::clone(&bridge);
            let title = title.clone();
            let icon = icon.map(str::to_owned);
            move |model, query, loading| {
                run_search(&bridge, &title, icon.as_deref(), model, query, loading, &handler);
            }
        });
        let token = registry.register_searcher(&title, icon, raw);
        Searcher {
            registry,
            token: Cell::new(Some(token)),
            title,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Unregisters the provider. Later calls are no-ops.
    pub fn destroy(&self) {
        if let Some(token) = self.token.take() {
            self.registry.unregister(token);
        }
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn run_search(
    bridge: &Rc<dyn HostBridge>,
    title: &str,
    icon: Option<&str>,
    model: &Prop,
    query: &str,
    loading: &Prop,
    handler: &dyn Fn(&Page, &str) -> CallbackResult,
) {
    let res = guard_callback(model, "search handler", || {
        let root = Prop::root();
        let mut meta = Metadata::new().title(title);
        if let Some(icon) = icon {
            meta = meta.icon(icon);
        }
        meta.apply_to(&root)?;
        root.set_kind(NodeKind::Directory)?;
        root.set_parent(&model.child("nodes")?)?;
        let page = Page::new(
            root.clone(),
            PageOptions { sync: false, flat: true },
            Rc::clone(bridge),
        )?;
        page.set_url(&bridge.make_url(&root))?;
        let _busy = CounterGuard::hold(loading);
        handler(&page, query)
    });
    if let Err(err) = res {
        error!(title, query, error = %err.message(), "search handler failed");
    }
}
