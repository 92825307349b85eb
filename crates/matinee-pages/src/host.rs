//! Embedder-facing collaborator traits.
//!
//! The façade never talks to the surrounding application directly; every
//! outbound concern goes through one of the traits here. The embedder hands
//! implementations in at construction time ([`crate::Page`], [`crate::Route`],
//! [`crate::SettingsGroup`]), and the test harness substitutes recording
//! fakes for all three.
//!
//! # Design
//!
//! - [`SettingsStore`] is a key/value scope. The embedder decides how a
//!   store maps to durable storage; the façade only gets and sets by
//!   setting id.
//! - [`HostBridge`] carries the notifications a page cannot express as
//!   tree mutations: pagination exhaustion, URL minting for a freshly
//!   built node and synchronous re-open on redirect.
//! - [`RouteRegistry`] owns URL dispatch. The façade registers raw
//!   handlers over plain props and wraps them into [`crate::Page`]s when
//!   they fire.

use std::rc::Rc;

use matinee_prop::{Prop, PropValue};

// ---------------------------------------------------------------------------
// Settings persistence
// ---------------------------------------------------------------------------

/// Key/value persistence scope for one settings group or page.
pub trait SettingsStore {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<PropValue>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &PropValue);
}

// ---------------------------------------------------------------------------
// Host bridge
// ---------------------------------------------------------------------------

/// Outbound notifications from pages to the embedder.
pub trait HostBridge {
    /// Tells the host whether `nodes` can produce more children.
    ///
    /// Invoked after every pagination request, with `false` when no
    /// paginator is installed or the installed one reports exhaustion.
    fn have_more(&self, nodes: &Prop, more: bool);

    /// Mints a global URL addressing `node`.
    fn make_url(&self, node: &Prop) -> String;

    /// Synchronously re-opens `root` at `url` (sync redirect path).
    fn open(&self, root: &Prop, url: &str);

    /// Returns the persistence scope for `url` within `domain`.
    fn kv_store(&self, url: &str, domain: &str) -> Rc<dyn SettingsStore>;
}

// ---------------------------------------------------------------------------
// Route registry
// ---------------------------------------------------------------------------

/// Opaque registration handle issued by a [`RouteRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteToken(u64);

impl RouteToken {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Raw route callback: page root, sync flag, captured path arguments.
pub type RawRouteHandler = Box<dyn Fn(&Prop, bool, &[String])>;

/// Raw search callback: search model, query string, loading counter.
pub type RawSearchHandler = Box<dyn Fn(&Prop, &str, &Prop)>;

/// URL dispatch owned by the embedder.
///
/// Handlers registered here receive plain props; [`crate::Route`] and
/// [`crate::Searcher`] wrap them so plugin code only ever sees pages.
pub trait RouteRegistry {
    /// Registers `handler` for URLs matching `pattern`.
    fn register_route(&self, pattern: &str, handler: RawRouteHandler) -> RouteToken;

    /// Registers a search provider presented with `title` and `icon`.
    fn register_searcher(
        &self,
        title: &str,
        icon: Option<&str>,
        handler: RawSearchHandler,
    ) -> RouteToken;

    /// Removes a prior registration. Unknown tokens are ignored.
    fn unregister(&self, token: RouteToken);
}
