//! Plugin-facing page, item and settings façade over [`matinee_prop`].
//!
//! Plugins do not assemble prop trees by hand. They receive a [`Page`]
//! when a URL they routed for opens, append [`Item`]s to it, install a
//! paginator for demand-driven loading, and describe their configuration
//! through a [`SettingsGroup`]. Everything underneath is ordinary tree
//! mutation, so the host's views observe pages through plain
//! subscriptions.
//!
//! The embedder supplies three collaborators: a [`HostBridge`] for
//! notifications the tree cannot carry, a [`RouteRegistry`] for URL
//! dispatch and a [`SettingsStore`] per persistence scope.
//!
//! ```
//! use std::rc::Rc;
//!
//! use matinee_pages::{HostBridge, Metadata, Page, PageOptions, SettingsStore};
//! use matinee_prop::{NodeKind, Prop, PropValue};
//!
//! struct Host;
//!
//! impl HostBridge for Host {
//!     fn have_more(&self, _nodes: &Prop, _more: bool) {}
//!     fn make_url(&self, node: &Prop) -> String {
//!         format!("prop:{}", node.id())
//!     }
//!     fn open(&self, _root: &Prop, _url: &str) {}
//!     fn kv_store(&self, _url: &str, _domain: &str) -> Rc<dyn SettingsStore> {
//!         struct Mem;
//!         impl SettingsStore for Mem {
//!             fn get(&self, _key: &str) -> Option<PropValue> {
//!                 None
//!             }
//!             fn set(&self, _key: &str, _value: &PropValue) {}
//!         }
//!         Rc::new(Mem)
//!     }
//! }
//!
//! let page = Page::new(Prop::root(), PageOptions::default(), Rc::new(Host))?;
//! page.set_kind(NodeKind::Directory)?;
//! page.set_title("Browse")?;
//! let item = page.append_item(
//!     "myplugin:video:1",
//!     NodeKind::Video,
//!     &Metadata::new().title("First"),
//! )?;
//! assert_eq!(page.entries(), 1);
//! assert!(page.find_item_by_prop(&item.root()).is_some());
//! # Ok::<(), matinee_pages::PageError>(())
//! ```

#![forbid(unsafe_code)]

mod error;
mod host;
mod item;
mod meta;
mod page;
mod route;
mod settings;

pub use error::{PageError, PageResult};
pub use host::{
    HostBridge, RawRouteHandler, RawSearchHandler, RouteRegistry, RouteToken, SettingsStore,
};
pub use item::{EventHandler, Item, MetadataBinding};
pub use meta::Metadata;
pub use page::{Page, PageOptions, PageState, Paginator, Reorderer};
pub use route::{Route, Searcher};
pub use settings::{
    ActionCallback, GroupConfig, IntRange, Setting, SettingConfig, SettingsGroup, ValueCallback,
};
