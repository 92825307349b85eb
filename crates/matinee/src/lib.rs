#![forbid(unsafe_code)]

//! Matinee public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users: the
//! property tree from `matinee-prop` and the page/settings façade from
//! `matinee-pages`, re-exported under one roof.

pub use matinee_pages::{
    GroupConfig, HostBridge, IntRange, Item, Metadata, Page, PageError, PageOptions, PageResult,
    Route, RouteRegistry, Searcher, Setting, SettingConfig, SettingsGroup, SettingsStore,
};
pub use matinee_prop::{
    CallbackError, ExtEvent, NodeKind, Prop, PropError, PropEvent, PropResult, PropValue, SubOpts,
    SubscriptionHandle,
};

pub mod prelude {
    pub use matinee_pages as pages;
    pub use matinee_prop as prop;
}
