//! Settings groups: persisted, observable plugin configuration.
//!
//! A group owns a container of setting nodes. Each setting mirrors its
//! current value into a [`SettingsStore`] and optionally notifies a plugin
//! callback; the store is also consulted at creation time so settings come
//! up with their last persisted value.
//!
//! # Design
//!
//! Two ways to obtain a group:
//!
//! - [`SettingsGroup::create`] builds a free-standing group node (kind
//!   `Settings`) with its own metadata and URL. Destroying the group
//!   removes the node.
//! - [`SettingsGroup::attach`] wraps an existing container, typically a
//!   page's `options` node. The container is not owned; destroying the
//!   group only stops persistence.
//!
//! # Invariants
//!
//! 1. Configuration is validated before any node is created; a rejected
//!    call leaves the tree untouched.
//! 2. Value subscriptions replay the initial value, so a setting's
//!    callback always runs once at creation with the effective value.
//! 3. After [`SettingsGroup::destroy`], no further store writes happen,
//!    even for settings whose nodes are still alive.

use std::cell::Cell;
use std::rc::Rc;

use matinee_prop::{
    CallbackResult, NodeKind, Prop, PropEvent, PropValue, SubOpts,
};

use crate::error::{PageError, PageResult};
use crate::host::{HostBridge, SettingsStore};
use crate::meta::Metadata;

/// Change callback: receives the coerced value after it was persisted.
pub type ValueCallback = Box<dyn Fn(&PropValue) -> CallbackResult>;

/// Callback for action settings.
pub type ActionCallback = Box<dyn Fn() -> CallbackResult>;

/// Configuration for a free-standing settings group.
#[derive(Debug, Clone, Default)]
pub struct GroupConfig {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    pub description: Option<String>,
}

/// Configuration common to every setting.
#[derive(Debug, Clone, Default)]
pub struct SettingConfig {
    pub id: String,
    pub title: String,
}

impl SettingConfig {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Bounds of an integer setting, mirrored into the setting node.
#[derive(Debug, Clone)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub unit: Option<String>,
}

/// How a raw tree value maps to the persisted value.
#[derive(Clone, Copy)]
enum Coerce {
    Bool,
    Raw,
    Int,
}

impl Coerce {
    fn apply(self, v: &PropValue) -> PropValue {
        match self {
            Coerce::Bool => PropValue::Bool(v.truthy()),
            Coerce::Raw => v.clone(),
            Coerce::Int => PropValue::Int(v.coerce_int()),
        }
    }
}

fn require(what: &str, field: &str, value: &str) -> PageResult<()> {
    if value.trim().is_empty() {
        return Err(PageError::config(format!("{what} requires a non-empty {field}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SettingsGroup
// ---------------------------------------------------------------------------

pub struct SettingsGroup {
    model: Prop,
    nodes: Prop,
    store: Rc<dyn SettingsStore>,
    /// Set on destroy; checked by every persistence subscription.
    zombie: Rc<Cell<bool>>,
    owned: bool,
}

impl SettingsGroup {
    /// Builds a new group node under `parent`.
    pub fn create(
        parent: &Prop,
        conf: &GroupConfig,
        store: Rc<dyn SettingsStore>,
        bridge: &dyn HostBridge,
    ) -> PageResult<SettingsGroup> {
        require("settings group", "id", &conf.id)?;
        require("settings group", "title", &conf.title)?;
        let model = parent.child(&conf.id)?;
        model.set_kind(NodeKind::Settings)?;
        model.set("url", bridge.make_url(&model))?;
        let mut meta = Metadata::new().title(conf.title.as_str());
        if let Some(icon) = &conf.icon {
            meta = meta.icon(icon.as_str());
        }
        if let Some(desc) = &conf.description {
            meta = meta.with("shortdesc", desc.as_str());
        }
        meta.apply_to(&model)?;
        let nodes = model.child("nodes")?;
        Ok(SettingsGroup {
            model,
            nodes,
            store,
            zombie: Rc::new(Cell::new(false)),
            owned: true,
        })
    }

    /// Wraps an existing container without taking ownership of it.
    #[must_use]
    pub fn attach(nodes: Prop, store: Rc<dyn SettingsStore>) -> SettingsGroup {
        SettingsGroup {
            model: nodes.clone(),
            nodes,
            store,
            zombie: Rc::new(Cell::new(false)),
            owned: false,
        }
    }

    /// The group node (for created groups) or the wrapped container.
    #[must_use]
    pub fn model(&self) -> Prop {
        self.model.clone()
    }

    /// Stops persistence; additionally removes the node for created groups.
    pub fn destroy(&self) -> PageResult<()> {
        self.zombie.set(true);
        if self.owned {
            self.model.destroy()?;
        }
        Ok(())
    }

    // -- setting creators -----------------------------------------------

    pub fn create_bool(
        &self,
        conf: &SettingConfig,
        default: bool,
        callback: Option<ValueCallback>,
    ) -> PageResult<Setting> {
        let model = self.build_setting(conf, NodeKind::Bool)?;
        let initial = self.initial(&conf.id, PropValue::Bool(default));
        model.set("value", PropValue::Bool(initial.truthy()))?;
        self.bind_value(&model, &conf.id, Coerce::Bool, callback)?;
        Ok(Setting { model })
    }

    pub fn create_string(
        &self,
        conf: &SettingConfig,
        default: &str,
        callback: Option<ValueCallback>,
    ) -> PageResult<Setting> {
        let model = self.build_setting(conf, NodeKind::Text)?;
        let initial = self.initial(&conf.id, PropValue::str(default));
        model.set("value", initial)?;
        self.bind_value(&model, &conf.id, Coerce::Raw, callback)?;
        Ok(Setting { model })
    }

    pub fn create_integer(
        &self,
        conf: &SettingConfig,
        range: &IntRange,
        default: i64,
        callback: Option<ValueCallback>,
    ) -> PageResult<Setting> {
        let model = self.build_setting(conf, NodeKind::Integer)?;
        model.set("min", range.min)?;
        model.set("max", range.max)?;
        model.set("step", range.step)?;
        if let Some(unit) = &range.unit {
            model.set("unit", unit.as_str())?;
        }
        let initial = self.initial(&conf.id, PropValue::Int(default));
        model.set("value", PropValue::Int(initial.coerce_int()))?;
        self.bind_value(&model, &conf.id, Coerce::Int, callback)?;
        Ok(Setting { model })
    }

    /// Adds a passive divider between settings.
    pub fn create_divider(&self, title: &str) -> PageResult<Prop> {
        let node = Prop::root();
        node.set_kind(NodeKind::Separator)?;
        Metadata::new().title(title).apply_to(&node)?;
        node.set_parent(&self.nodes)?;
        Ok(node)
    }

    /// Adds a passive informational entry.
    pub fn create_info(&self, description: &str, icon: Option<&str>) -> PageResult<Prop> {
        let node = Prop::root();
        node.set_kind(NodeKind::Info)?;
        node.set("description", description)?;
        if let Some(icon) = icon {
            node.set("image", icon)?;
        }
        node.set_parent(&self.nodes)?;
        Ok(node)
    }

    /// Adds an action setting firing `callback` when invoked.
    pub fn create_action(
        &self,
        conf: &SettingConfig,
        callback: ActionCallback,
    ) -> PageResult<Setting> {
        let model = self.build_setting(conf, NodeKind::Action)?;
        let action = model.child("action")?;
        let zombie = Rc::clone(&self.zombie);
        let sub = action.subscribe(
            SubOpts::NO_INITIAL_UPDATE | SubOpts::AUTO_DESTROY,
            move |ev| {
                if zombie.get() {
                    return Ok(());
                }
                match ev {
                    PropEvent::External(_) => callback(),
                    _ => Ok(()),
                }
            },
        )?;
        // AUTO_DESTROY: delivery continues for the node's lifetime.
        drop(sub);
        Ok(Setting { model })
    }

    // -- internals ------------------------------------------------------

    fn build_setting(&self, conf: &SettingConfig, kind: NodeKind) -> PageResult<Prop> {
        require("setting", "id", &conf.id)?;
        require("setting", "title", &conf.title)?;
        let model = self.nodes.child(&conf.id)?;
        model.set_kind(kind)?;
        model.set("enabled", true)?;
        Metadata::new().title(conf.title.as_str()).apply_to(&model)?;
        Ok(model)
    }

    fn initial(&self, id: &str, default: PropValue) -> PropValue {
        self.store.get(id).unwrap_or(default)
    }

    fn bind_value(
        &self,
        model: &Prop,
        id: &str,
        coerce: Coerce,
        callback: Option<ValueCallback>,
    ) -> PageResult<()> {
        let value = model.child("value")?;
        let store = Rc::clone(&self.store);
        let zombie = Rc::clone(&self.zombie);
        let key = id.to_owned();
        let sub = value.subscribe(SubOpts::IGNORE_VOID | SubOpts::AUTO_DESTROY, move |ev| {
            let PropEvent::ValueChanged(raw) = ev else {
                return Ok(());
            };
            if zombie.get() {
                return Ok(());
            }
            let v = coerce.apply(raw);
            store.set(&key, &v);
            if let Some(cb) = &callback {
                cb(&v)?;
            }
            Ok(())
        })?;
        drop(sub);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Setting
// ---------------------------------------------------------------------------

/// Handle to one created setting.
#[derive(Debug)]
pub struct Setting {
    model: Prop,
}

impl Setting {
    /// The setting's node.
    #[must_use]
    pub fn model(&self) -> Prop {
        self.model.clone()
    }

    /// Current raw value from the tree.
    #[must_use]
    pub fn value(&self) -> PropValue {
        self.model.get("value")
    }

    /// Writes the value; persistence and callbacks follow from the write.
    pub fn set_value(&self, value: impl Into<PropValue>) -> PageResult<()> {
        self.model.set("value", value)?;
        Ok(())
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.model.get("enabled").truthy()
    }

    pub fn set_enabled(&self, enabled: bool) -> PageResult<()> {
        self.model.set("enabled", enabled)?;
        Ok(())
    }
}
