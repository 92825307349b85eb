#![forbid(unsafe_code)]

//! End-to-end settings scenarios: persistence across reopen, per-page
//! option scopes, and the initial-replay contract of value callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use matinee_harness::{MemoryStore, RecordingBridge};
use matinee_pages::{
    GroupConfig, HostBridge, IntRange, Page, PageOptions, SettingConfig, SettingsGroup,
    SettingsStore,
};
use matinee_prop::{Prop, PropValue};
use tracing::{Level, info};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::INFO)
        .try_init();
}

fn group_conf() -> GroupConfig {
    GroupConfig {
        id: "myplugin".into(),
        title: "My Plugin".into(),
        ..GroupConfig::default()
    }
}

#[test]
fn plugin_settings_survive_reopen() {
    init_tracing();
    info!("a toggled setting comes back after the group is rebuilt");
    let store = MemoryStore::shared();
    let bridge = RecordingBridge::shared();

    let tree = Prop::named_root("settings");
    let group = SettingsGroup::create(
        &tree,
        &group_conf(),
        Rc::clone(&store) as Rc<dyn SettingsStore>,
        bridge.as_ref(),
    )
    .unwrap();
    let toggle = group
        .create_bool(&SettingConfig::new("subtitles", "Enable subtitles"), false, None)
        .unwrap();
    // The initial replay persisted the default.
    assert_eq!(store.stored("subtitles"), Some(PropValue::Bool(false)));

    toggle.set_value(true).unwrap();
    assert_eq!(store.stored("subtitles"), Some(PropValue::Bool(true)));
    group.destroy().unwrap();

    // Reopen: a fresh tree over the same store.
    let tree = Prop::named_root("settings");
    let group = SettingsGroup::create(
        &tree,
        &group_conf(),
        Rc::clone(&store) as Rc<dyn SettingsStore>,
        bridge.as_ref(),
    )
    .unwrap();
    let toggle = group
        .create_bool(&SettingConfig::new("subtitles", "Enable subtitles"), false, None)
        .unwrap();
    assert_eq!(toggle.value(), PropValue::Bool(true));
}

#[test]
fn page_options_persist_in_the_page_url_scope() {
    init_tracing();
    info!("page options write through the kv scope of the page url");
    let bridge = RecordingBridge::shared();
    let root = Prop::named_root("page");
    root.set("url", "myplugin:start").unwrap();

    let page = Page::new(
        root.clone(),
        PageOptions::default(),
        Rc::clone(&bridge) as Rc<dyn HostBridge>,
    )
    .unwrap();
    let options = page.options().expect("non-flat pages carry options");
    options
        .create_bool(&SettingConfig::new("grid", "Grid view"), true, None)
        .unwrap();

    let scope = bridge.scope("myplugin:start", "plugin");
    assert_eq!(scope.stored("grid"), Some(PropValue::Bool(true)));

    // A view flipping the option through the tree persists it too.
    let grid = page.model().child("options").unwrap().child("grid").unwrap();
    grid.set("value", false).unwrap();
    assert_eq!(scope.stored("grid"), Some(PropValue::Bool(false)));
}

#[test]
fn value_callbacks_replay_once_at_creation() {
    init_tracing();
    info!("the value callback fires for the initial value, then per change");
    let store = MemoryStore::shared();
    let calls: Rc<RefCell<Vec<PropValue>>> = Rc::new(RefCell::new(Vec::new()));

    let group = SettingsGroup::attach(
        Prop::named_root("opts"),
        Rc::clone(&store) as Rc<dyn SettingsStore>,
    );
    let region = group
        .create_string(
            &SettingConfig::new("region", "Region"),
            "eu",
            Some(Box::new({
                let calls = Rc::clone(&calls);
                move |v| {
                    calls.borrow_mut().push(v.clone());
                    Ok(())
                }
            })),
        )
        .unwrap();

    assert_eq!(*calls.borrow(), [PropValue::str("eu")]);
    assert_eq!(store.write_count(), 1);

    region.set_value("us").unwrap();
    assert_eq!(*calls.borrow(), [PropValue::str("eu"), PropValue::str("us")]);
    assert_eq!(store.write_count(), 2);
}

#[test]
fn stored_values_replay_instead_of_defaults() {
    init_tracing();
    info!("a seeded store wins over the coded default");
    let store = MemoryStore::shared();
    store.seed("quality", PropValue::Int(720));

    let group = SettingsGroup::attach(
        Prop::named_root("opts"),
        Rc::clone(&store) as Rc<dyn SettingsStore>,
    );
    let quality = group
        .create_integer(
            &SettingConfig::new("quality", "Preferred quality"),
            &IntRange {
                min: 240,
                max: 2160,
                step: 120,
                unit: Some("p".into()),
            },
            1080,
            None,
        )
        .unwrap();
    assert_eq!(quality.value(), PropValue::Int(720));
    assert_eq!(quality.model().get("max"), PropValue::Int(2160));
}

#[test]
fn invalid_configuration_leaves_no_trace() {
    init_tracing();
    info!("validation failures reject before any node is created");
    let store = MemoryStore::shared();
    let bridge = RecordingBridge::shared();
    let tree = Prop::named_root("settings");

    let blank_id = GroupConfig {
        id: "   ".into(),
        title: "My Plugin".into(),
        ..GroupConfig::default()
    };
    assert!(
        SettingsGroup::create(
            &tree,
            &blank_id,
            Rc::clone(&store) as Rc<dyn SettingsStore>,
            bridge.as_ref(),
        )
        .is_err()
    );
    assert_eq!(tree.child_count(), 0);

    let group = SettingsGroup::create(
        &tree,
        &group_conf(),
        Rc::clone(&store) as Rc<dyn SettingsStore>,
        bridge.as_ref(),
    )
    .unwrap();
    let before = group.model().child("nodes").unwrap().child_count();
    assert!(
        group
            .create_bool(&SettingConfig::new("", "Broken"), false, None)
            .is_err()
    );
    assert_eq!(group.model().child("nodes").unwrap().child_count(), before);
    assert_eq!(store.write_count(), 0);
}
