//! Repro scenarios for re-entrant dispatch.
//!
//! A subscriber that mutates the tree from inside its own callback used to
//! be the easiest way to break delivery ordering: the nested mutation must
//! not start a second drain (callbacks would nest and observe half-applied
//! state), and its events must land behind everything already queued.
//! These tests pin the single-flight behavior with callbacks that append
//! children, answer pagination requests and destroy the container while a
//! delivery storm is in progress.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::event::PropEvent;
use crate::node::Prop;
use crate::subscription::{SubOpts, SubscriptionHandle};

fn name_of(ev: &PropEvent) -> String {
    match ev {
        PropEvent::ChildAdded(c) => format!("add:{}", c.name().unwrap_or_default()),
        PropEvent::ChildRemoved(c) => format!("del:{}", c.name().unwrap_or_default()),
        other => other.kind_name().to_owned(),
    }
}

/// Panics if a callback observes itself re-entered.
fn nesting_detector() -> (Rc<Cell<bool>>, impl Fn() -> NestingToken + Clone) {
    let flag = Rc::new(Cell::new(false));
    let f = Rc::clone(&flag);
    (flag, move || {
        assert!(!f.replace(true), "callback re-entered while another one was running");
        NestingToken(Rc::clone(&f))
    })
}

struct NestingToken(Rc<Cell<bool>>);

impl Drop for NestingToken {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[test]
fn adds_triggered_inside_delivery_keep_fifo_order() {
    let root = Prop::root();
    let log = Rc::new(RefCell::new(Vec::new()));
    let (_flag, enter) = nesting_detector();

    let l = Rc::clone(&log);
    let r = root.clone();
    let e = enter.clone();
    let _chainer = root
        .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
            let _t = e();
            l.borrow_mut().push(format!("chainer:{}", name_of(ev)));
            if let PropEvent::ChildAdded(c) = ev {
                if c.name().as_deref() == Some("a") {
                    r.child("b")?;
                }
            }
            Ok(())
        })
        .unwrap();

    let l = Rc::clone(&log);
    let _watcher = root
        .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
            let _t = enter();
            l.borrow_mut().push(format!("watcher:{}", name_of(ev)));
            Ok(())
        })
        .unwrap();

    root.child("a").unwrap();
    assert_eq!(
        *log.borrow(),
        ["chainer:add:a", "watcher:add:a", "chainer:add:b", "watcher:add:b"]
    );
    assert_eq!(root.child_names(), ["a", "b"]);
}

#[test]
fn pagination_handler_appending_children_does_not_nest() {
    let nodes = Prop::root();
    nodes.child("page1-item").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let (_flag, enter) = nesting_detector();

    let l = Rc::clone(&log);
    let n = nodes.clone();
    let e = enter.clone();
    let _paginator = nodes
        .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
            let _t = e();
            if matches!(ev, PropEvent::WantMoreChildren) {
                l.borrow_mut().push("paginating".to_owned());
                for name in ["page2-a", "page2-b"] {
                    n.child(name)?;
                }
            }
            Ok(())
        })
        .unwrap();

    let l = Rc::clone(&log);
    let _watcher = nodes
        .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
            let _t = enter();
            l.borrow_mut().push(name_of(ev));
            Ok(())
        })
        .unwrap();

    nodes.want_more_children().unwrap();
    assert_eq!(
        *log.borrow(),
        [
            "paginating",
            "want_more_children",
            "add:page2-a",
            "add:page2-b"
        ]
    );
    assert_eq!(nodes.child_count(), 3);
}

#[test]
fn destroy_during_an_add_storm_settles_cleanly() {
    let root = Prop::root();
    let list = root.child("list").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = Rc::clone(&log);
    let doomed = list.clone();
    let _trigger = list
        .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
            l.borrow_mut().push(name_of(ev));
            if let PropEvent::ChildAdded(c) = ev {
                if c.name().as_deref() == Some("second") {
                    doomed.destroy()?;
                }
            }
            Ok(())
        })
        .unwrap();

    list.child("first").unwrap();
    list.child("second").unwrap();
    assert!(list.is_zombie());
    assert!(list.child("third").unwrap_err().is_dead_node());
    assert_eq!(
        *log.borrow(),
        ["add:first", "add:second", "destroyed"]
    );
}

#[test]
fn unsubscribe_from_inside_a_callback_stops_queued_deliveries() {
    let node = Prop::root();
    let count = Rc::new(Cell::new(0));
    let handle: Rc<RefCell<Option<SubscriptionHandle>>> = Rc::new(RefCell::new(None));

    let c = Rc::clone(&count);
    let h = Rc::clone(&handle);
    let sub = node
        .subscribe(SubOpts::NO_INITIAL_UPDATE, move |_| {
            c.set(c.get() + 1);
            if let Some(own) = h.borrow_mut().take() {
                own.unsubscribe();
            }
            Ok(())
        })
        .unwrap();
    *handle.borrow_mut() = Some(sub);

    node.set_value(1).unwrap();
    node.set_value(2).unwrap();
    assert_eq!(count.get(), 1);
}
