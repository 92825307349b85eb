//! Property-based invariant tests for the tree core.
//!
//! Random operation sequences are applied both to a real tree and to a
//! plain `Vec<String>` model of the child order; the two must agree after
//! every step. Further properties pin subscription replay convergence,
//! event-stream shape and zombie permanence under arbitrary inputs.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use matinee_prop::{Prop, PropEvent, PropValue, SubOpts};

// ═══════════════════════════════════════════════════════════════════════════
// Operation model
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Op {
    /// Get-or-create a named child.
    Add(u8),
    /// Move child `from` before child `anchor` (`None` = to the end).
    MoveBefore(u8, Option<u8>),
    /// Destroy a named child if present.
    Remove(u8),
    /// Write a value through a named child, creating it when absent.
    Set(u8, i32),
}

fn name_for(tag: u8) -> String {
    format!("n{}", tag % 8)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Add),
        ((0u8..16), prop::option::of(0u8..16)).prop_map(|(a, b)| Op::MoveBefore(a, b)),
        (0u8..8).prop_map(Op::Remove),
        ((0u8..8), -100i32..100).prop_map(|(n, v)| Op::Set(n, v)),
    ]
}

/// Applies one op to the tree and to the model, keeping both in lockstep.
fn apply(root: &Prop, model: &mut Vec<String>, op: &Op) {
    match op {
        Op::Add(tag) => {
            let name = name_for(*tag);
            root.child(&name).unwrap();
            if !model.contains(&name) {
                model.push(name);
            }
        }
        Op::Set(tag, v) => {
            let name = name_for(*tag);
            root.set(&name, i64::from(*v)).unwrap();
            if !model.contains(&name) {
                model.push(name);
            }
        }
        Op::Remove(tag) => {
            let name = name_for(*tag);
            root.delete_child(&name).unwrap();
            model.retain(|n| *n != name);
        }
        Op::MoveBefore(from, anchor) => {
            let len = model.len();
            if len == 0 {
                return;
            }
            let from = usize::from(*from) % len;
            let anchor = anchor.map(|a| usize::from(a) % len);
            if anchor == Some(from) {
                return;
            }
            let child = root.child_at(from).unwrap();
            let anchor_child = anchor.map(|i| root.child_at(i).unwrap());
            child.move_before(anchor_child.as_ref()).unwrap();

            let anchor_name = anchor.map(|i| model[i].clone());
            let moved = model.remove(from);
            let to = anchor_name
                .and_then(|an| model.iter().position(|n| *n == an))
                .unwrap_or(model.len());
            model.insert(to, moved);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Invariant 1: child order matches the sequential model after every step
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn child_order_matches_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let root = Prop::root();
        let mut model: Vec<String> = Vec::new();
        for op in &ops {
            apply(&root, &mut model, op);
            prop_assert_eq!(root.child_names(), model.clone());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Invariant 2: a late subscriber converges on the same child order
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn late_subscriber_replay_converges(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let root = Prop::root();
        let mut model: Vec<String> = Vec::new();
        for op in &ops {
            apply(&root, &mut model, op);
        }
        let replayed = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::clone(&replayed);
        let _sub = root
            .subscribe(SubOpts::empty(), move |ev| {
                if let PropEvent::ChildAdded(c) = ev {
                    r.borrow_mut().push(c.name().unwrap_or_default());
                }
                Ok(())
            })
            .unwrap();
        prop_assert_eq!(replayed.borrow().clone(), model);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Invariant 3: adds and removes balance out when the container is cleared
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn adds_and_removes_balance(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let root = Prop::root();
        let counts = Rc::new(RefCell::new((0usize, 0usize)));
        let c = Rc::clone(&counts);
        let _sub = root
            .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
                match ev {
                    PropEvent::ChildAdded(_) => c.borrow_mut().0 += 1,
                    PropEvent::ChildRemoved(_) => c.borrow_mut().1 += 1,
                    _ => {}
                }
                Ok(())
            })
            .unwrap();
        let mut model = Vec::new();
        for op in &ops {
            apply(&root, &mut model, op);
        }
        root.delete_children().unwrap();
        let (added, removed) = *counts.borrow();
        prop_assert_eq!(added, removed);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Invariant 4: the value event stream is the deduplicated write sequence
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn value_events_match_distinct_writes(values in prop::collection::vec(-50i64..50, 1..25)) {
        let node = Prop::root();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = node
            .subscribe(SubOpts::NO_INITIAL_UPDATE, move |ev| {
                if let PropEvent::ValueChanged(PropValue::Int(n)) = ev {
                    s.borrow_mut().push(*n);
                }
                Ok(())
            })
            .unwrap();

        let mut expected = Vec::new();
        for v in &values {
            node.set_value(*v).unwrap();
            if expected.last() != Some(v) {
                expected.push(*v);
            }
        }
        prop_assert_eq!(seen.borrow().clone(), expected.clone());
        prop_assert_eq!(node.value(), PropValue::Int(*expected.last().unwrap()));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Invariant 5: zombies stay zombies, whatever is thrown at them
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn destroyed_roots_stay_destroyed(ops in prop::collection::vec(op_strategy(), 0..25)) {
        let root = Prop::root();
        root.child("seed").unwrap();
        let destroyed = Rc::new(RefCell::new(0));
        let d = Rc::clone(&destroyed);
        let _sub = root
            .subscribe(SubOpts::AUTO_DESTROY | SubOpts::NO_INITIAL_UPDATE, move |ev| {
                if matches!(ev, PropEvent::Destroyed) {
                    *d.borrow_mut() += 1;
                }
                Ok(())
            })
            .unwrap();
        root.destroy().unwrap();

        for op in &ops {
            match op {
                Op::Add(tag) => prop_assert!(root.child(name_for(*tag)).is_err()),
                Op::Set(tag, v) => {
                    prop_assert!(root.set(&name_for(*tag), i64::from(*v)).is_err());
                }
                Op::Remove(tag) => prop_assert!(root.delete_child(&name_for(*tag)).is_ok()),
                Op::MoveBefore(..) => prop_assert!(root.child_at(0).is_none()),
            }
            prop_assert!(root.is_zombie());
            prop_assert_eq!(root.child_count(), 0);
        }
        prop_assert_eq!(*destroyed.borrow(), 1);
    }
}
