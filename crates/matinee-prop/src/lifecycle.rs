//! Lifecycle helpers for code that runs against nodes it does not own.
//!
//! Plugin callbacks frequently outlive the page or setting they were
//! written for: the user navigates away, the subtree is destroyed, and a
//! queued callback still runs. The helpers here keep that case quiet
//! without masking real failures on live nodes.

use std::cell::Cell;

use tracing::debug;

use crate::error::CallbackResult;
use crate::node::Prop;

/// Runs a fallible plugin callback tied to `node`.
///
/// An error is passed through while the node is alive. If the node is
/// destroyed by the time the callback fails, the error is suppressed with
/// a debug log; failing work against a dead node is expected during
/// teardown and must not take the caller down.
pub fn guard_callback(node: &Prop, what: &str, f: impl FnOnce() -> CallbackResult) -> CallbackResult {
    match f() {
        Ok(()) => Ok(()),
        Err(err) if node.is_zombie() => {
            debug!(
                node = %node.id(),
                context = what,
                error = %err,
                "callback failed after its node was destroyed; suppressed"
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Holds a +1 on a numeric node until released or dropped.
///
/// Busy indicators are the typical use: take the guard when work starts
/// and the count comes back down on every exit path, including errors.
/// Adjustments on a destroyed node are silently skipped.
#[must_use = "dropping the guard immediately releases the count it holds"]
pub struct CounterGuard {
    node: Prop,
    released: Cell<bool>,
}

impl CounterGuard {
    /// Increments `node` and returns the guard holding that increment.
    pub fn hold(node: &Prop) -> CounterGuard {
        adjust(node, 1.0);
        CounterGuard { node: node.clone(), released: Cell::new(false) }
    }

    /// Releases the held count early. Safe to call more than once.
    pub fn release(&self) {
        if !self.released.replace(true) {
            adjust(&self.node, -1.0);
        }
    }
}

impl Drop for CounterGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn adjust(node: &Prop, delta: f64) {
    if let Err(err) = node.add_number(delta) {
        debug!(node = %node.id(), delta, error = %err, "counter adjustment skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::value::PropValue;

    #[test]
    fn guard_passes_errors_through_while_alive() {
        let node = Prop::root();
        let res = guard_callback(&node, "test", || Err(CallbackError::new("bad")));
        assert_eq!(res, Err(CallbackError::new("bad")));
        let ok = guard_callback(&node, "test", || Ok(()));
        assert_eq!(ok, Ok(()));
    }

    #[test]
    fn guard_suppresses_errors_once_the_node_died() {
        let node = Prop::root();
        let n = node.clone();
        let res = guard_callback(&node, "test", move || {
            n.destroy().unwrap();
            Err(CallbackError::new("died on the way"))
        });
        assert_eq!(res, Ok(()));
    }

    #[test]
    fn counter_guard_balances_on_drop() {
        let loading = Prop::root();
        loading.set_value(0).unwrap();
        {
            let _guard = CounterGuard::hold(&loading);
            assert_eq!(loading.value(), PropValue::Int(1));
            let _second = CounterGuard::hold(&loading);
            assert_eq!(loading.value(), PropValue::Int(2));
        }
        assert_eq!(loading.value(), PropValue::Int(0));
    }

    #[test]
    fn counter_guard_release_is_idempotent() {
        let loading = Prop::root();
        loading.set_value(0).unwrap();
        let guard = CounterGuard::hold(&loading);
        guard.release();
        guard.release();
        drop(guard);
        assert_eq!(loading.value(), PropValue::Int(0));
    }

    #[test]
    fn counter_guard_tolerates_a_dead_node() {
        let loading = Prop::root();
        let guard = CounterGuard::hold(&loading);
        loading.destroy().unwrap();
        drop(guard);
        assert!(loading.is_zombie());
    }
}
