//! Reactive property tree for Matinee plugins.
//!
//! The tree is the data plane between plugin code producing content and
//! the host UI consuming it: plugins write named, ordered nodes; consumers
//! subscribe and receive every change as an ordered event stream. The same
//! channel carries signals the other way, from the UI back to the
//! producer: pagination requests, reorder requests and out-of-band action
//! events.
//!
//! # Model
//!
//! - [`Prop`] is a cheap-to-clone handle onto one node. A node holds a
//!   scalar [`PropValue`] or ordered children, plus a [`NodeKind`] tag.
//! - [`Prop::subscribe`] registers a callback with [`SubOpts`] flags and
//!   replays the current state so late subscribers converge.
//! - Destruction is irreversible. A destroyed node is a *zombie*: writes
//!   fail with [`PropError::DeadNode`], reads return empty defaults, and
//!   every subscription receives [`PropEvent::Destroyed`] exactly once as
//!   its final event.
//!
//! Everything is single-threaded and `Rc`-based. Mutating calls deliver
//! events before returning; re-entrant mutations from inside callbacks
//! are queued and delivered in FIFO order by the outermost call.
//!
//! # Example
//!
//! ```
//! use matinee_prop::{Prop, PropEvent, SubOpts};
//!
//! let list = Prop::root();
//! let sub = list.subscribe(SubOpts::empty(), |ev| {
//!     if let PropEvent::ChildAdded(c) = ev {
//!         println!("new entry: {:?}", c.name());
//!     }
//!     Ok(())
//! })?;
//! list.child("first")?.set("title", "Hello")?;
//! sub.unsubscribe();
//! # Ok::<(), matinee_prop::PropError>(())
//! ```

#![forbid(unsafe_code)]

mod error;
mod event;
mod kind;
mod lifecycle;
mod node;
mod subscription;
mod value;

#[cfg(test)]
mod repro_nested_dispatch;

pub use error::{CallbackError, CallbackResult, PropError, PropResult};
pub use event::{ExtEvent, PropEvent};
pub use kind::NodeKind;
pub use lifecycle::{guard_callback, CounterGuard};
pub use node::{NodeId, Prop};
pub use subscription::{SubId, SubOpts, SubscriptionHandle};
pub use value::PropValue;
