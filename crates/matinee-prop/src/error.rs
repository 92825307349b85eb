//! Error types for tree mutation and event delivery.
//!
//! # Failure Modes
//!
//! | Variant | Raised when | Caller action |
//! |---------|-------------|---------------|
//! | [`PropError::DeadNode`] | A write, subscription or event injection targets a destroyed node | Drop the handle; the node never comes back |
//! | [`PropError::Callback`] | A subscriber callback returned an error while its node was alive | Surface to the plugin author; the tree itself is consistent |
//!
//! Reads never fail: accessors on destroyed nodes return empty defaults so
//! display code can keep rendering a final frame without branching.

use std::error::Error;
use std::fmt;

use crate::node::NodeId;

/// Shorthand for results of tree operations.
pub type PropResult<T> = Result<T, PropError>;

/// Error produced by the property tree itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropError {
    /// The target node was already destroyed.
    DeadNode {
        /// Node the operation was aimed at.
        node: NodeId,
        /// Name of the rejected operation.
        op: &'static str,
    },
    /// A subscriber callback failed while its node was alive.
    Callback {
        /// Event that was being delivered.
        event: &'static str,
        /// Node the subscription is attached to.
        node: NodeId,
        /// Message carried by the failing callback.
        message: String,
    },
}

impl PropError {
    /// True when the error is a rejected write on a destroyed node.
    #[must_use]
    pub fn is_dead_node(&self) -> bool {
        matches!(self, PropError::DeadNode { .. })
    }
}

impl fmt::Display for PropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropError::DeadNode { node, op } => {
                write!(f, "{op} on destroyed node {node}")
            }
            PropError::Callback { event, node, message } => {
                write!(f, "subscriber callback failed for {event} on node {node}: {message}")
            }
        }
    }
}

impl Error for PropError {}

// ---------------------------------------------------------------------------
// Callback payload errors
// ---------------------------------------------------------------------------

/// Result type returned by subscriber callbacks.
pub type CallbackResult = Result<(), CallbackError>;

/// Error raised inside plugin-supplied callback code.
///
/// The dispatcher wraps this into [`PropError::Callback`] together with the
/// event name and node id, or suppresses it entirely when the node turned
/// out to be destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Builds an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        CallbackError { message: message.into() }
    }

    /// Borrows the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for CallbackError {}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        CallbackError::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        CallbackError { message }
    }
}

impl From<PropError> for CallbackError {
    fn from(err: PropError) -> Self {
        CallbackError { message: err.to_string() }
    }
}
