//! Events delivered to subscribers.
//!
//! Every mutation of a node produces exactly one [`PropEvent`] for each of
//! the node's subscriptions. Events carry owned handles and cloned values,
//! so a subscriber may inspect them after the originating node has been
//! destroyed; the payload reflects the state at mutation time.

use crate::node::Prop;
use crate::value::PropValue;

/// Change notification for a single subscription.
#[derive(Debug, Clone)]
pub enum PropEvent {
    /// The node's scalar value changed. Carries the new value.
    ValueChanged(PropValue),
    /// A child was appended or inserted.
    ChildAdded(Prop),
    /// A child was unlinked or destroyed.
    ChildRemoved(Prop),
    /// A child moved to a new position, now sitting before the given
    /// sibling (`None` means it moved to the end).
    ChildMoved(Prop, Option<Prop>),
    /// A child was marked as the current selection.
    SelectChild(Prop),
    /// A consumer finished displaying the known children and wants more.
    WantMoreChildren,
    /// A consumer asks the producer to move a child before a sibling
    /// (`None` means to the end). The producer stays authoritative: the
    /// tree is not reordered until it reacts.
    RequestMove(Prop, Option<Prop>),
    /// An out-of-band event injected with [`Prop::deliver_event`].
    External(ExtEvent),
    /// The node was destroyed. Always the last event a subscription sees.
    Destroyed,
}

impl PropEvent {
    /// Short tag for diagnostics and filtering.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropEvent::ValueChanged(_) => "value_changed",
            PropEvent::ChildAdded(_) => "child_added",
            PropEvent::ChildRemoved(_) => "child_removed",
            PropEvent::ChildMoved(..) => "child_moved",
            PropEvent::SelectChild(_) => "select_child",
            PropEvent::WantMoreChildren => "want_more_children",
            PropEvent::RequestMove(..) => "request_move",
            PropEvent::External(_) => "external",
            PropEvent::Destroyed => "destroyed",
        }
    }
}

/// Out-of-band event addressed at a node rather than describing it.
///
/// These originate from input handling or navigation in the host and are
/// forwarded verbatim to subscribers of the target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtEvent {
    /// A named action, typically a remote-control button or menu entry.
    Action(String),
    /// Ask the page to continue at another URL without a history entry.
    Redirect(String),
    /// Ask the host to open a URL.
    OpenUrl {
        /// Target URL.
        url: String,
        /// Preferred view name, if any.
        view: Option<String>,
        /// How to open: `"continue"`, `"newWindow"` or host specific.
        how: Option<String>,
        /// URL of the parent page for back navigation.
        parent_url: Option<String>,
    },
}

impl ExtEvent {
    /// Builds a plain action event.
    pub fn action(name: impl Into<String>) -> Self {
        ExtEvent::Action(name.into())
    }

    /// True when this is an action with the given name.
    #[must_use]
    pub fn is_action(&self, name: &str) -> bool {
        matches!(self, ExtEvent::Action(a) if a == name)
    }
}
