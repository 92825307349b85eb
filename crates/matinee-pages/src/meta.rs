//! Ordered metadata assembly for items, actions and settings nodes.

use matinee_prop::{Prop, PropResult, PropValue};

/// Builder for the `metadata` child of a node.
///
/// Keys are applied in insertion order, so the first write wins the first
/// slot in the resulting directory. Later writes to the same key overwrite
/// the value in place without reordering.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: Vec<(String, PropValue)>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites one metadata field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
        self
    }

    #[must_use]
    pub fn title(self, title: impl Into<PropValue>) -> Self {
        self.with("title", title)
    }

    #[must_use]
    pub fn icon(self, icon: impl Into<PropValue>) -> Self {
        self.with("icon", icon)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes every field under `node.metadata`, in insertion order.
    pub fn apply_to(&self, node: &Prop) -> PropResult<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let meta = node.child("metadata")?;
        for (key, value) in &self.entries {
            meta.set(key, value.clone())?;
        }
        Ok(())
    }
}
