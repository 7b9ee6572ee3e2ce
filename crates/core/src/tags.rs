//! Optimistic tag updates.
//!
//! Tags are flipped locally as soon as the user asks and the resulting
//! [`TagChange`] is handed back to the host to persist. If persistence fails
//! the host reverts the change.

use crate::record::{Record, RecordId, Tag};

/// A tag mutation applied to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChange {
    pub id: RecordId,
    pub tag: Tag,
    pub previous: bool,
    pub value: bool,
}

impl TagChange {
    /// Whether the mutation actually changed the stored value
    pub fn is_noop(&self) -> bool {
        self.previous == self.value
    }

    /// The change that undoes this one
    pub fn inverse(&self) -> TagChange {
        TagChange {
            id: self.id.clone(),
            tag: self.tag,
            previous: self.value,
            value: self.previous,
        }
    }
}

/// Sets `tag` on `record`, returning the change if the value differs.
pub(crate) fn apply(record: &mut Record, tag: Tag, value: bool) -> Option<TagChange> {
    let previous = record.tags.set(tag, value);
    let change = TagChange {
        id: record.id.clone(),
        tag,
        previous,
        value,
    };
    (!change.is_noop()).then_some(change)
}

/// Rolls `change` back on `record`.
///
/// Returns false when the record has been modified since, in which case the
/// newer value is kept.
pub(crate) fn revert(record: &mut Record, change: &TagChange) -> bool {
    if record.id != change.id || record.tags.get(change.tag) != change.value {
        return false;
    }
    record.tags.set(change.tag, change.previous);
    true
}
