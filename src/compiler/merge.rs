//! Typed union of compiled scripts.
//!
//! Gambits and replies are keyed by identifiers that are unique per source,
//! so a key present on both sides is a hard error. Topics are keyed by name
//! and may legitimately repeat (every file with topic-less gambits contributes
//! to `random`), so what happens on a repeated name is a policy:
//!
//! - [`TopicConflict::Extend`]: append gambits, union keywords, and let the
//!   later declaration win for each flag and for the filter.
//! - [`TopicConflict::Reject`]: fail with [`CompileError::DuplicateTopic`].
//!   The `random` topic always extends.

use crate::{CompileError, RANDOM_TOPIC, ScriptGraph, Topic};
use std::collections::btree_map::Entry;
use tracing::warn;

/// What to do when two files declare a topic with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicConflict {
    #[default]
    Extend,
    Reject,
}

impl Topic {
    /// Fold a same-named topic into this one.
    pub(crate) fn extend_with(&mut self, other: Topic) {
        for id in other.gambits {
            if !self.gambits.contains(&id) {
                self.gambits.push(id);
            }
        }
        for keyword in other.keywords {
            if !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self.flags.extend(other.flags);
        if other.filter.is_some() {
            self.filter = other.filter;
        }
    }
}

impl ScriptGraph {
    /// Union `other` into `self`. Nothing is modified when an error is
    /// returned.
    pub(crate) fn absorb(&mut self, other: ScriptGraph, policy: TopicConflict) -> Result<(), CompileError> {
        if let Some(id) = other.gambits.keys().chain(other.replies.keys()).find(|id| {
            self.gambits.contains_key(*id) || self.replies.contains_key(*id)
        }) {
            return Err(CompileError::DuplicateId { id: id.to_string() });
        }

        if policy == TopicConflict::Reject {
            if let Some(name) =
                other.topics.keys().find(|name| name.as_str() != RANDOM_TOPIC && self.topics.contains_key(*name))
            {
                return Err(CompileError::DuplicateTopic { name: name.clone() });
            }
        }

        self.gambits.extend(other.gambits);
        self.replies.extend(other.replies);
        for (name, topic) in other.topics {
            match self.topics.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(topic);
                }
                Entry::Occupied(mut slot) => {
                    if slot.key() != RANDOM_TOPIC {
                        warn!(topic = %slot.key(), "topic declared in more than one file; extending");
                    }
                    slot.get_mut().extend_with(topic);
                }
            }
        }
        Ok(())
    }
}
