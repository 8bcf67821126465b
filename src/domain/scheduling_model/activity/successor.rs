use std::collections::HashMap;

use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::scheduling_model::utils::handles::ActivityId;

/// A resolved predecessor -> successor dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessorLink {
    pub predecessor: ActivityId,
    pub successor: ActivityId,

    /// Maximum gap between the predecessor's end and the successor's start.
    /// `None` means the link carries no continuity constraint.
    pub max_delay: Option<Ticks>,
}

impl SuccessorLink {
    /// Latest start of the successor when the predecessor ends at `predecessor_end`.
    pub fn max_start(&self, predecessor_end: Ticks) -> Option<Ticks> {
        self.max_delay.map(|delay| predecessor_end.saturating_add(delay))
    }
}

/// Immutable index of successor links, produced once by link resolution after a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessorIndex {
    successors: HashMap<ActivityId, Vec<SuccessorLink>>,
    predecessors: HashMap<ActivityId, Vec<SuccessorLink>>,
}

impl SuccessorIndex {
    pub fn from_links(links: impl IntoIterator<Item = SuccessorLink>) -> Self {
        let mut index = SuccessorIndex::default();
        for link in links {
            index.successors.entry(link.predecessor).or_default().push(link);
            index.predecessors.entry(link.successor).or_default().push(link);
        }
        index
    }

    pub fn successors_of(&self, activity: ActivityId) -> &[SuccessorLink] {
        self.successors.get(&activity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors_of(&self, activity: ActivityId) -> &[SuccessorLink] {
        self.predecessors.get(&activity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.successors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuccessorLink> {
        self.successors.values().flatten()
    }
}
