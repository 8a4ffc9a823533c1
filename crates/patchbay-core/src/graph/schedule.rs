//! Cached evaluation order.
//!
//! A [`Schedule`] is a flat list of [`Entry`]s, one per processor slot of every
//! mounted unit, in registration order. It is rebuilt after each mount,
//! unmount or clear and otherwise left alone; evaluation only flips the
//! per-entry `active` flag once per quantum.

use crate::unit::Capabilities;

use super::node::MountedUnit;

/// One schedulable processor.
#[derive(Clone, Copy, Debug)]
pub struct Entry {
    /// Index of the unit in registration order.
    pub node: usize,
    /// Processor slot within the unit (0 is the main processor when present).
    pub slot: usize,
    /// Capabilities cached at mount.
    pub caps: Capabilities,
    /// Whether the processor runs in the current quantum.
    pub active: bool,
}

/// Linear evaluation order over every processor in the graph.
#[derive(Debug, Default)]
pub struct Schedule {
    entries: Vec<Entry>,
}

impl Schedule {
    pub(crate) fn build(nodes: &[MountedUnit]) -> Self {
        let entries = nodes
            .iter()
            .enumerate()
            .flat_map(|(node, mounted)| {
                mounted
                    .caps
                    .iter()
                    .enumerate()
                    .map(move |(slot, &caps)| Entry {
                        node,
                        slot,
                        caps,
                        active: true,
                    })
            })
            .collect();
        Self { entries }
    }

    /// Samples processability for the coming quantum.
    pub(crate) fn refresh(&mut self, nodes: &[MountedUnit]) {
        for entry in &mut self.entries {
            entry.active = !entry.caps.conditional
                || nodes[entry.node].unit.processor(entry.slot).is_processable();
        }
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.active)
    }

    /// All entries in evaluation order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
