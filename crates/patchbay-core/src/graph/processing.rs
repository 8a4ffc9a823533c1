//! Graph mutation API and per-quantum evaluation.

use std::collections::HashMap;

use thiserror::Error;

use crate::error::UnitError;
use crate::unit::{PropValue, Unit, UnitId};

use super::node::MountedUnit;
use super::schedule::Schedule;

/// Errors returned by graph mutations. The topology is unchanged when one is
/// returned.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A unit with this id is already mounted.
    #[error("unit '{0}' is already mounted")]
    DuplicateId(UnitId),
    /// No unit with this id is mounted.
    #[error("unit '{0}' is not mounted")]
    NotFound(UnitId),
    /// The unit belongs to the permanent baseline.
    #[error("unit '{0}' is permanent and cannot be removed")]
    Permanent(UnitId),
    /// The unit's output buffers are shorter than the graph quantum.
    #[error("unit '{unit}' has {found}-sample outputs but the quantum is {expected}")]
    QuantumMismatch {
        /// Offending unit.
        unit: UnitId,
        /// Graph quantum.
        expected: usize,
        /// Shortest output buffer found.
        found: usize,
    },
    /// Port or property addressing failed.
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// The graph stopped being evaluated before the command was applied.
    #[error("command discarded: the graph is no longer running")]
    Discarded,
}

/// What an input should read after a patch.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    /// Decouple and read a constant.
    Value(f64),
    /// Read another unit's output.
    Out {
        /// Producing unit.
        unit: UnitId,
        /// Output name on that unit.
        output: String,
    },
}

/// Mounted units, their registration order and the cached schedule.
pub struct Graph {
    quantum: usize,
    nodes: Vec<MountedUnit>,
    index: HashMap<UnitId, usize>,
    schedule: Schedule,
    generation: u64,
}

impl Graph {
    /// Creates an empty graph evaluating quanta of at most `quantum` samples.
    pub fn new(quantum: usize) -> Self {
        Self {
            quantum,
            nodes: Vec::new(),
            index: HashMap::new(),
            schedule: Schedule::default(),
            generation: 0,
        }
    }

    /// Maximum quantum length.
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Number of mounted units, permanent ones included.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Number of permanent units.
    pub fn permanent_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.permanent).count()
    }

    /// Incremented on every mount, unmount, clear and patch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The cached evaluation order.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Whether a unit with this id is mounted.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Mounted unit by id.
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.index.get(id).map(|&idx| &self.nodes[idx].unit)
    }

    /// Unit ids in evaluation order.
    pub fn ids(&self) -> impl Iterator<Item = &UnitId> {
        self.nodes.iter().map(|n| n.unit.id())
    }

    /// Mounts `unit` at the end of the evaluation order.
    pub fn mount(&mut self, unit: Unit) -> Result<(), GraphError> {
        self.insert(unit, false)
    }

    /// Mounts `unit` as part of the baseline that survives
    /// [`clear`](Self::clear) and refuses [`unmount`](Self::unmount).
    pub fn mount_permanent(&mut self, unit: Unit) -> Result<(), GraphError> {
        self.insert(unit, true)
    }

    fn insert(&mut self, unit: Unit, permanent: bool) -> Result<(), GraphError> {
        if self.index.contains_key(unit.id()) {
            return Err(GraphError::DuplicateId(unit.id().clone()));
        }
        if let Some(short) = unit.outputs().iter().find(|o| o.len() < self.quantum) {
            return Err(GraphError::QuantumMismatch {
                unit: unit.id().clone(),
                expected: self.quantum,
                found: short.len(),
            });
        }

        tracing::debug!(unit = %unit.id(), kind = unit.type_name(), permanent, "mount");
        self.index.insert(unit.id().clone(), self.nodes.len());
        self.nodes.push(MountedUnit::new(unit, permanent));
        self.structure_changed();
        Ok(())
    }

    /// Removes a unit and hands it back.
    ///
    /// Inputs elsewhere that read the unit's outputs revert to their default
    /// values, and the unit's own inputs are decoupled.
    pub fn unmount(&mut self, id: &str) -> Result<Unit, GraphError> {
        let Some(&idx) = self.index.get(id) else {
            return Err(GraphError::NotFound(id.into()));
        };
        if self.nodes[idx].permanent {
            return Err(GraphError::Permanent(id.into()));
        }

        let removed = self.nodes.remove(idx).unit;
        self.detach(&removed);
        tracing::debug!(unit = %removed.id(), "unmount");
        self.structure_changed();
        Ok(removed)
    }

    /// Removes every non-permanent unit and returns them in evaluation order.
    pub fn clear(&mut self) -> Vec<Unit> {
        let (keep, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| n.permanent);
        self.nodes = keep;

        let removed: Vec<Unit> = dropped.into_iter().map(|n| n.unit).collect();
        for unit in &removed {
            self.detach(unit);
        }
        tracing::debug!(removed = removed.len(), "clear");
        self.structure_changed();
        removed
    }

    /// Rewires one input.
    pub fn patch(&mut self, unit: &str, input: &str, source: &Source) -> Result<(), GraphError> {
        let target = self.require(unit)?.require_input(input)?;
        match source {
            Source::Value(v) => {
                target.decouple();
                target.set_default(*v);
            }
            Source::Out {
                unit: producer,
                output,
            } => {
                let out = self.require(producer.as_str())?.require_output(output)?;
                target.couple(out);
            }
        }
        tracing::debug!(unit, input, ?source, "patch");
        self.generation += 1;
        Ok(())
    }

    /// Sets a property on a mounted unit.
    pub fn set_prop(&self, unit: &str, prop: &str, value: PropValue) -> Result<(), GraphError> {
        self.require(unit)?.set_prop(prop, value)?;
        Ok(())
    }

    /// Evaluates one quantum of `n` samples, sample-major.
    pub fn evaluate(&mut self, n: usize) {
        debug_assert!(n <= self.quantum, "quantum overrun: {n} > {}", self.quantum);
        let n = n.min(self.quantum);
        let Self {
            nodes, schedule, ..
        } = self;
        schedule.refresh(&*nodes);

        for i in 0..n {
            for entry in schedule.active() {
                nodes[entry.node]
                    .unit
                    .processor_mut(entry.slot)
                    .process_sample(i);
            }
        }
    }

    /// Evaluates one quantum of `n` samples, unit-major.
    ///
    /// Produces the same samples as [`evaluate`](Self::evaluate).
    pub fn evaluate_frame(&mut self, n: usize) {
        debug_assert!(n <= self.quantum, "quantum overrun: {n} > {}", self.quantum);
        let n = n.min(self.quantum);
        let Self {
            nodes, schedule, ..
        } = self;
        schedule.refresh(&*nodes);

        for entry in schedule.active() {
            let processor = nodes[entry.node].unit.processor_mut(entry.slot);
            if entry.caps.frame {
                processor.process_frame(n);
            } else {
                for i in 0..n {
                    processor.process_sample(i);
                }
            }
        }
    }

    fn require(&self, id: &str) -> Result<&Unit, GraphError> {
        self.unit(id).ok_or_else(|| GraphError::NotFound(id.into()))
    }

    fn detach(&self, removed: &Unit) {
        for input in removed.inputs() {
            input.decouple();
        }
        for node in &self.nodes {
            for input in node.unit.inputs() {
                if removed.outputs().iter().any(|out| input.is_coupled_to(out)) {
                    input.decouple();
                }
            }
        }
    }

    fn structure_changed(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.unit.id().clone(), idx))
            .collect();
        self.schedule = Schedule::build(&self.nodes);
        self.generation += 1;
    }
}
