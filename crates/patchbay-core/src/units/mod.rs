//! Built-in unit library and the type-name registry.
//!
//! A [`Registry`] maps type names to [`Builder`] functions. A builder
//! receives a fresh [`Io`] table sized for the registry's quantum plus a
//! [`Config`] carrying the caller's JSON values, and returns a ready-to-mount
//! [`Unit`].
//!
//! | Type | Inputs | Outputs |
//! |------|--------|---------|
//! | `abs` `bipolar` `ceil` `floor` `invert` `not` `noop` `unipolar` | `x` | `out` |
//! | `sum` `diff` `mult` `div` `mod` `min` `max` `and` `or` `xor` `imply` `nand` `nor` `xnor` `gt` `lt` | `x` `y` | `out` |
//! | `adjust` | `in` `gain` `offset` | `out` |
//! | `follow` | `in` `rise` `fall` | `out` |
//! | `toggle` | `trigger` | `out` |
//! | `mux` | `select` `0`..`size` | `out` |
//! | `xfeed` | `a` `b` `amount` | `a` `b` |
//! | `val-gate` | `in` | `out` |
//! | `step` | `in` `advance` `reset`, prop `serie` | `out` |
//! | `midi-hz` | `in` | `out` |
//! | `low-gen` `gen` | `freq` `amp` `pulse-width` `offset` `sync` | `sine` `triangle` `pulse` `saw` |
//! | `record` | `in` `record` `reset` | `out` `position` |

mod adjust;
mod follow;
mod low_gen;
mod math;
mod midi_hz;
mod mux;
mod record;
mod step;
mod toggle;
mod val_gate;
mod xfeed;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::UnitError;
use crate::pitch::PitchTable;
use crate::unit::{Io, Unit, UnitId};

/// Builds a unit of one type.
pub type Builder = fn(Io, &Config) -> Result<Unit, UnitError>;

/// Construction context handed to a [`Builder`].
#[derive(Debug, Clone)]
pub struct Config {
    values: Value,
    sample_rate: u32,
    quantum: usize,
    pitches: Arc<PitchTable>,
}

impl Config {
    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Quantum length in samples.
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Shared MIDI note table.
    pub fn pitches(&self) -> &Arc<PitchTable> {
        &self.pitches
    }

    /// Decodes the caller's values into `T`. Missing keys are left to `T`'s
    /// serde defaults.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, UnitError> {
        Ok(serde_json::from_value(self.values.clone())?)
    }
}

/// Type-name to builder map.
pub struct Registry {
    builders: BTreeMap<&'static str, Builder>,
    sample_rate: u32,
    quantum: usize,
    pitches: Arc<PitchTable>,
}

impl Registry {
    /// Registry with every built-in unit type.
    pub fn new(sample_rate: u32, quantum: usize) -> Self {
        let mut registry = Self::empty(sample_rate, quantum);
        math::register(&mut registry);
        registry.register("adjust", adjust::build);
        registry.register("follow", follow::build);
        registry.register("gen", low_gen::build_audio);
        registry.register("low-gen", low_gen::build);
        registry.register("midi-hz", midi_hz::build);
        registry.register("mux", mux::build);
        registry.register("record", record::build);
        registry.register("step", step::build);
        registry.register("toggle", toggle::build);
        registry.register("val-gate", val_gate::build);
        registry.register("xfeed", xfeed::build);
        registry
    }

    /// Registry without any unit types.
    pub fn empty(sample_rate: u32, quantum: usize) -> Self {
        Self {
            builders: BTreeMap::new(),
            sample_rate,
            quantum,
            pitches: Arc::new(PitchTable::default()),
        }
    }

    /// Adds or replaces a builder.
    pub fn register(&mut self, type_name: &'static str, builder: Builder) {
        self.builders.insert(type_name, builder);
    }

    /// Whether `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.builders.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }

    /// Quantum the built units are sized for.
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Builds unit `id` of type `type_name` from JSON `values`.
    ///
    /// `values` may be `null` or an object.
    pub fn build(
        &self,
        type_name: &str,
        id: impl Into<UnitId>,
        values: Value,
    ) -> Result<Unit, UnitError> {
        let (&name, builder) = self
            .builders
            .get_key_value(type_name)
            .ok_or_else(|| UnitError::UnknownType(type_name.to_owned()))?;
        let values = match values {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let config = Config {
            values,
            sample_rate: self.sample_rate,
            quantum: self.quantum,
            pitches: Arc::clone(&self.pitches),
        };
        let unit = builder(Io::new(name, id, self.quantum), &config)?;
        tracing::debug!(unit = %unit.id(), kind = name, "built unit");
        Ok(unit)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.builders.keys().collect::<Vec<_>>())
            .field("sample_rate", &self.sample_rate)
            .field("quantum", &self.quantum)
            .finish()
    }
}
