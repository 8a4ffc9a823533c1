//! Units: the nodes of a patch.
//!
//! A [`Unit`] bundles an [`Io`] table (named inputs, outputs and properties)
//! with one or more [`Processor`]s. The main processor comes first; each
//! [`OutputProcessor`] exposed through [`Io::expose_output_processor`] follows
//! it and is scheduled independently, so a multi-output unit can skip outputs
//! nobody reads while still sharing one input set.
//!
//! # Processor capabilities
//!
//! Every processor implements [`Processor::process_sample`]. The bulk path
//! ([`Processor::process_frame`]), the processability check
//! ([`Processor::is_processable`]) and resource release ([`Processor::close`])
//! are optional. A processor announces which of them it actually implements
//! through [`Processor::capabilities`]; the graph asks exactly once, at mount
//! time, and dispatches on the cached answer afterwards.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::port::{In, Out};
//! use patchbay_core::unit::{Io, Processor, Unit};
//!
//! struct Double { x: In, out: Out }
//!
//! impl Processor for Double {
//!     fn process_sample(&mut self, i: usize) {
//!         self.out.write(i, self.x.read(i) * 2.0);
//!     }
//! }
//!
//! let mut io = Io::new("double", "twice", 64);
//! let x = io.new_in("x", 0.5);
//! let out = io.new_out("out");
//! let unit = Unit::new(io, Double { x, out });
//! assert_eq!(unit.id().as_str(), "twice");
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::UnitError;
use crate::port::{In, Out};

/// Identifier of a unit, unique within a graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Wraps a string identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Optional processor capabilities, cached by the graph at mount time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `process_frame` is a real bulk implementation.
    pub frame: bool,
    /// `is_processable` may return `false`.
    pub conditional: bool,
    /// `close` releases something.
    pub closes: bool,
}

impl Capabilities {
    /// Sample processing only.
    pub const SAMPLE: Self = Self {
        frame: false,
        conditional: false,
        closes: false,
    };

    /// Sample processing plus a bulk path.
    pub const FRAME: Self = Self {
        frame: true,
        conditional: false,
        closes: false,
    };
}

/// Per-sample signal processing for one unit (or one of its outputs).
pub trait Processor: Send {
    /// Computes sample `i` of the current quantum.
    fn process_sample(&mut self, i: usize);

    /// Computes the first `n` samples of the quantum at once.
    ///
    /// Must be numerically identical to calling
    /// [`process_sample`](Self::process_sample) for `0..n`.
    fn process_frame(&mut self, n: usize) {
        for i in 0..n {
            self.process_sample(i);
        }
    }

    /// Whether the processor should run this quantum.
    fn is_processable(&self) -> bool {
        true
    }

    /// Releases external resources. Called once, when the unit leaves a graph.
    fn close(&mut self) -> Result<(), UnitError> {
        Ok(())
    }

    /// Which optional methods this processor actually implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::SAMPLE
    }
}

/// A processor that owns exactly one output of its unit.
pub trait OutputProcessor: Processor {
    /// The output this processor writes.
    fn out(&self) -> &Out;
}

/// Value of a unit property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Scalar value.
    Number(f64),
    /// Free-form text, e.g. a step pattern.
    Text(String),
    /// List of scalars.
    List(Vec<f64>),
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Validates a candidate property value before it is stored.
pub type PropValidator = fn(&PropValue) -> Result<(), String>;

struct PropShared {
    name: String,
    value: ArcSwap<PropValue>,
    validate: PropValidator,
}

/// Named control value, set from outside audio-rate processing.
///
/// Reads are wait-free, so processors may consult a property every sample.
#[derive(Clone)]
pub struct Prop {
    shared: Arc<PropShared>,
}

impl Prop {
    /// Creates a property accepting any value.
    pub fn new(name: impl Into<String>, value: PropValue) -> Self {
        Self::with_validator(name, value, |_| Ok(()))
    }

    /// Creates a property guarded by `validate`.
    pub fn with_validator(
        name: impl Into<String>,
        value: PropValue,
        validate: PropValidator,
    ) -> Self {
        Self {
            shared: Arc::new(PropShared {
                name: name.into(),
                value: ArcSwap::from_pointee(value),
                validate,
            }),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current value.
    pub fn get(&self) -> PropValue {
        PropValue::clone(&self.shared.value.load())
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&PropValue) -> R) -> R {
        f(&self.shared.value.load())
    }

    /// Validates and stores `value`.
    pub fn set(&self, value: PropValue) -> Result<(), UnitError> {
        (self.shared.validate)(&value).map_err(|reason| UnitError::InvalidProp {
            prop: self.shared.name.clone(),
            reason,
        })?;
        self.shared.value.store(Arc::new(value));
        Ok(())
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("name", &self.shared.name)
            .field("value", &**self.shared.value.load())
            .finish()
    }
}

/// Port and property table of a unit under construction.
pub struct Io {
    id: UnitId,
    type_name: String,
    quantum: usize,
    ins: Vec<In>,
    outs: Vec<Out>,
    props: Vec<Prop>,
    out_processors: Vec<Box<dyn Processor>>,
}

impl Io {
    /// Starts an empty table for unit `id` of type `type_name`.
    pub fn new(type_name: impl Into<String>, id: impl Into<UnitId>, quantum: usize) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            quantum,
            ins: Vec::new(),
            outs: Vec::new(),
            props: Vec::new(),
            out_processors: Vec::new(),
        }
    }

    /// Quantum length the outputs are sized for.
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Unit id.
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// Adds an input and returns a handle to it.
    pub fn new_in(&mut self, name: impl Into<String>, default: f64) -> In {
        let port = In::new(name, default);
        debug_assert!(
            self.ins.iter().all(|p| p.name() != port.name()),
            "duplicate input {}",
            port.name()
        );
        self.ins.push(port.clone());
        port
    }

    /// Adds an output and returns a handle to it.
    pub fn new_out(&mut self, name: impl Into<String>) -> Out {
        let port = Out::new(name, self.quantum);
        debug_assert!(
            self.outs.iter().all(|p| p.name() != port.name()),
            "duplicate output {}",
            port.name()
        );
        self.outs.push(port.clone());
        port
    }

    /// Adds a property and returns a handle to it.
    pub fn new_prop(&mut self, prop: Prop) -> Prop {
        self.props.push(prop.clone());
        prop
    }

    /// Registers an independently scheduled processor for one output.
    ///
    /// The processor's output must come from [`new_out`](Self::new_out) on
    /// this table.
    pub fn expose_output_processor(&mut self, processor: impl OutputProcessor + 'static) {
        debug_assert!(self.outs.iter().any(|o| o.same_port(processor.out())));
        self.out_processors.push(Box::new(processor));
    }
}

/// A processing node: ports, properties and processors.
pub struct Unit {
    id: UnitId,
    type_name: String,
    ins: Vec<In>,
    outs: Vec<Out>,
    props: Vec<Prop>,
    processors: Vec<Box<dyn Processor>>,
}

impl Unit {
    /// Finishes `io` with a main processor.
    pub fn new(io: Io, processor: impl Processor + 'static) -> Self {
        let mut unit = Self::from_io(io);
        unit.processors.insert(0, Box::new(processor));
        unit
    }

    /// Finishes `io` with only its output processors (possibly none).
    pub fn from_io(io: Io) -> Self {
        Self {
            id: io.id,
            type_name: io.type_name,
            ins: io.ins,
            outs: io.outs,
            props: io.props,
            processors: io.out_processors,
        }
    }

    /// Unit id.
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// Builder type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Inputs in declaration order.
    pub fn inputs(&self) -> &[In] {
        &self.ins
    }

    /// Outputs in declaration order.
    pub fn outputs(&self) -> &[Out] {
        &self.outs
    }

    /// Properties in declaration order.
    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    /// Input by name.
    pub fn input(&self, name: &str) -> Option<&In> {
        self.ins.iter().find(|p| p.name() == name)
    }

    /// Output by name.
    pub fn output(&self, name: &str) -> Option<&Out> {
        self.outs.iter().find(|p| p.name() == name)
    }

    /// Property by name.
    pub fn prop(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|p| p.name() == name)
    }

    /// Input by name, or [`UnitError::UnknownInput`].
    pub fn require_input(&self, name: &str) -> Result<&In, UnitError> {
        self.input(name).ok_or_else(|| UnitError::UnknownInput {
            unit: self.id.to_string(),
            port: name.to_owned(),
        })
    }

    /// Output by name, or [`UnitError::UnknownOutput`].
    pub fn require_output(&self, name: &str) -> Result<&Out, UnitError> {
        self.output(name).ok_or_else(|| UnitError::UnknownOutput {
            unit: self.id.to_string(),
            port: name.to_owned(),
        })
    }

    /// Couples input `input` to `source`.
    pub fn patch(&self, input: &str, source: &Out) -> Result<(), UnitError> {
        self.require_input(input)?.couple(source);
        Ok(())
    }

    /// Sets property `name`.
    pub fn set_prop(&self, name: &str, value: PropValue) -> Result<(), UnitError> {
        let prop = self.prop(name).ok_or_else(|| UnitError::UnknownProp {
            unit: self.id.to_string(),
            prop: name.to_owned(),
        })?;
        prop.set(value)
    }

    pub(crate) fn processor_count(&self) -> usize {
        self.processors.len()
    }

    pub(crate) fn processor(&self, slot: usize) -> &dyn Processor {
        &*self.processors[slot]
    }

    pub(crate) fn processor_mut(&mut self, slot: usize) -> &mut dyn Processor {
        &mut *self.processors[slot]
    }

    /// Closes every processor. All are closed even if one fails; the first
    /// error is returned.
    pub fn close(&mut self) -> Result<(), UnitError> {
        let mut first = None;
        for processor in &mut self.processors {
            if let Err(e) = processor.close() {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .field("inputs", &self.ins)
            .field("outputs", &self.outs)
            .field("processors", &self.processors.len())
            .finish()
    }
}
