//! patchbay core: the live-patchable unit graph.
//!
//! This crate holds everything that runs inside one audio quantum. It has no
//! notion of devices or threads; `patchbay-io` wraps it in an engine that
//! talks to a backend and accepts control messages.
//!
//! # Core abstractions
//!
//! - [`In`] / [`Out`] - ports. An `Out` owns a quantum-sized buffer; an `In`
//!   reads a coupled `Out` or its default value.
//! - [`Processor`] - per-sample processing, with optional bulk, conditional
//!   and close capabilities declared through [`Capabilities`].
//! - [`Unit`] - a node: ports, properties and one or more processors.
//! - [`Graph`] - mounted units in registration order, a permanent baseline,
//!   and per-quantum evaluation that tolerates cycles.
//! - [`Registry`] - type name to builder map over the built-in unit library.
//!
//! # DSP helpers
//!
//! - [`Follow`] - envelope follower
//! - [`PitchTable`] - MIDI note to Hz
//! - [`PcmWriter`] - raw little-endian `f64` writer
//! - [`math`] - gates, triggers and level conversions
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{Graph, Registry, Source};
//! use serde_json::json;
//!
//! let registry = Registry::new(48_000, 128);
//! let mut graph = Graph::new(128);
//!
//! graph.mount(registry.build("low-gen", "lfo", json!({})).unwrap()).unwrap();
//! graph.mount(registry.build("adjust", "vca", json!({})).unwrap()).unwrap();
//! graph
//!     .patch("vca", "gain", &Source::Out { unit: "lfo".into(), output: "sine".into() })
//!     .unwrap();
//!
//! graph.evaluate(128);
//! assert_eq!(graph.size(), 2);
//! ```

pub mod envelope;
pub mod error;
pub mod graph;
pub mod math;
pub mod pcm;
pub mod pitch;
pub mod port;
pub mod unit;
pub mod units;

pub use envelope::Follow;
pub use error::UnitError;
pub use graph::{Graph, GraphError, Source};
pub use pcm::PcmWriter;
pub use pitch::PitchTable;
pub use port::{In, Out};
pub use unit::{
    Capabilities, Io, OutputProcessor, Processor, Prop, PropValue, Unit, UnitId,
};
pub use units::{Builder, Config, Registry};
