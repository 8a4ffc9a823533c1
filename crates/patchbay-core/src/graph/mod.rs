//! Live-patchable unit graph.
//!
//! [`Graph`] holds the mounted [`Unit`](crate::unit::Unit)s, a permanent
//! baseline that can never be unmounted, and a cached [`Schedule`] of
//! processor entries. It is owned by whichever thread renders audio; other
//! threads reach it only through the engine's control messages.
//!
//! # Evaluation order
//!
//! Units are evaluated in registration order. Mounting appends, unmounting
//! removes in place, and rewiring never reorders. There is no topological
//! sort: cycles are legal and never broken. When a unit reads an output whose
//! producer is scheduled later, it sees the value the producer wrote at the
//! same index during the previous quantum, so every back-edge carries exactly
//! one quantum of delay and never uninitialised data.
//!
//! # Strategies
//!
//! [`Graph::evaluate`] is sample-major: for every sample index it visits each
//! entry in order. [`Graph::evaluate_frame`] is unit-major: each entry
//! processes the whole quantum before the next one starts. Because forward
//! edges read the current quantum and back-edges the previous one in both
//! cases, the two strategies produce identical samples.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::graph::{Graph, Source};
//! use patchbay_core::units::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::new(48_000, 64);
//! let mut graph = Graph::new(64);
//! graph.mount(registry.build("adjust", "amp", json!({})).unwrap()).unwrap();
//! graph.patch("amp", "in", &Source::Value(0.5)).unwrap();
//! graph.evaluate(64);
//!
//! let out = graph.unit("amp").unwrap().output("out").unwrap();
//! assert_eq!(out.read(63), 0.5);
//! ```

mod node;
mod processing;
pub mod schedule;

pub use processing::{Graph, GraphError, Source};
pub use schedule::{Entry, Schedule};
