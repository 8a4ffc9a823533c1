//! Input and output ports.
//!
//! An [`Out`] owns a quantum-sized sample buffer that its unit writes once per
//! sample index. An [`In`] either reads from a coupled `Out` or, when
//! uncoupled, yields its default value. Both are cheap, cloneable handles: the
//! unit's processors and its [`Io`](crate::unit::Io) table hold clones of the
//! same port.
//!
//! Samples live in relaxed atomics so that ports stay `Send + Sync` and can be
//! built on one thread, shipped inside a control message, and evaluated on the
//! audio thread. Only the audio thread writes samples once a unit is mounted.
//!
//! Coupling is tracked on the `Out` side: [`Out::external_neighbor_count`]
//! reports how many `In` ports currently read from it, which lets multi-output
//! units skip outputs nobody consumes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use arc_swap::ArcSwapOption;

struct OutShared {
    name: String,
    samples: Box<[AtomicU64]>,
    readers: AtomicUsize,
}

impl OutShared {
    #[inline]
    fn load(&self, i: usize) -> f64 {
        f64::from_bits(self.samples[i].load(Ordering::Relaxed))
    }
}

/// Output port: a quantum-sized buffer written by exactly one processor.
#[derive(Clone)]
pub struct Out {
    shared: Arc<OutShared>,
}

impl Out {
    /// Creates an output with a zeroed buffer of `quantum` samples.
    pub fn new(name: impl Into<String>, quantum: usize) -> Self {
        let samples = (0..quantum).map(|_| AtomicU64::new(0)).collect();
        Self {
            shared: Arc::new(OutShared {
                name: name.into(),
                samples,
                readers: AtomicUsize::new(0),
            }),
        }
    }

    /// Port name, unique among the unit's outputs.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Buffer length in samples.
    pub fn len(&self) -> usize {
        self.shared.samples.len()
    }

    /// Returns `true` for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.shared.samples.is_empty()
    }

    /// Writes sample `i` of the current quantum.
    #[inline]
    pub fn write(&self, i: usize, value: f64) {
        self.shared.samples[i].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Reads back sample `i` as last written.
    #[inline]
    pub fn read(&self, i: usize) -> f64 {
        self.shared.load(i)
    }

    /// Number of [`In`] ports currently coupled to this output.
    pub fn external_neighbor_count(&self) -> usize {
        self.shared.readers.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same port.
    pub fn same_port(&self, other: &Out) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Out {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Out")
            .field("name", &self.shared.name)
            .field("len", &self.len())
            .field("readers", &self.external_neighbor_count())
            .finish()
    }
}

struct InShared {
    name: String,
    default: AtomicU64,
    held: AtomicU64,
    source: ArcSwapOption<OutShared>,
}

impl Drop for InShared {
    fn drop(&mut self) {
        if let Some(out) = self.source.swap(None) {
            out.readers.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Input port: reads a coupled [`Out`] or falls back to a default value.
#[derive(Clone)]
pub struct In {
    shared: Arc<InShared>,
}

impl In {
    /// Creates an uncoupled input.
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            shared: Arc::new(InShared {
                name: name.into(),
                default: AtomicU64::new(default.to_bits()),
                held: AtomicU64::new(default.to_bits()),
                source: ArcSwapOption::empty(),
            }),
        }
    }

    /// Port name, unique among the unit's inputs.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Sample `i` of the coupled output, or the default value.
    #[inline]
    pub fn read(&self, i: usize) -> f64 {
        match (*self.shared.source.load()).as_deref() {
            Some(out) => out.load(i),
            None => self.default_value(),
        }
    }

    /// Samples the input at `i == 0` and holds that value for the rest of the
    /// quantum.
    #[inline]
    pub fn read_slow(&self, i: usize) -> f64 {
        if i == 0 {
            let v = self.read(0);
            self.shared.held.store(v.to_bits(), Ordering::Relaxed);
            v
        } else {
            f64::from_bits(self.shared.held.load(Ordering::Relaxed))
        }
    }

    /// Value read while uncoupled.
    pub fn default_value(&self) -> f64 {
        f64::from_bits(self.shared.default.load(Ordering::Relaxed))
    }

    /// Replaces the value read while uncoupled.
    pub fn set_default(&self, value: f64) {
        self.shared.default.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Reads from `out` from now on, releasing any previous source.
    pub fn couple(&self, out: &Out) {
        out.shared.readers.fetch_add(1, Ordering::AcqRel);
        if let Some(prev) = self.shared.source.swap(Some(Arc::clone(&out.shared))) {
            prev.readers.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Reverts to the default value. Returns `true` if the input was coupled.
    pub fn decouple(&self) -> bool {
        match self.shared.source.swap(None) {
            Some(prev) => {
                prev.readers.fetch_sub(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    /// Whether a source output is coupled.
    pub fn is_coupled(&self) -> bool {
        self.shared.source.load().is_some()
    }

    /// Whether this input currently reads from `out`.
    pub fn is_coupled_to(&self, out: &Out) -> bool {
        (*self.shared.source.load())
            .as_ref()
            .is_some_and(|src| Arc::ptr_eq(src, &out.shared))
    }
}

impl fmt::Debug for In {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("In")
            .field("name", &self.shared.name)
            .field("default", &self.default_value())
            .field("coupled", &self.is_coupled())
            .finish()
    }
}
