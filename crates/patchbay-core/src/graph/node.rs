//! Mounted-unit bookkeeping.

use crate::unit::{Capabilities, Unit};

/// A unit together with what the graph learned about it at mount time.
pub(crate) struct MountedUnit {
    pub unit: Unit,
    /// Capabilities of each processor slot, asked once.
    pub caps: Vec<Capabilities>,
    pub permanent: bool,
}

impl MountedUnit {
    pub fn new(unit: Unit, permanent: bool) -> Self {
        let caps = (0..unit.processor_count())
            .map(|slot| unit.processor(slot).capabilities())
            .collect();
        Self {
            unit,
            caps,
            permanent,
        }
    }
}
