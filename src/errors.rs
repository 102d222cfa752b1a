//! Error types for the measure engine
//!
//! Two disjoint severities: hard internal errors (contract violations by
//! the caller, surfaced as `Err` values and meant to abort the current
//! translation upstream) and data-quality warnings (inconsistencies in
//! the source material, reported through `log::warn!` with best-effort
//! recovery, never aborting the run).

use thiserror::Error;

use crate::elements::ElementId;

/// Hard internal errors: the caller's own bookkeeping is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasureError {
    /// Removal was requested for an element the measure never contained
    #[error("element {id:?} not found in measure '{measure_number}'")]
    ElementNotFound {
        id: ElementId,
        measure_number: String,
    },

    /// An operation needed an open measure but the voice has none
    #[error("voice {voice} has no open measure")]
    NoOpenMeasure { voice: String },

    /// A part/staff/voice lookup failed
    #[error("unknown {what} '{which}'")]
    UnknownContext { what: &'static str, which: String },
}
