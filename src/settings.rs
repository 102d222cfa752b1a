//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::elements::TimeSignature;

/// Settings shared by every part and voice of a score.
///
/// Cloned into each voice at creation so measure operations never reach
/// back through the containment chain for configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Time signature assumed for measures created before any time
    /// attribute has arrived in the voice
    pub default_time: TimeSignature,

    /// Emit debug-level tracing of measure activity (creation, appends,
    /// padding, finalization)
    pub trace_measures: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            default_time: TimeSignature {
                beats: 4,
                beat_type: 4,
                senza_misura: false,
            },
            trace_measures: false,
        }
    }
}
