//! Segment: an ordered run of measures belonging to one voice
//!
//! A voice starts with one segment; repeat structures open further
//! segments. The segment carries the voice identity handle its measures
//! use for context lookups and diagnostics.

use serde::{Deserialize, Serialize};

use crate::measure::{Measure, Ternary};
use crate::voice::VoiceHandle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    number: u32,
    uplink: VoiceHandle,
    measures: Vec<Measure>,
}

impl Segment {
    pub fn new(number: u32, uplink: VoiceHandle) -> Self {
        Segment {
            number,
            uplink,
            measures: Vec::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn uplink(&self) -> &VoiceHandle {
        &self.uplink
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn last_measure(&self) -> Option<&Measure> {
        self.measures.last()
    }

    pub fn last_measure_mut(&mut self) -> Option<&mut Measure> {
        self.measures.last_mut()
    }

    /// Adopt a measure, settling its first-in-segment flag
    pub fn push_measure(&mut self, mut measure: Measure) {
        let first = if self.measures.is_empty() {
            Ternary::Yes
        } else {
            Ternary::No
        };
        measure.set_first_in_segment(first);
        self.measures.push(measure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::WholeNotes;
    use crate::voice::VoiceKind;

    fn make_segment() -> Segment {
        Segment::new(1, VoiceHandle::new("P1", 1, 1, VoiceKind::Regular))
    }

    fn make_measure(number: &str, ordinal: u32) -> Measure {
        Measure::new(
            number,
            ordinal,
            VoiceHandle::new("P1", 1, 1, VoiceKind::Regular),
            WholeNotes::new(1, 1),
            ordinal == 1,
            false,
        )
    }

    #[test]
    fn test_first_in_segment_flag() {
        let mut segment = make_segment();
        segment.push_measure(make_measure("1", 1));
        segment.push_measure(make_measure("2", 2));

        assert_eq!(segment.measures()[0].first_in_segment(), Ternary::Yes);
        assert_eq!(segment.measures()[1].first_in_segment(), Ternary::No);
    }
}
