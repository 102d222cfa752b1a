//! Harmony and figured-bass overlay reconciliation
//!
//! Overlay elements arrive from the source with an offset relative to
//! their anchoring note, in no particular order, and with no explicit
//! duration — each one effectively lasts until the next begins. Once per
//! measure, at finalize time, the overlay is reconciled into a
//! time-contiguous span sequence covering the measure from position zero:
//! gaps are filled with skips, overlaps and overflow are resolved by
//! shrinking the earlier element. The caller's elements are never deleted
//! or reordered beyond the initial position sort, and a duration of zero
//! is never assigned.

use serde::{Deserialize, Serialize};

use crate::duration::{self, WholeNotes};
use crate::elements::{ElementContent, MeasureElement, Note};

use super::Measure;

/// Which overlay element family a reconciliation pass works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    Harmony,
    FiguredBass,
}

impl OverlayKind {
    fn matches(&self, element: &MeasureElement) -> bool {
        match self {
            OverlayKind::Harmony => element.is_harmony(),
            OverlayKind::FiguredBass => element.is_figured_bass(),
        }
    }
}

impl Measure {
    /// Sort the element list by position and walk the overlay elements
    /// pairwise, inserting skips into gaps and shrinking overlaps, then
    /// clamp the last element to the measure capacity.
    pub(crate) fn reconcile_overlay(&mut self, overlay: OverlayKind) {
        let zero = duration::zero();

        // Stable: co-positioned skips and decorations keep their order
        self.elements
            .sort_by(|a, b| a.position_in_measure.cmp(&b.position_in_measure));

        let mut previous: Option<usize> = None;
        let mut index = 0;
        while index < self.elements.len() {
            if !overlay.matches(&self.elements[index]) {
                index += 1;
                continue;
            }
            match previous {
                None => {
                    // Align the overlay with position zero so both the
                    // regular and overlay voices can be walked in lockstep
                    let position = self.elements[index].position_in_measure;
                    if position > zero {
                        self.insert_overlay_skip(index, zero, position);
                        previous = Some(index + 1);
                        index += 2;
                    } else {
                        previous = Some(index);
                        index += 1;
                    }
                }
                Some(prev) => {
                    let prev_end = self.elements[prev].end_position_in_measure();
                    let position = self.elements[index].position_in_measure;
                    let gap = position - prev_end;
                    if gap > zero {
                        self.insert_overlay_skip(index, prev_end, gap);
                        previous = Some(index + 1);
                        index += 2;
                    } else if gap < zero {
                        log::warn!(
                            "measure '{}' in {}: overlay elements overlap by {} at position {}",
                            self.number,
                            self.uplink,
                            -gap,
                            position
                        );
                        self.shrink_overlay_element(prev, -gap);
                        previous = Some(index);
                        index += 1;
                    } else {
                        previous = Some(index);
                        index += 1;
                    }
                }
            }
        }

        // The last element must not extend past the measure capacity
        if let Some(prev) = previous {
            if !duration::is_cadenza_capacity(self.full_whole_notes) {
                let overflow = self.elements[prev].end_position_in_measure() - self.full_whole_notes;
                if overflow > zero {
                    log::warn!(
                        "measure '{}' in {}: last overlay element overflows the measure by {}",
                        self.number,
                        self.uplink,
                        overflow
                    );
                    self.shrink_overlay_element(prev, overflow);
                }
            }
        }
    }

    fn insert_overlay_skip(&mut self, index: usize, position: WholeNotes, length: WholeNotes) {
        let element = self.make_element(position, ElementContent::Note(Note::skip(length)));
        self.elements.insert(index, element);
        // Padding counts toward the running duration
        self.current_whole_notes += length;
    }

    /// Shrink an overlay element's sounding duration, keeping the running
    /// duration consistent. A shrink that would reach zero (or below)
    /// leaves the original duration in place and only warns.
    fn shrink_overlay_element(&mut self, index: usize, by: WholeNotes) {
        let old = self.elements[index].sounding_whole_notes();
        let new = old - by;
        if new <= duration::zero() {
            log::warn!(
                "measure '{}' in {}: shrinking overlay element at position {} by {} would \
                 leave no duration, left unchanged",
                self.number,
                self.uplink,
                self.elements[index].position_in_measure,
                by
            );
            return;
        }
        match &mut self.elements[index].content {
            ElementContent::Harmony(harmony) => harmony.sounding_whole_notes = new,
            ElementContent::FiguredBass(figured_bass) => figured_bass.sounding_whole_notes = new,
            _ => return,
        }
        self.current_whole_notes -= by;
    }
}
