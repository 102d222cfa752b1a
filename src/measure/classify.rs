//! Measure classification and purist numbering
//!
//! Runs once per measure at finalize time. The decision needs voice-level
//! running state: consecutive incomplete measures accumulate their
//! durations, and the accumulation resets every time a measure ends on a
//! regular boundary. Two half measures in 4/4 are thereby jointly
//! recognized as one regular boundary without either reaching the full
//! length alone.
//!
//! Purist numbers follow traditional printed numbering: the voice counter
//! advances exactly when a measure's end is a regular boundary; an
//! anacrusis is forced to 0 and leaves the counter untouched.

use serde::{Deserialize, Serialize};

use crate::duration;
use crate::elements::ElementContent;
use crate::voice::VoiceTiming;

use super::{Finalization, Measure, Ternary};

/// What a measure turned out to be, decided at finalize time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureKind {
    Unknown,
    /// Fills its time signature exactly
    Regular,
    /// Short first measure of the voice: a pickup, not an error
    Anacrusis,
    /// Short measure outside any repeat structure
    IncompleteStandalone,
    /// Short measure closing a repeat's common part
    IncompleteLastInRepeatCommonPart,
    /// Short measure closing a hooked repeat ending
    IncompleteLastInRepeatHookedEnding,
    /// Short measure closing a hookless repeat ending
    IncompleteLastInRepeatHooklessEnding,
    /// Short measure right after a repeat's common part
    IncompleteNextMeasureAfterCommonPart,
    /// Short measure right after a hooked repeat ending
    IncompleteNextMeasureAfterHookedEnding,
    /// Short measure right after a hookless repeat ending
    IncompleteNextMeasureAfterHooklessEnding,
    /// Holds more than its time signature allows
    Overcomplete,
    /// No duration-bearing content at all
    MusicallyEmpty,
    /// Senza misura: unbounded capacity
    Cadenza,
}

impl MeasureKind {
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            MeasureKind::IncompleteStandalone
                | MeasureKind::IncompleteLastInRepeatCommonPart
                | MeasureKind::IncompleteLastInRepeatHookedEnding
                | MeasureKind::IncompleteLastInRepeatHooklessEnding
                | MeasureKind::IncompleteNextMeasureAfterCommonPart
                | MeasureKind::IncompleteNextMeasureAfterHookedEnding
                | MeasureKind::IncompleteNextMeasureAfterHooklessEnding
        )
    }
}

/// The measure's role relative to an enclosing repeat, supplied by the
/// repeats-handling pass. Refines which incomplete kind a short measure
/// gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureRepeatContext {
    None,
    CommonPartLastMeasure,
    HookedEndingLastMeasure,
    HooklessEndingLastMeasure,
    NextMeasureAfterCommonPart,
    NextMeasureAfterHookedEnding,
    NextMeasureAfterHooklessEnding,
}

fn incomplete_kind_for(context: MeasureRepeatContext) -> MeasureKind {
    match context {
        MeasureRepeatContext::None => MeasureKind::IncompleteStandalone,
        MeasureRepeatContext::CommonPartLastMeasure => {
            MeasureKind::IncompleteLastInRepeatCommonPart
        }
        MeasureRepeatContext::HookedEndingLastMeasure => {
            MeasureKind::IncompleteLastInRepeatHookedEnding
        }
        MeasureRepeatContext::HooklessEndingLastMeasure => {
            MeasureKind::IncompleteLastInRepeatHooklessEnding
        }
        MeasureRepeatContext::NextMeasureAfterCommonPart => {
            MeasureKind::IncompleteNextMeasureAfterCommonPart
        }
        MeasureRepeatContext::NextMeasureAfterHookedEnding => {
            MeasureKind::IncompleteNextMeasureAfterHookedEnding
        }
        MeasureRepeatContext::NextMeasureAfterHooklessEnding => {
            MeasureKind::IncompleteNextMeasureAfterHooklessEnding
        }
    }
}

impl Measure {
    /// Classify this measure and stamp its purist number. Runs exactly
    /// once; a second invocation is an internal error, logged and
    /// tolerated without changing the already-set state.
    pub(crate) fn determine_kind_and_purist_number(
        &mut self,
        context: MeasureRepeatContext,
        timing: &mut VoiceTiming,
    ) {
        if self.finalization.is_some() {
            log::error!(
                "measure '{}' in {}: kind and purist number determined twice, kept as set",
                self.number,
                self.uplink
            );
            return;
        }

        let full = self.full_whole_notes;
        let current = self.current_whole_notes;
        let zero = duration::zero();

        let (kind, ends_regular) = if duration::is_cadenza_capacity(full) {
            (MeasureKind::Cadenza, true)
        } else if current == zero {
            (MeasureKind::MusicallyEmpty, true)
        } else if current == full {
            (MeasureKind::Regular, true)
        } else if current < full {
            if self.first_in_voice {
                (MeasureKind::Anacrusis, true)
            } else {
                // Consecutive incomplete measures sum toward one regular
                // boundary; the one that reaches it ends the boundary.
                let cumulative = timing.whole_notes_since_last_regular_measure_end + current;
                (incomplete_kind_for(context), cumulative >= full)
            }
        } else {
            (MeasureKind::Overcomplete, true)
        };

        let purist_number = if kind == MeasureKind::Anacrusis {
            timing.whole_notes_since_last_regular_measure_end = zero;
            0
        } else if ends_regular {
            timing.current_purist_number += 1;
            timing.whole_notes_since_last_regular_measure_end = zero;
            timing.current_purist_number
        } else {
            timing.whole_notes_since_last_regular_measure_end += current;
            timing.current_purist_number
        };

        self.end_regular = if ends_regular { Ternary::Yes } else { Ternary::No };
        self.flag_full_measure_note();
        self.set_finalization(Finalization {
            kind,
            purist_number,
        });

        if self.trace {
            log::debug!(
                "measure '{}' in {}: classified {:?}, purist {}",
                self.number,
                self.uplink,
                kind,
                purist_number
            );
        }
    }

    /// A single note whose sounding duration equals the full measure
    /// length is flagged for downstream full-measure rendering.
    fn flag_full_measure_note(&mut self) {
        let Some((id, _)) = self.longest_note else {
            return;
        };
        let full = self.full_whole_notes;
        if let Some(element) = self.elements.iter_mut().find(|e| e.id == id) {
            if element.sounding_whole_notes() == full {
                if let ElementContent::Note(note) = &mut element.content {
                    note.occupies_full_measure = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::WholeNotes;
    use crate::elements::{Note, Pitch};
    use crate::voice::{VoiceHandle, VoiceKind};

    fn make_measure(number: &str, ordinal: u32, first: bool) -> Measure {
        Measure::new(
            number,
            ordinal,
            VoiceHandle::new("P1", 1, 1, VoiceKind::Regular),
            WholeNotes::new(1, 1),
            first,
            false,
        )
    }

    fn note(duration: WholeNotes) -> Note {
        Note::pitched(Pitch::new(0, 0, 4), duration)
    }

    #[test]
    fn test_first_short_measure_is_anacrusis() {
        // one 3/4 note in a 4/4 measure at the very start of the voice
        let mut timing = VoiceTiming::default();
        let mut measure = make_measure("1", 1, true);
        measure.append_note_or_padding(note(WholeNotes::new(3, 4)));

        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(measure.kind(), MeasureKind::Anacrusis);
        assert_eq!(measure.purist_number(), Some(0));
        assert_eq!(measure.end_regular(), Ternary::Yes);
        assert_eq!(timing.current_purist_number, 0);
    }

    #[test]
    fn test_exactly_full_measure_is_regular() {
        let mut timing = VoiceTiming::default();
        let mut measure = make_measure("1", 1, true);
        measure.append_note_or_padding(note(WholeNotes::new(1, 2)));
        measure.append_note_or_padding(note(WholeNotes::new(1, 2)));

        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(measure.kind(), MeasureKind::Regular);
        assert_eq!(measure.current_whole_notes(), measure.full_whole_notes());
        assert_eq!(measure.end_regular(), Ternary::Yes);
        assert_eq!(measure.purist_number(), Some(1));
        assert_eq!(timing.current_purist_number, 1);
    }

    #[test]
    fn test_incomplete_pair_counts_as_one_boundary() {
        let mut timing = VoiceTiming::default();
        // a regular measure first, so neither half is an anacrusis
        let mut opening = make_measure("1", 1, true);
        opening.append_note_or_padding(note(WholeNotes::new(1, 1)));
        opening.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);
        assert_eq!(timing.current_purist_number, 1);

        let mut first_half = make_measure("2", 2, false);
        first_half.append_note_or_padding(note(WholeNotes::new(1, 2)));
        first_half.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(first_half.kind(), MeasureKind::IncompleteStandalone);
        assert_eq!(first_half.end_regular(), Ternary::No);
        assert_eq!(first_half.purist_number(), Some(1));
        assert_eq!(
            timing.whole_notes_since_last_regular_measure_end,
            WholeNotes::new(1, 2)
        );

        let mut second_half = make_measure("2a", 3, false);
        second_half.append_note_or_padding(note(WholeNotes::new(1, 2)));
        second_half.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(second_half.kind(), MeasureKind::IncompleteStandalone);
        assert_eq!(second_half.end_regular(), Ternary::Yes);
        // incremented once for the pair
        assert_eq!(second_half.purist_number(), Some(2));
        assert_eq!(
            timing.whole_notes_since_last_regular_measure_end,
            crate::duration::zero()
        );
    }

    #[test]
    fn test_empty_measure() {
        let mut timing = VoiceTiming::default();
        let mut measure = make_measure("1", 1, true);
        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(measure.kind(), MeasureKind::MusicallyEmpty);
        assert_eq!(measure.purist_number(), Some(1));
    }

    #[test]
    fn test_overfull_measure() {
        let mut timing = VoiceTiming::default();
        let mut measure = make_measure("1", 1, true);
        measure.append_note_or_padding(note(WholeNotes::new(5, 4)));

        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(measure.kind(), MeasureKind::Overcomplete);
        assert_eq!(measure.end_regular(), Ternary::Yes);
    }

    #[test]
    fn test_senza_misura_measure_is_cadenza() {
        let mut timing = VoiceTiming::default();
        let mut measure = Measure::new(
            "1",
            1,
            VoiceHandle::new("P1", 1, 1, VoiceKind::Regular),
            crate::duration::cadenza_capacity(),
            true,
            false,
        );
        measure.append_note_or_padding(note(WholeNotes::new(7, 4)));

        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        assert_eq!(measure.kind(), MeasureKind::Cadenza);
        assert_eq!(measure.end_regular(), Ternary::Yes);
    }

    #[test]
    fn test_repeat_context_selects_incomplete_subtype() {
        let cases = [
            (
                MeasureRepeatContext::CommonPartLastMeasure,
                MeasureKind::IncompleteLastInRepeatCommonPart,
            ),
            (
                MeasureRepeatContext::HookedEndingLastMeasure,
                MeasureKind::IncompleteLastInRepeatHookedEnding,
            ),
            (
                MeasureRepeatContext::HooklessEndingLastMeasure,
                MeasureKind::IncompleteLastInRepeatHooklessEnding,
            ),
            (
                MeasureRepeatContext::NextMeasureAfterCommonPart,
                MeasureKind::IncompleteNextMeasureAfterCommonPart,
            ),
            (
                MeasureRepeatContext::NextMeasureAfterHookedEnding,
                MeasureKind::IncompleteNextMeasureAfterHookedEnding,
            ),
            (
                MeasureRepeatContext::NextMeasureAfterHooklessEnding,
                MeasureKind::IncompleteNextMeasureAfterHooklessEnding,
            ),
        ];
        for (context, expected) in cases {
            let mut timing = VoiceTiming::default();
            let mut measure = make_measure("8", 8, false);
            measure.append_note_or_padding(note(WholeNotes::new(1, 4)));
            measure.determine_kind_and_purist_number(context, &mut timing);
            assert_eq!(measure.kind(), expected, "context {:?}", context);
        }
    }

    #[test]
    fn test_second_classification_changes_nothing() {
        let mut timing = VoiceTiming::default();
        let mut measure = make_measure("1", 1, true);
        measure.append_note_or_padding(note(WholeNotes::new(1, 1)));
        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        let kind = measure.kind();
        let purist = measure.purist_number();

        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);
        assert_eq!(measure.kind(), kind);
        assert_eq!(measure.purist_number(), purist);
        // the counter was not advanced a second time
        assert_eq!(timing.current_purist_number, 1);
    }

    #[test]
    fn test_full_measure_note_is_flagged() {
        let mut timing = VoiceTiming::default();
        let mut measure = make_measure("1", 1, true);
        measure.append_note_or_padding(note(WholeNotes::new(1, 1)));
        measure.determine_kind_and_purist_number(MeasureRepeatContext::None, &mut timing);

        let ElementContent::Note(placed) = &measure.elements()[0].content else {
            panic!("expected a note");
        };
        assert!(placed.occupies_full_measure);
    }
}
