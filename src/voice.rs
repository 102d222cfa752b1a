//! Voice: one melodic or overlay line and its timeline state
//!
//! The voice owns its segments and the running counters that measure
//! classification consults: the measure ordinal, the purist counter, the
//! whole notes accumulated since the last regular measure end, and the
//! absolute position in the voice. Measures never reach back through
//! owning pointers for this state; the voice hands it to them explicitly
//! when finalizing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::duration::{self, WholeNotes};
use crate::elements::{
    BarlineKind, Chord, ClefKind, DoubleTremolo, ElementId, FiguredBass, Harmony, KeySignature,
    Note, Tempo, TimeSignature, Tuplet,
};
use crate::errors::MeasureError;
use crate::measure::{Measure, MeasureRepeatContext};
use crate::part::PartMeasureTable;
use crate::segment::Segment;
use crate::settings::EngineSettings;

/// Behavioral kind of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceKind {
    /// Carries sounding notes
    Regular,
    /// Chord-symbol overlay sharing a part with a regular voice
    Harmony,
    /// Figured-bass overlay sharing a part with a regular voice
    FiguredBass,
}

/// Non-owning identification of a voice: enough context to find it in
/// the score and to label diagnostics, never a lifetime-bearing link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceHandle {
    pub part_id: String,
    pub staff_number: u16,
    pub voice_number: u16,
    pub kind: VoiceKind,
}

impl VoiceHandle {
    pub fn new(part_id: &str, staff_number: u16, voice_number: u16, kind: VoiceKind) -> Self {
        VoiceHandle {
            part_id: part_id.to_string(),
            staff_number,
            voice_number,
            kind,
        }
    }
}

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "part '{}' staff {} voice {} ({:?})",
            self.part_id, self.staff_number, self.voice_number, self.kind
        )
    }
}

/// Voice-level running state consulted and updated during finalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceTiming {
    /// Ordinal handed to the next created measure (1-based, counts up)
    pub current_measure_ordinal: u32,
    /// Purist counter; advances when a measure ends a regular boundary
    pub current_purist_number: i32,
    /// Accumulation across consecutive incomplete measures
    pub whole_notes_since_last_regular_measure_end: WholeNotes,
    /// Absolute whole-notes position of the next measure's start
    pub current_position_in_voice: WholeNotes,
}

impl Default for VoiceTiming {
    fn default() -> Self {
        VoiceTiming {
            current_measure_ordinal: 0,
            current_purist_number: 0,
            whole_notes_since_last_regular_measure_end: duration::zero(),
            current_position_in_voice: duration::zero(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    handle: VoiceHandle,
    settings: EngineSettings,
    /// Effective time signature; new measures take their capacity from it
    current_time: TimeSignature,
    segments: Vec<Segment>,
    timing: VoiceTiming,
}

impl Voice {
    pub fn new(handle: VoiceHandle, settings: EngineSettings) -> Self {
        let initial_segment = Segment::new(1, handle.clone());
        let current_time = settings.default_time;
        Voice {
            handle,
            settings,
            current_time,
            segments: vec![initial_segment],
            timing: VoiceTiming::default(),
        }
    }

    pub fn handle(&self) -> &VoiceHandle {
        &self.handle
    }

    pub fn kind(&self) -> VoiceKind {
        self.handle.kind
    }

    pub fn number(&self) -> u16 {
        self.handle.voice_number
    }

    pub fn current_time(&self) -> TimeSignature {
        self.current_time
    }

    pub fn timing(&self) -> &VoiceTiming {
        &self.timing
    }

    pub fn timing_mut(&mut self) -> &mut VoiceTiming {
        &mut self.timing
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All measures across all segments, in order
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.segments.iter().flat_map(|s| s.measures().iter())
    }

    /// Open a new segment (repeat structure boundary)
    pub fn start_new_segment(&mut self) {
        let number = self.segments.len() as u32 + 1;
        self.segments.push(Segment::new(number, self.handle.clone()));
    }

    // ------------------------------------------------------------------
    // Measure lifecycle
    // ------------------------------------------------------------------

    /// Create the next measure of this voice. The previous measure, if
    /// any, learns its successor's number; the new measure's capacity
    /// comes from the effective time signature.
    pub fn create_measure(&mut self, number: &str) -> &mut Measure {
        if let Some(previous) = self.current_measure_opt() {
            previous.set_next_measure_number(number);
        }
        self.timing.current_measure_ordinal += 1;
        let ordinal = self.timing.current_measure_ordinal;
        let measure = Measure::new(
            number,
            ordinal,
            self.handle.clone(),
            self.current_time.measure_whole_notes(),
            ordinal == 1,
            self.settings.trace_measures,
        );
        let segment = self.segments.last_mut().expect("voice always has a segment");
        segment.push_measure(measure);
        segment.last_measure_mut().expect("just pushed")
    }

    fn current_measure_opt(&mut self) -> Option<&mut Measure> {
        self.segments.last_mut().and_then(|s| s.last_measure_mut())
    }

    pub fn current_measure(&mut self) -> Result<&mut Measure, MeasureError> {
        let voice = self.handle.to_string();
        self.current_measure_opt()
            .ok_or(MeasureError::NoOpenMeasure { voice })
    }

    /// Finalize the voice's open measure according to the voice kind
    pub fn finalize_current_measure(
        &mut self,
        context: MeasureRepeatContext,
        table: &mut PartMeasureTable,
    ) -> Result<(), MeasureError> {
        let Voice {
            handle,
            segments,
            timing,
            ..
        } = self;
        let measure = segments
            .last_mut()
            .and_then(|s| s.last_measure_mut())
            .ok_or_else(|| MeasureError::NoOpenMeasure {
                voice: handle.to_string(),
            })?;
        match handle.kind {
            VoiceKind::Regular => measure.finalize_regular(context, timing, table),
            VoiceKind::Harmony => measure.finalize_harmony(context, timing, table),
            VoiceKind::FiguredBass => measure.finalize_figured_bass(context, timing, table),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Append passthroughs to the open measure
    // ------------------------------------------------------------------

    pub fn append_note_or_padding(&mut self, note: Note) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_note_or_padding(note))
    }

    pub fn append_note(
        &mut self,
        note: Note,
        part_current_position_in_measure: WholeNotes,
    ) -> Result<ElementId, MeasureError> {
        Ok(self
            .current_measure()?
            .append_note(note, part_current_position_in_measure))
    }

    pub fn append_chord(&mut self, chord: Chord) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_chord(chord))
    }

    pub fn append_tuplet(&mut self, tuplet: Tuplet) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_tuplet(tuplet))
    }

    pub fn append_double_tremolo(
        &mut self,
        tremolo: DoubleTremolo,
    ) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_double_tremolo(tremolo))
    }

    pub fn append_harmony(
        &mut self,
        harmony: Harmony,
        position_in_measure: WholeNotes,
    ) -> Result<ElementId, MeasureError> {
        Ok(self
            .current_measure()?
            .append_harmony(harmony, position_in_measure))
    }

    pub fn append_figured_bass(
        &mut self,
        figured_bass: FiguredBass,
        position_in_measure: WholeNotes,
    ) -> Result<ElementId, MeasureError> {
        Ok(self
            .current_measure()?
            .append_figured_bass(figured_bass, position_in_measure))
    }

    pub fn append_clef(&mut self, clef: ClefKind) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_clef(clef))
    }

    pub fn append_key(&mut self, key: KeySignature) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_key(key))
    }

    /// Append a time element; the voice remembers it as the effective
    /// time for measures created afterwards.
    pub fn append_time(&mut self, time: TimeSignature) -> Result<ElementId, MeasureError> {
        self.current_time = time;
        Ok(self.current_measure()?.append_time(time))
    }

    pub fn append_barline(&mut self, barline: BarlineKind) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_barline(barline))
    }

    pub fn append_tempo(&mut self, tempo: Tempo) -> Result<ElementId, MeasureError> {
        Ok(self.current_measure()?.append_tempo(tempo))
    }

    pub fn pad_up_to_position_in_measure(
        &mut self,
        target: WholeNotes,
    ) -> Result<(), MeasureError> {
        self.current_measure()?.pad_up_to_position_in_measure(target);
        Ok(())
    }

    pub fn backup_by_whole_notes_step_length(
        &mut self,
        backup_length: WholeNotes,
    ) -> Result<(), MeasureError> {
        self.current_measure()?
            .backup_by_whole_notes_step_length(backup_length);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clone adoption
    // ------------------------------------------------------------------

    /// Adopt a newborn clone of `source` as this voice's next measure
    pub fn append_newborn_clone_of(&mut self, source: &Measure) -> &mut Measure {
        let ordinal = self.next_ordinal();
        self.adopt(source.newborn_clone(ordinal))
    }

    /// Adopt a deep copy of `source` as this voice's next measure
    pub fn append_deep_copy_of(&mut self, source: &Measure) -> &mut Measure {
        let ordinal = self.next_ordinal();
        self.adopt(source.deep_copy(ordinal))
    }

    /// Adopt a notes-only copy of `source` as this voice's next measure
    pub fn append_notes_only_copy_of(&mut self, source: &Measure) -> &mut Measure {
        let ordinal = self.next_ordinal();
        self.adopt(source.copy_with_notes_only(ordinal))
    }

    fn next_ordinal(&mut self) -> u32 {
        self.timing.current_measure_ordinal += 1;
        self.timing.current_measure_ordinal
    }

    fn adopt(&mut self, measure: Measure) -> &mut Measure {
        let segment = self.segments.last_mut().expect("voice always has a segment");
        segment.push_measure(measure);
        segment.last_measure_mut().expect("just pushed")
    }
}
