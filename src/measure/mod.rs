//! The measure: one voice's slice of musical time
//!
//! A measure owns an ordered element list and reconciles the declarative,
//! possibly inconsistent durations coming from the reading pass into a
//! single coherent whole-notes timeline. Elements are appended left to
//! right; gaps against the part's running position are filled with silent
//! skip notes; at end of input the measure is finalized exactly once —
//! padded to the part's target length, classified (regular / anacrusis /
//! incomplete / overfull / empty / cadenza), and stamped with its purist
//! number.
//!
//! # Open vs. finalized
//!
//! `finalization: None` is the open, mutable state; `Some` carries the
//! kind and purist number and is never overwritten. Double finalization
//! is tolerated with a warning because the external driver may visit a
//! measure twice.
//!
//! # Accounting invariant
//!
//! `current_whole_notes` equals the sum of sounding durations over every
//! element appended through a duration-bearing entry point (padding skips
//! included, decorations excluded), at all times.

mod classify;
mod overlay;

pub use classify::{MeasureKind, MeasureRepeatContext};
pub use overlay::OverlayKind;

use serde::{Deserialize, Serialize};

use crate::duration::{self, WholeNotes};
use crate::elements::{
    BarlineKind, Chord, ClefKind, DoubleTremolo, ElementContent, ElementId, FiguredBass, Harmony,
    KeySignature, MeasureElement, Note, Tempo, TimeSignature, Tuplet,
};
use crate::part::PartMeasureTable;
use crate::voice::{VoiceHandle, VoiceTiming};

/// Three-valued flag for state that is unknown until finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ternary {
    Unknown,
    Yes,
    No,
}

/// Result of classification, set exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalization {
    pub kind: MeasureKind,
    pub purist_number: i32,
}

/// A measure under construction or finalized. See the module docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measure {
    /// Source measure number; not necessarily numeric or unique
    number: String,
    /// Source number of the following measure, carried over by clones
    next_measure_number: String,
    /// 1-based sequence position within the owning voice
    ordinal_in_voice: u32,
    uplink: VoiceHandle,

    /// Capacity from the effective time signature (cadenza sentinel for
    /// senza misura)
    full_whole_notes: WholeNotes,
    /// Whole notes consumed so far; frozen after finalize
    current_whole_notes: WholeNotes,

    elements: Vec<MeasureElement>,
    next_element_id: u64,

    /// Duration-bearing element with the greatest sounding or display
    /// duration seen so far, with that duration
    longest_note: Option<(ElementId, WholeNotes)>,

    first_in_voice: bool,
    first_in_segment: Ternary,
    contains_music: bool,
    end_regular: Ternary,
    repeat_context: MeasureRepeatContext,

    finalization: Option<Finalization>,

    trace: bool,
}

impl Measure {
    pub fn new(
        number: &str,
        ordinal_in_voice: u32,
        uplink: VoiceHandle,
        full_whole_notes: WholeNotes,
        first_in_voice: bool,
        trace: bool,
    ) -> Self {
        if trace {
            log::debug!(
                "creating measure '{}' (ordinal {}) in {}",
                number,
                ordinal_in_voice,
                uplink
            );
        }
        Measure {
            number: number.to_string(),
            next_measure_number: String::new(),
            ordinal_in_voice,
            uplink,
            full_whole_notes,
            current_whole_notes: duration::zero(),
            elements: Vec::new(),
            next_element_id: 1,
            longest_note: None,
            first_in_voice,
            first_in_segment: Ternary::Unknown,
            contains_music: false,
            end_regular: Ternary::Unknown,
            repeat_context: MeasureRepeatContext::None,
            finalization: None,
            trace,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn next_measure_number(&self) -> &str {
        &self.next_measure_number
    }

    pub fn set_next_measure_number(&mut self, number: &str) {
        self.next_measure_number = number.to_string();
    }

    pub fn ordinal_in_voice(&self) -> u32 {
        self.ordinal_in_voice
    }

    pub fn uplink(&self) -> &VoiceHandle {
        &self.uplink
    }

    pub fn current_whole_notes(&self) -> WholeNotes {
        self.current_whole_notes
    }

    pub fn full_whole_notes(&self) -> WholeNotes {
        self.full_whole_notes
    }

    pub fn elements(&self) -> &[MeasureElement] {
        &self.elements
    }

    pub fn first_in_voice(&self) -> bool {
        self.first_in_voice
    }

    pub fn first_in_segment(&self) -> Ternary {
        self.first_in_segment
    }

    pub fn set_first_in_segment(&mut self, value: Ternary) {
        self.first_in_segment = value;
    }

    pub fn contains_music(&self) -> bool {
        self.contains_music
    }

    pub fn end_regular(&self) -> Ternary {
        self.end_regular
    }

    pub fn set_end_regular(&mut self, value: Ternary) {
        self.end_regular = value;
    }

    pub fn repeat_context(&self) -> MeasureRepeatContext {
        self.repeat_context
    }

    pub fn set_repeat_context(&mut self, context: MeasureRepeatContext) {
        self.repeat_context = context;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalization.is_some()
    }

    /// Classification; `Unknown` until finalized
    pub fn kind(&self) -> MeasureKind {
        self.finalization
            .map(|f| f.kind)
            .unwrap_or(MeasureKind::Unknown)
    }

    pub fn purist_number(&self) -> Option<i32> {
        self.finalization.map(|f| f.purist_number)
    }

    /// Override the purist number on an already classified measure.
    /// Used by repeat restructuring; warns and does nothing beforehand.
    pub fn set_purist_number(&mut self, purist_number: i32) {
        match &mut self.finalization {
            Some(f) => f.purist_number = purist_number,
            None => log::warn!(
                "measure '{}' in {}: purist number set before classification, ignored",
                self.number,
                self.uplink
            ),
        }
    }

    // ------------------------------------------------------------------
    // Element identity
    // ------------------------------------------------------------------

    fn fresh_id(&mut self) -> ElementId {
        let id = ElementId(self.next_element_id);
        self.next_element_id += 1;
        id
    }

    fn make_element(&mut self, position: WholeNotes, content: ElementContent) -> MeasureElement {
        MeasureElement {
            id: self.fresh_id(),
            measure_number: self.number.clone(),
            position_in_measure: position,
            position_in_voice: None,
            content,
        }
    }

    // ------------------------------------------------------------------
    // Append: decorations
    // ------------------------------------------------------------------

    /// Append a zero-duration element at the current timeline end.
    ///
    /// Assigns measure number and position but does not advance the
    /// running duration; accounting stays with duration-bearing paths.
    pub fn append_element(&mut self, content: ElementContent) -> ElementId {
        let position = self.current_whole_notes;
        let element = self.make_element(position, content);
        let id = element.id;
        self.elements.push(element);
        id
    }

    pub fn append_clef(&mut self, clef: ClefKind) -> ElementId {
        self.append_element(ElementContent::Clef(clef))
    }

    pub fn append_key(&mut self, key: KeySignature) -> ElementId {
        self.append_element(ElementContent::Key(key))
    }

    /// Append a time element and recompute the measure capacity from it
    pub fn append_time(&mut self, time: TimeSignature) -> ElementId {
        self.full_whole_notes = time.measure_whole_notes();
        if self.trace {
            log::debug!(
                "measure '{}' in {}: capacity now {} from time {:?}",
                self.number,
                self.uplink,
                self.full_whole_notes,
                time
            );
        }
        self.append_element(ElementContent::Time(time))
    }

    pub fn append_barline(&mut self, barline: BarlineKind) -> ElementId {
        self.append_element(ElementContent::Barline(barline))
    }

    pub fn append_segno(&mut self) -> ElementId {
        self.append_element(ElementContent::Segno)
    }

    pub fn append_coda(&mut self) -> ElementId {
        self.append_element(ElementContent::Coda)
    }

    pub fn append_tempo(&mut self, tempo: Tempo) -> ElementId {
        self.append_element(ElementContent::Tempo(tempo))
    }

    // ------------------------------------------------------------------
    // Append: duration-bearing
    // ------------------------------------------------------------------

    /// The canonical path for anything with duration: place at the
    /// current timeline end, then advance the running duration.
    pub fn append_note_or_padding(&mut self, mut note: Note) -> ElementId {
        let position = self.current_whole_notes;
        let sounding = note.sounding_whole_notes;

        // Grace notes ride on the host note's final position
        for grace in &mut note.grace_notes_before {
            grace.position_in_measure = Some(position);
        }
        for grace in &mut note.grace_notes_after {
            grace.position_in_measure = Some(position + sounding);
        }

        let longest_candidate = note.sounding_whole_notes.max(note.display_whole_notes);

        let element = self.make_element(position, ElementContent::Note(note));
        let id = element.id;
        self.elements.push(element);
        self.account_appended(id, sounding, longest_candidate);
        id
    }

    /// Append a note against the part's independently tracked position.
    ///
    /// When other voices of the part have advanced further, the gap is
    /// filled with a skip so all voices stay comparable by absolute
    /// position. A part position behind this voice is inconsistent input
    /// and only warned about.
    pub fn append_note(
        &mut self,
        note: Note,
        part_current_position_in_measure: WholeNotes,
    ) -> ElementId {
        let delta = part_current_position_in_measure - self.current_whole_notes;
        if delta > duration::zero() {
            if self.trace {
                log::debug!(
                    "measure '{}' in {}: padding gap of {} before note",
                    self.number,
                    self.uplink,
                    delta
                );
            }
            self.append_note_or_padding(Note::skip(delta));
        } else if delta < duration::zero() {
            log::warn!(
                "measure '{}' in {}: part position {} is behind voice position {}, no padding added",
                self.number,
                self.uplink,
                part_current_position_in_measure,
                self.current_whole_notes
            );
        }
        self.append_note_or_padding(note)
    }

    pub fn append_chord(&mut self, chord: Chord) -> ElementId {
        let position = self.current_whole_notes;
        let sounding = chord.sounding_whole_notes;
        let element = self.make_element(position, ElementContent::Chord(chord));
        let id = element.id;
        self.elements.push(element);
        self.account_appended(id, sounding, sounding);
        id
    }

    pub fn append_tuplet(&mut self, tuplet: Tuplet) -> ElementId {
        let position = self.current_whole_notes;
        let sounding = tuplet.sounding_whole_notes;
        let element = self.make_element(position, ElementContent::Tuplet(tuplet));
        let id = element.id;
        self.elements.push(element);
        self.account_appended(id, sounding, sounding);
        id
    }

    pub fn append_double_tremolo(&mut self, tremolo: DoubleTremolo) -> ElementId {
        let position = self.current_whole_notes;
        let sounding = tremolo.sounding_whole_notes;
        let element = self.make_element(position, ElementContent::DoubleTremolo(tremolo));
        let id = element.id;
        self.elements.push(element);
        self.account_appended(id, sounding, sounding);
        id
    }

    /// Append a harmony at an explicit position (anchor note position
    /// plus source offset). The sounding duration is the reading pass's
    /// estimate; overlay reconciliation corrects it at finalize time.
    pub fn append_harmony(
        &mut self,
        harmony: Harmony,
        position_in_measure: WholeNotes,
    ) -> ElementId {
        let sounding = harmony.sounding_whole_notes;
        let element = self.make_element(position_in_measure, ElementContent::Harmony(harmony));
        let id = element.id;
        self.elements.push(element);
        self.account_appended(id, sounding, sounding);
        id
    }

    /// Figured-bass twin of [`Measure::append_harmony`]
    pub fn append_figured_bass(
        &mut self,
        figured_bass: FiguredBass,
        position_in_measure: WholeNotes,
    ) -> ElementId {
        let sounding = figured_bass.sounding_whole_notes;
        let element =
            self.make_element(position_in_measure, ElementContent::FiguredBass(figured_bass));
        let id = element.id;
        self.elements.push(element);
        self.account_appended(id, sounding, sounding);
        id
    }

    fn account_appended(&mut self, id: ElementId, sounding: WholeNotes, longest_candidate: WholeNotes) {
        self.current_whole_notes += sounding;
        if sounding > duration::zero() {
            self.contains_music = true;
        }
        match self.longest_note {
            Some((_, best)) if best >= longest_candidate => {}
            _ => self.longest_note = Some((id, longest_candidate)),
        }
    }

    // ------------------------------------------------------------------
    // Insert
    // ------------------------------------------------------------------

    /// Insert an element immediately before the existing element whose
    /// position equals `position`. Requires an anchor, unlike the append
    /// paths: with no element at that exact position the failure is
    /// reported and the measure is left unchanged.
    ///
    /// Does not advance the running duration.
    pub fn insert_element_at_position(
        &mut self,
        position: WholeNotes,
        content: ElementContent,
    ) -> Option<ElementId> {
        let anchor = self
            .elements
            .iter()
            .position(|e| e.position_in_measure == position);
        match anchor {
            Some(index) => {
                let element = self.make_element(position, content);
                let id = element.id;
                self.elements.insert(index, element);
                Some(id)
            }
            None => {
                log::error!(
                    "measure '{}' in {}: no anchor element at position {} to insert before",
                    self.number,
                    self.uplink,
                    position
                );
                None
            }
        }
    }

    /// Index at which a late element belongs: before any trailing
    /// barlines, so barlines stay the last elements of the measure.
    fn end_insert_index(&self) -> usize {
        let mut index = self.elements.len();
        while index > 0 && self.elements[index - 1].is_barline() {
            index -= 1;
        }
        index
    }

    /// Append a zero-duration element at the end of the measure, keeping
    /// any trailing barlines last.
    pub fn append_element_at_the_end(&mut self, content: ElementContent) -> ElementId {
        let position = self.current_whole_notes;
        let element = self.make_element(position, content);
        let id = element.id;
        let index = self.end_insert_index();
        self.elements.insert(index, element);
        id
    }

    // ------------------------------------------------------------------
    // Padding
    // ------------------------------------------------------------------

    /// Pad with one skip up to `target`, appending at the timeline end.
    /// A target behind the current position is a caller logic error:
    /// warned about, never truncated.
    pub fn pad_up_to_position_in_measure(&mut self, target: WholeNotes) {
        use std::cmp::Ordering;
        match self.current_whole_notes.cmp(&target) {
            Ordering::Less => {
                let missing = target - self.current_whole_notes;
                self.append_note_or_padding(Note::skip(missing));
            }
            Ordering::Equal => {}
            Ordering::Greater => {
                log::warn!(
                    "measure '{}' in {}: pad target {} is behind current position {}, left as-is",
                    self.number,
                    self.uplink,
                    target,
                    self.current_whole_notes
                );
            }
        }
    }

    /// Pad with one skip up to `target`, inserting before any trailing
    /// barlines so they remain the measure's last elements.
    pub fn pad_up_to_position_at_the_end(&mut self, target: WholeNotes) {
        use std::cmp::Ordering;
        match self.current_whole_notes.cmp(&target) {
            Ordering::Less => {
                let missing = target - self.current_whole_notes;
                if self.trace {
                    log::debug!(
                        "measure '{}' in {}: end-padding by {} up to {}",
                        self.number,
                        self.uplink,
                        missing,
                        target
                    );
                }
                let position = self.current_whole_notes;
                let element = self.make_element(position, ElementContent::Note(Note::skip(missing)));
                let id = element.id;
                let index = self.end_insert_index();
                self.elements.insert(index, element);
                self.account_appended(id, missing, missing);
            }
            Ordering::Equal => {}
            Ordering::Greater => {
                log::warn!(
                    "measure '{}' in {}: end-pad target {} is behind current position {}, left as-is",
                    self.number,
                    self.uplink,
                    target,
                    self.current_whole_notes
                );
            }
        }
    }

    /// MusicXML `<backup>`: pad up to `full - backup_length`
    pub fn backup_by_whole_notes_step_length(&mut self, backup_length: WholeNotes) {
        if duration::is_cadenza_capacity(self.full_whole_notes) {
            log::warn!(
                "measure '{}' in {}: backup within a senza-misura measure ignored",
                self.number,
                self.uplink
            );
            return;
        }
        let target = self.full_whole_notes - backup_length;
        self.pad_up_to_position_in_measure(target);
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove an element by identity. Not finding it means the caller's
    /// bookkeeping is wrong: a hard error, nothing mutated.
    ///
    /// The running duration decreases by the removed element's own
    /// sounding duration.
    pub fn remove_element(&mut self, id: ElementId) -> Result<MeasureElement, crate::errors::MeasureError> {
        let index = self.elements.iter().position(|e| e.id == id).ok_or_else(|| {
            crate::errors::MeasureError::ElementNotFound {
                id,
                measure_number: self.number.clone(),
            }
        })?;
        let element = self.elements.remove(index);
        self.current_whole_notes -= element.sounding_whole_notes();
        if let Some((longest_id, _)) = self.longest_note {
            if longest_id == id {
                self.longest_note = None;
            }
        }
        Ok(element)
    }

    /// Remove a note by identity; same contract as [`Measure::remove_element`]
    pub fn remove_note(&mut self, id: ElementId) -> Result<MeasureElement, crate::errors::MeasureError> {
        self.remove_element(id)
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Finalize a regular voice's measure: pad to the part's target
    /// length for this ordinal, register the final length back, classify,
    /// and assign absolute voice positions.
    pub fn finalize_regular(
        &mut self,
        context: MeasureRepeatContext,
        timing: &mut VoiceTiming,
        table: &mut PartMeasureTable,
    ) {
        if self.warn_if_already_finalized() {
            return;
        }
        let target = table
            .get(self.ordinal_in_voice)
            .unwrap_or(self.current_whole_notes);
        self.pad_up_to_position_at_the_end(target);
        table.register(self.ordinal_in_voice, self.current_whole_notes);
        self.determine_kind_and_purist_number(context, timing);
        self.assign_positions_in_voice(timing);
    }

    /// Finalize a harmony voice's measure: reconcile the overlay into a
    /// gap-free, overlap-free span sequence, pad to the registered
    /// length, classify, assign voice positions.
    pub fn finalize_harmony(
        &mut self,
        context: MeasureRepeatContext,
        timing: &mut VoiceTiming,
        table: &mut PartMeasureTable,
    ) {
        self.finalize_overlay(OverlayKind::Harmony, context, timing, table);
    }

    /// Figured-bass twin of [`Measure::finalize_harmony`]
    pub fn finalize_figured_bass(
        &mut self,
        context: MeasureRepeatContext,
        timing: &mut VoiceTiming,
        table: &mut PartMeasureTable,
    ) {
        self.finalize_overlay(OverlayKind::FiguredBass, context, timing, table);
    }

    fn finalize_overlay(
        &mut self,
        overlay: OverlayKind,
        context: MeasureRepeatContext,
        timing: &mut VoiceTiming,
        table: &mut PartMeasureTable,
    ) {
        if self.warn_if_already_finalized() {
            return;
        }
        self.reconcile_overlay(overlay);
        if let Some(target) = table.get(self.ordinal_in_voice) {
            self.pad_up_to_position_at_the_end(target);
        }
        self.determine_kind_and_purist_number(context, timing);
        self.assign_positions_in_voice(timing);
    }

    fn warn_if_already_finalized(&self) -> bool {
        if self.finalization.is_some() {
            log::warn!(
                "measure '{}' in {}: finalized twice, second call ignored",
                self.number,
                self.uplink
            );
            true
        } else {
            false
        }
    }

    fn assign_positions_in_voice(&mut self, timing: &mut VoiceTiming) {
        let base = timing.current_position_in_voice;
        for element in &mut self.elements {
            element.position_in_voice = Some(base + element.position_in_measure);
        }
        timing.current_position_in_voice = base + self.current_whole_notes;
    }

    pub(crate) fn set_finalization(&mut self, finalization: Finalization) {
        self.finalization = Some(finalization);
    }

    // ------------------------------------------------------------------
    // Clones
    // ------------------------------------------------------------------

    /// Newborn clone: same identity and context, empty element list.
    /// Derived state (kind, purist number, running length) is left unset
    /// to be recomputed from the clone's own contents.
    pub fn newborn_clone(&self, new_ordinal: u32) -> Measure {
        Measure {
            number: self.number.clone(),
            next_measure_number: self.next_measure_number.clone(),
            ordinal_in_voice: new_ordinal,
            uplink: self.uplink.clone(),
            full_whole_notes: self.full_whole_notes,
            current_whole_notes: duration::zero(),
            elements: Vec::new(),
            next_element_id: 1,
            longest_note: None,
            first_in_voice: new_ordinal == 1,
            first_in_segment: Ternary::Unknown,
            contains_music: false,
            end_regular: Ternary::Unknown,
            repeat_context: MeasureRepeatContext::None,
            finalization: None,
            trace: self.trace,
        }
    }

    /// Deep copy: identity, lengths and classification copied verbatim.
    /// Notes are duplicated as new elements (fresh ids); time elements
    /// and everything else are carried over unchanged (same ids), since
    /// they are value-like and safely shared between copies.
    pub fn deep_copy(&self, new_ordinal: u32) -> Measure {
        let mut copy = Measure {
            number: self.number.clone(),
            next_measure_number: self.next_measure_number.clone(),
            ordinal_in_voice: new_ordinal,
            uplink: self.uplink.clone(),
            full_whole_notes: self.full_whole_notes,
            current_whole_notes: self.current_whole_notes,
            elements: Vec::new(),
            next_element_id: self.next_element_id,
            longest_note: self.longest_note,
            first_in_voice: self.first_in_voice,
            first_in_segment: self.first_in_segment,
            contains_music: self.contains_music,
            end_regular: self.end_regular,
            repeat_context: self.repeat_context,
            finalization: self.finalization,
            trace: self.trace,
        };
        for element in &self.elements {
            let mut cloned = element.clone();
            if element.is_note() {
                cloned.id = copy.fresh_id();
            }
            copy.elements.push(cloned);
        }
        copy
    }

    /// Notes-only copy: a restricted view retaining notes, chords and
    /// tuplets; clefs, keys, times, barlines, harmonies and the rest are
    /// dropped. The running duration is recomputed from what remains.
    pub fn copy_with_notes_only(&self, new_ordinal: u32) -> Measure {
        let mut copy = self.newborn_clone(new_ordinal);
        copy.first_in_voice = self.first_in_voice;
        for element in &self.elements {
            let keep = matches!(
                element.content,
                ElementContent::Note(_) | ElementContent::Chord(_) | ElementContent::Tuplet(_)
            );
            if keep {
                copy.current_whole_notes += element.sounding_whole_notes();
                copy.elements.push(element.clone());
            }
        }
        copy.next_element_id = self.next_element_id;
        copy
    }
}
