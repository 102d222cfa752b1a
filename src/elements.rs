//! Measure element types
//!
//! Everything that can live inside a measure — notes, chords, tuplets,
//! clefs, keys, times, barlines, harmonies, figured basses, segni, codas,
//! tempos, double tremolos — is a [`MeasureElement`]: placement data
//! common to every variant plus a closed [`ElementContent`] enum. Pattern
//! matching over the enum replaces runtime type inspection, so an
//! unhandled variant is a compile error rather than a silent fall-through.
//!
//! Duration-bearing variants report a nonzero sounding duration;
//! decorations (clef, key, time, barline, segno, coda, tempo) occupy a
//! list slot and a position but contribute nothing to the timeline.

use serde::{Deserialize, Serialize};

use crate::duration::{self, WholeNotes};

/// Identity of an element within its measure.
///
/// Removal is by identity, not by value: two quarter-note Cs at different
/// positions are different elements. Ids are handed out by the measure at
/// insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// Musical pitch: scale step, chromatic alteration, octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// Scale degree (0=C, 1=D, 2=E, 3=F, 4=G, 5=A, 6=B)
    pub step: u8,
    /// Accidental (-2=double flat, -1=flat, 0=natural, +1=sharp, +2=double sharp)
    pub alteration: i8,
    /// Octave number (4 = middle C octave)
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: u8, alteration: i8, octave: i8) -> Self {
        Pitch {
            step,
            alteration,
            octave,
        }
    }
}

/// Time signature, or the absence of one (senza misura)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Number of beats per measure
    pub beats: u8,
    /// Beat unit (2, 4, 8, 16, ...)
    pub beat_type: u8,
    /// Senza misura: no fixed time, measure capacity is unbounded
    pub senza_misura: bool,
}

impl TimeSignature {
    pub fn new(beats: u8, beat_type: u8) -> Result<Self, String> {
        if beats == 0 {
            return Err("beats must be greater than 0".to_string());
        }
        if !beat_type.is_power_of_two() {
            return Err(format!("beat type must be power of 2, got {}", beat_type));
        }
        Ok(TimeSignature {
            beats,
            beat_type,
            senza_misura: false,
        })
    }

    pub fn senza_misura() -> Self {
        TimeSignature {
            beats: 0,
            beat_type: 1,
            senza_misura: true,
        }
    }

    /// Whole notes a full measure of this time holds.
    /// Senza misura yields the cadenza sentinel.
    pub fn measure_whole_notes(&self) -> WholeNotes {
        if self.senza_misura {
            duration::cadenza_capacity()
        } else {
            WholeNotes::new(self.beats as i32, self.beat_type as i32)
        }
    }
}

/// What a note actually is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteKind {
    /// A sounding, printed note
    Pitched(Pitch),
    /// A printed rest
    Rest,
    /// A silent, non-printing placeholder filling a timing gap
    Skip,
}

/// Tie state carried by a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieKind {
    Start,
    Continue,
    Stop,
}

/// Grace note attached to a host note.
///
/// Grace notes take no timeline space of their own; their position is
/// assigned from the host note's final position once that is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraceNote {
    pub pitch: Pitch,
    /// Slash notation: the grace steals time from the main note
    pub slash: bool,
    /// Position in the measure, set when the host note is placed
    pub position_in_measure: Option<WholeNotes>,
}

impl GraceNote {
    pub fn new(pitch: Pitch, slash: bool) -> Self {
        GraceNote {
            pitch,
            slash,
            position_in_measure: None,
        }
    }
}

/// A note, rest, or skip with its sounding and display durations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub kind: NoteKind,
    /// Timeline space the note occupies
    pub sounding_whole_notes: WholeNotes,
    /// Printed duration; differs from sounding inside tuplets
    pub display_whole_notes: WholeNotes,
    pub grace_notes_before: Vec<GraceNote>,
    pub grace_notes_after: Vec<GraceNote>,
    pub tie: Option<TieKind>,
    /// Set at classification time when this single note fills the
    /// whole measure (rendered as a full-measure rest or note downstream)
    pub occupies_full_measure: bool,
}

impl Note {
    pub fn pitched(pitch: Pitch, sounding_whole_notes: WholeNotes) -> Self {
        Note {
            kind: NoteKind::Pitched(pitch),
            sounding_whole_notes,
            display_whole_notes: sounding_whole_notes,
            grace_notes_before: Vec::new(),
            grace_notes_after: Vec::new(),
            tie: None,
            occupies_full_measure: false,
        }
    }

    pub fn rest(sounding_whole_notes: WholeNotes) -> Self {
        Note {
            kind: NoteKind::Rest,
            sounding_whole_notes,
            display_whole_notes: sounding_whole_notes,
            grace_notes_before: Vec::new(),
            grace_notes_after: Vec::new(),
            tie: None,
            occupies_full_measure: false,
        }
    }

    pub fn skip(sounding_whole_notes: WholeNotes) -> Self {
        Note {
            kind: NoteKind::Skip,
            sounding_whole_notes,
            display_whole_notes: sounding_whole_notes,
            grace_notes_before: Vec::new(),
            grace_notes_after: Vec::new(),
            tie: None,
            occupies_full_measure: false,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.kind, NoteKind::Skip)
    }
}

/// Chord: simultaneous pitches sharing one duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub pitches: Vec<Pitch>,
    pub sounding_whole_notes: WholeNotes,
}

impl Chord {
    pub fn new(pitches: Vec<Pitch>, sounding_whole_notes: WholeNotes) -> Result<Self, String> {
        if pitches.len() < 2 {
            return Err("chord must have at least 2 pitches".to_string());
        }
        Ok(Chord {
            pitches,
            sounding_whole_notes,
        })
    }
}

/// Tuplet: notes compressed by an actual/normal ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuplet {
    /// Actual notes (numerator, e.g. 3 for a triplet)
    pub actual_notes: u32,
    /// Normal notes (denominator, e.g. 2 for a triplet)
    pub normal_notes: u32,
    pub notes: Vec<Note>,
    /// Timeline space of the whole tuplet after compression
    pub sounding_whole_notes: WholeNotes,
}

impl Tuplet {
    pub fn new(
        actual_notes: u32,
        normal_notes: u32,
        notes: Vec<Note>,
        sounding_whole_notes: WholeNotes,
    ) -> Result<Self, String> {
        if actual_notes == 0 || normal_notes == 0 {
            return Err("tuplet ratio must be non-zero".to_string());
        }
        Ok(Tuplet {
            actual_notes,
            normal_notes,
            notes,
            sounding_whole_notes,
        })
    }
}

/// Two-note tremolo spanning a duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleTremolo {
    pub first: Pitch,
    pub second: Pitch,
    pub sounding_whole_notes: WholeNotes,
}

/// Clef types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClefKind {
    Treble,
    Bass,
    Alto,
    Tenor,
    Soprano,
    MezzoSoprano,
    Baritone,
    Percussion,
}

/// Key signature: circle-of-fifths position plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    /// Position on circle of fifths (-7 to +7, flats to sharps)
    pub fifths: i8,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

/// Barline categories relevant to measure bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarlineKind {
    Single,
    Double,
    Final,
    RepeatStart,
    RepeatEnd,
    EndingStart,
    EndingStop,
}

/// Harmony chord qualities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmonyQuality {
    Major,
    Minor,
    Dominant,
    Diminished,
    HalfDiminished,
    Augmented,
    Suspended,
}

/// Chord symbol read from the source with an offset but no duration.
///
/// The sounding duration starts as an estimate (the anchor note's) and is
/// corrected during overlay reconciliation at finalize time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harmony {
    pub root: Pitch,
    pub quality: HarmonyQuality,
    pub sounding_whole_notes: WholeNotes,
}

/// Figured-bass annotation, duration-inferred like a harmony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiguredBass {
    /// Figure numbers, top to bottom (e.g. [6, 4])
    pub figures: Vec<u8>,
    pub sounding_whole_notes: WholeNotes,
}

/// Tempo indication: text, metronome mark, or both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub text: Option<String>,
    pub bpm: Option<u16>,
}

/// The closed set of things a measure can contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementContent {
    Note(Note),
    Chord(Chord),
    Tuplet(Tuplet),
    DoubleTremolo(DoubleTremolo),
    Clef(ClefKind),
    Key(KeySignature),
    Time(TimeSignature),
    Barline(BarlineKind),
    Harmony(Harmony),
    FiguredBass(FiguredBass),
    Segno,
    Coda,
    Tempo(Tempo),
}

impl ElementContent {
    /// Timeline space this content occupies. Decorations return zero.
    pub fn sounding_whole_notes(&self) -> WholeNotes {
        match self {
            ElementContent::Note(n) => n.sounding_whole_notes,
            ElementContent::Chord(c) => c.sounding_whole_notes,
            ElementContent::Tuplet(t) => t.sounding_whole_notes,
            ElementContent::DoubleTremolo(d) => d.sounding_whole_notes,
            ElementContent::Harmony(h) => h.sounding_whole_notes,
            ElementContent::FiguredBass(f) => f.sounding_whole_notes,
            ElementContent::Clef(_)
            | ElementContent::Key(_)
            | ElementContent::Time(_)
            | ElementContent::Barline(_)
            | ElementContent::Segno
            | ElementContent::Coda
            | ElementContent::Tempo(_) => duration::zero(),
        }
    }

    /// Whether this content advances the timeline when appended
    pub fn bears_duration(&self) -> bool {
        matches!(
            self,
            ElementContent::Note(_)
                | ElementContent::Chord(_)
                | ElementContent::Tuplet(_)
                | ElementContent::DoubleTremolo(_)
                | ElementContent::Harmony(_)
                | ElementContent::FiguredBass(_)
        )
    }
}

/// An element placed inside a measure: identity, placement, content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureElement {
    pub id: ElementId,
    /// Source measure number of the containing measure, assigned at insertion
    pub measure_number: String,
    /// Offset from measure start, in whole notes
    pub position_in_measure: WholeNotes,
    /// Absolute offset from voice start, assigned at finalize time
    pub position_in_voice: Option<WholeNotes>,
    pub content: ElementContent,
}

impl MeasureElement {
    pub fn sounding_whole_notes(&self) -> WholeNotes {
        self.content.sounding_whole_notes()
    }

    /// End of this element on the measure timeline
    pub fn end_position_in_measure(&self) -> WholeNotes {
        self.position_in_measure + self.sounding_whole_notes()
    }

    pub fn is_barline(&self) -> bool {
        matches!(self.content, ElementContent::Barline(_))
    }

    pub fn is_note(&self) -> bool {
        matches!(self.content, ElementContent::Note(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(&self.content, ElementContent::Note(n) if n.is_skip())
    }

    pub fn is_harmony(&self) -> bool {
        matches!(self.content, ElementContent::Harmony(_))
    }

    pub fn is_figured_bass(&self) -> bool {
        matches!(self.content, ElementContent::FiguredBass(_))
    }
}
