//! Measure and voice timing engine for a music score representation
//!
//! This crate is the timing core of a notation translator: an external
//! reading pass appends raw pitch/duration/attribute events element by
//! element, and the engine reconciles them into one coherent whole-notes
//! timeline per voice, per staff, per part. Harmony and figured-bass
//! overlay voices are reconciled against the regular voices' measure
//! lengths, and every measure is finalized exactly once with a
//! classification and a purist number.
//!
//! # Architecture
//!
//! ```text
//! Reading pass (external)        Engine                     Consumers (external)
//!
//! append*ToMeasure events   →    Score                  →   code generators
//! finalize per measure           ├── Part  (length table,
//!                                │          running position)
//!                                │   └── Staff
//!                                │       └── Voice (timing state)
//!                                │           └── Segment
//!                                │               └── Measure (THE CORE)
//!                                │                   └── MeasureElement
//! ```
//!
//! Durations are exact rationals of a whole note throughout; see
//! [`duration`].

pub mod duration;
pub mod elements;
pub mod errors;
pub mod measure;
pub mod part;
pub mod score;
pub mod segment;
pub mod settings;
pub mod staff;
pub mod voice;

// Re-export commonly used types
pub use duration::{Rational, WholeNotes};
pub use elements::{
    BarlineKind, Chord, ClefKind, DoubleTremolo, ElementContent, ElementId, FiguredBass,
    GraceNote, Harmony, HarmonyQuality, KeySignature, MeasureElement, Mode, Note, NoteKind, Pitch,
    Tempo, TieKind, TimeSignature, Tuplet,
};
pub use errors::MeasureError;
pub use measure::{Measure, MeasureKind, MeasureRepeatContext, Ternary};
pub use part::{Part, PartMeasureTable};
pub use score::Score;
pub use segment::Segment;
pub use settings::EngineSettings;
pub use staff::Staff;
pub use voice::{Voice, VoiceHandle, VoiceKind, VoiceTiming};
