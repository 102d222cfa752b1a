//! Part: staves, the cross-voice measure-length table, and the part's
//! running position
//!
//! All voices of a part must agree on each measure's length even though
//! they are populated independently. Two pieces of part-level state make
//! that work: the per-ordinal measure-length table, written by the first
//! voice to finalize each ordinal and read by every later one (regular
//! voices strictly before overlay voices), and the part's running
//! position in the open measure, which note appends compare against to
//! detect gaps.

use serde::{Deserialize, Serialize};

use crate::duration::{self, WholeNotes};
use crate::errors::MeasureError;
use crate::measure::MeasureRepeatContext;
use crate::settings::EngineSettings;
use crate::staff::Staff;
use crate::voice::{Voice, VoiceKind};

/// Measure ordinal → whole-notes length, shared across a part's voices.
/// Registration keeps the longest length seen for an ordinal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartMeasureTable {
    lengths: Vec<Option<WholeNotes>>,
}

impl PartMeasureTable {
    /// Record a length for a 1-based measure ordinal
    pub fn register(&mut self, ordinal: u32, length: WholeNotes) {
        if ordinal == 0 {
            log::error!("measure ordinals are 1-based, ignoring registration for 0");
            return;
        }
        let index = (ordinal - 1) as usize;
        if index >= self.lengths.len() {
            self.lengths.resize(index + 1, None);
        }
        let slot = &mut self.lengths[index];
        match slot {
            Some(existing) if *existing >= length => {}
            _ => *slot = Some(length),
        }
    }

    pub fn get(&self, ordinal: u32) -> Option<WholeNotes> {
        if ordinal == 0 {
            return None;
        }
        self.lengths.get((ordinal - 1) as usize).copied().flatten()
    }

    /// The registered lengths, indexed by ordinal - 1
    pub fn lengths(&self) -> &[Option<WholeNotes>] {
        &self.lengths
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    id: String,
    name: String,
    settings: EngineSettings,
    measure_table: PartMeasureTable,
    /// Running position within the open measure, across all voices
    current_position_in_measure: WholeNotes,
    staves: Vec<Staff>,
}

impl Part {
    pub fn new(id: &str, name: &str, settings: EngineSettings) -> Self {
        Part {
            id: id.to_string(),
            name: name.to_string(),
            settings,
            measure_table: PartMeasureTable::default(),
            current_position_in_measure: duration::zero(),
            staves: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn staves(&self) -> &[Staff] {
        &self.staves
    }

    pub fn create_staff(&mut self, number: u16) -> &mut Staff {
        self.staves.push(Staff::new(number, &self.id));
        self.staves.last_mut().expect("just pushed")
    }

    pub fn staff(&self, number: u16) -> Option<&Staff> {
        self.staves.iter().find(|s| s.number() == number)
    }

    pub fn staff_mut(&mut self, number: u16) -> Option<&mut Staff> {
        self.staves.iter_mut().find(|s| s.number() == number)
    }

    /// Create a voice on an existing staff, with this part's settings
    pub fn create_voice(
        &mut self,
        staff_number: u16,
        voice_number: u16,
        kind: VoiceKind,
    ) -> Result<&mut Voice, MeasureError> {
        let settings = self.settings.clone();
        let staff = self
            .staff_mut(staff_number)
            .ok_or(MeasureError::UnknownContext {
                what: "staff",
                which: staff_number.to_string(),
            })?;
        Ok(staff.create_voice(voice_number, kind, settings))
    }

    pub fn voice(&self, staff_number: u16, voice_number: u16) -> Option<&Voice> {
        self.staff(staff_number).and_then(|s| s.voice(voice_number))
    }

    pub fn voice_mut(&mut self, staff_number: u16, voice_number: u16) -> Option<&mut Voice> {
        self.staff_mut(staff_number)
            .and_then(|s| s.voice_mut(voice_number))
    }

    // ------------------------------------------------------------------
    // Measure-length table
    // ------------------------------------------------------------------

    pub fn measure_table(&self) -> &PartMeasureTable {
        &self.measure_table
    }

    pub fn measure_table_mut(&mut self) -> &mut PartMeasureTable {
        &mut self.measure_table
    }

    pub fn register_ordinal_measure_length(&mut self, ordinal: u32, length: WholeNotes) {
        self.measure_table.register(ordinal, length);
    }

    // ------------------------------------------------------------------
    // Part running position
    // ------------------------------------------------------------------

    pub fn current_position_in_measure(&self) -> WholeNotes {
        self.current_position_in_measure
    }

    pub fn advance_current_position_in_measure(&mut self, delta: WholeNotes) {
        self.current_position_in_measure += delta;
    }

    pub fn set_current_position_in_measure(&mut self, position: WholeNotes) {
        self.current_position_in_measure = position;
    }

    pub fn reset_current_position_in_measure(&mut self) {
        self.current_position_in_measure = duration::zero();
    }

    // ------------------------------------------------------------------
    // Measure lifecycle across all voices
    // ------------------------------------------------------------------

    /// Open the next measure in every voice of the part
    pub fn create_measure(&mut self, number: &str) {
        for staff in &mut self.staves {
            for voice in staff.voices_mut() {
                voice.create_measure(number);
            }
        }
        self.reset_current_position_in_measure();
    }

    /// Finalize the open measure in every voice: regular voices first so
    /// the measure-length table is written before overlay voices read it.
    pub fn finalize_current_measures(
        &mut self,
        context: MeasureRepeatContext,
    ) -> Result<(), MeasureError> {
        let Part {
            staves,
            measure_table,
            ..
        } = self;
        for overlay_pass in [false, true] {
            for staff in staves.iter_mut() {
                for voice in staff.voices_mut() {
                    let is_overlay = voice.kind() != VoiceKind::Regular;
                    if is_overlay == overlay_pass {
                        voice.finalize_current_measure(context, measure_table)?;
                    }
                }
            }
        }
        Ok(())
    }
}
