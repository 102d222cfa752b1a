//! Staff: a numbered group of voices within a part

use serde::{Deserialize, Serialize};

use crate::settings::EngineSettings;
use crate::voice::{Voice, VoiceHandle, VoiceKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    number: u16,
    part_id: String,
    voices: Vec<Voice>,
}

impl Staff {
    pub fn new(number: u16, part_id: &str) -> Self {
        Staff {
            number,
            part_id: part_id.to_string(),
            voices: Vec::new(),
        }
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    pub fn create_voice(
        &mut self,
        voice_number: u16,
        kind: VoiceKind,
        settings: EngineSettings,
    ) -> &mut Voice {
        if self.voices.iter().any(|v| v.number() == voice_number) {
            log::warn!(
                "staff {} of part '{}' already has a voice {}, adding another",
                self.number,
                self.part_id,
                voice_number
            );
        }
        let handle = VoiceHandle::new(&self.part_id, self.number, voice_number, kind);
        self.voices.push(Voice::new(handle, settings));
        self.voices.last_mut().expect("just pushed")
    }

    pub fn voice(&self, voice_number: u16) -> Option<&Voice> {
        self.voices.iter().find(|v| v.number() == voice_number)
    }

    pub fn voice_mut(&mut self, voice_number: u16) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.number() == voice_number)
    }
}
