//! Score: the root of the containment hierarchy

use serde::{Deserialize, Serialize};

use crate::part::Part;
use crate::settings::EngineSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    settings: EngineSettings,
    parts: Vec<Part>,
}

impl Score {
    pub fn new(settings: EngineSettings) -> Self {
        Score {
            settings,
            parts: Vec::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn create_part(&mut self, id: &str, name: &str) -> &mut Part {
        self.parts.push(Part::new(id, name, self.settings.clone()));
        self.parts.last_mut().expect("just pushed")
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id() == id)
    }

    pub fn part_mut(&mut self, id: &str) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.id() == id)
    }

    /// Diagnostic dump of the whole tree as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
