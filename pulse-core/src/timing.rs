//! Timing template: how much screen time each segment slot receives.
//!
//! The template is versioned alongside the repo (`templates/*.json`) and is
//! read-only at runtime.

use crate::artifact::{self, ArtifactError};
use crate::schema::{
    check_duration, check_unique_ids, seconds_to_duration, SchemaError, DURATION_EPSILON_S,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Layout hint for a slot. Decides what content the story generator puts there
/// and how the video renderer frames it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutHint {
    Title,
    #[default]
    Scene,
    Outro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Slot {
    pub id: String,
    pub duration_s: f64,
    #[serde(default)]
    pub layout: LayoutHint,
}

impl Slot {
    pub fn new(id: impl Into<String>, duration_s: f64, layout: LayoutHint) -> Self {
        Self {
            id: id.into(),
            duration_s,
            layout,
        }
    }

    pub fn duration(&self) -> Duration {
        seconds_to_duration(self.duration_s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingTemplate {
    pub slots: Vec<Slot>,
    pub total_duration_s: f64,
}

impl TimingTemplate {
    /// Parse and shape-check a template.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let template: Self = serde_json::from_str(json)?;
        template.check_shape()?;
        Ok(template)
    }

    /// Load a template file. A missing file is a hard failure.
    pub fn load(path: &Path) -> Result<Self, TimingLoadError> {
        let content = artifact::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// The conventional layout: one title slot, `scenes` scene slots, one outro.
    pub fn standard(intro_s: f64, scene_s: f64, scenes: usize, outro_s: f64) -> Self {
        let mut slots = Vec::with_capacity(scenes + 2);
        slots.push(Slot::new("intro", intro_s, LayoutHint::Title));
        for i in 0..scenes {
            slots.push(Slot::new(format!("scene_{:02}", i + 1), scene_s, LayoutHint::Scene));
        }
        slots.push(Slot::new("outro", outro_s, LayoutHint::Outro));
        Self {
            slots,
            total_duration_s: intro_s + scene_s * scenes as f64 + outro_s,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, position: usize) -> Option<&Slot> {
        self.slots.get(position)
    }

    pub fn total_duration(&self) -> Duration {
        seconds_to_duration(self.total_duration_s)
    }

    /// Number of slots carrying the given layout hint.
    pub fn count_layout(&self, layout: LayoutHint) -> usize {
        self.slots.iter().filter(|s| s.layout == layout).count()
    }

    fn check_shape(&self) -> Result<(), SchemaError> {
        check_duration("total_duration_s", self.total_duration_s)?;
        for slot in &self.slots {
            check_duration(format!("slots[{}].duration_s", slot.id), slot.duration_s)?;
        }
        check_unique_ids("slot", self.slots.iter().map(|s| s.id.as_str()))?;

        let slots_s: f64 = self.slots.iter().map(|s| s.duration_s).sum();
        if slots_s > self.total_duration_s + DURATION_EPSILON_S {
            return Err(SchemaError::SlotsExceedTotal {
                slots_s,
                total_s: self.total_duration_s,
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimingLoadError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid timing template: {0}")]
    Schema(#[from] SchemaError),
}
