//! Side panel listing the trails of the current search

use crate::models::TrailFeature;
use serde::Serialize;
use std::fmt::Display;

pub const NO_TRAILS_MESSAGE: &str = "No trails found in this area.";

/// What the panel currently shows instead of (or above) the list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PanelStatus {
    Idle,
    Loading(String),
    /// Inline error or notice
    Message(String),
    Trails,
}

/// One row of the trail list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelEntry {
    pub trail_id: i64,
    pub badge: String,
    pub badge_color: String,
    pub name: String,
    pub details: String,
    pub highlighted: bool,
}

impl From<&TrailFeature> for PanelEntry {
    fn from(feature: &TrailFeature) -> Self {
        Self {
            trail_id: feature.id,
            badge: feature.difficulty.badge(),
            badge_color: feature.color.clone(),
            name: feature.name.clone(),
            details: feature.details(),
            highlighted: feature.highlighted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrailPanel {
    status: PanelStatus,
    entries: Vec<PanelEntry>,
}

impl Default for TrailPanel {
    fn default() -> Self {
        Self {
            status: PanelStatus::Idle,
            entries: Vec::new(),
        }
    }
}

impl TrailPanel {
    #[must_use]
    pub fn status(&self) -> &PanelStatus {
        &self.status
    }

    #[must_use]
    pub fn entries(&self) -> &[PanelEntry] {
        &self.entries
    }

    pub fn show_loading<S: Into<String>>(&mut self, text: S) {
        self.status = PanelStatus::Loading(text.into());
        self.entries.clear();
    }

    pub fn show_message<S: Into<String>>(&mut self, text: S) {
        self.status = PanelStatus::Message(text.into());
        self.entries.clear();
    }

    /// Rebuild the list from scratch
    pub fn render_trails(&mut self, features: &[TrailFeature]) {
        if features.is_empty() {
            self.show_message(NO_TRAILS_MESSAGE);
            return;
        }
        self.entries = features.iter().map(PanelEntry::from).collect();
        self.status = PanelStatus::Trails;
    }
}

impl Display for TrailPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            PanelStatus::Idle => writeln!(f, "Search for a place to list nearby trails."),
            PanelStatus::Loading(text) | PanelStatus::Message(text) => writeln!(f, "{text}"),
            PanelStatus::Trails => {
                writeln!(f, "🚵 {} trails", self.entries.len())?;
                for (index, entry) in self.entries.iter().enumerate() {
                    let marker = if entry.highlighted { '▶' } else { ' ' };
                    writeln!(
                        f,
                        "{marker} {:>3}. [{}] {}",
                        index + 1,
                        entry.badge,
                        entry.name
                    )?;
                    writeln!(f, "        {}", entry.details)?;
                }
                Ok(())
            }
        }
    }
}
