// file: src/models/view.rs
use super::{announcement::PlannerAnnouncement, event::Event};
use serde::{Deserialize, Serialize};

/// One calendar date of a [`View`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDay {
    /// `YYYY-MM-DD` in the view's time zone.
    pub day: String,
    pub announcements: Vec<PlannerAnnouncement>,
    pub events: Vec<Event>,
}

impl ViewDay {
    pub fn new(day: String) -> Self {
        Self {
            day,
            announcements: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// A user's calendar over a window of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// Display names of the providers consulted, in call order.
    pub providers: Vec<String>,
    pub days: Vec<ViewDay>,
}

impl View {
    pub fn event_count(&self) -> usize {
        self.days.iter().map(|d| d.events.len()).sum()
    }

    pub fn announcement_count(&self) -> usize {
        self.days.iter().map(|d| d.announcements.len()).sum()
    }
}
