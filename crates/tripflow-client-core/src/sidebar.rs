//! History / Saved side panels.
//!
//! At most one panel is open. Population responses carry a ticket and are only
//! applied while the panel they were requested for is still the open one and no
//! newer population has started.

use std::fmt;

use tracing::debug;

use crate::error::{ControllerError, ValidationError};
use crate::model::ItineraryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    History,
    Saved,
}

impl Panel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Saved => "saved",
        }
    }

    #[must_use]
    pub fn empty_message(self) -> &'static str {
        match self {
            Self::History => "No history yet",
            Self::Saved => "No saved itineraries yet",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidebarState {
    #[default]
    Closed,
    History,
    Saved,
}

impl SidebarState {
    #[must_use]
    pub fn open_panel(self) -> Option<Panel> {
        match self {
            Self::Closed => None,
            Self::History => Some(Panel::History),
            Self::Saved => Some(Panel::Saved),
        }
    }

    /// Toggle table: opening the open panel closes everything.
    #[must_use]
    pub fn toggle(self, panel: Panel) -> Self {
        if self.open_panel() == Some(panel) {
            Self::Closed
        } else {
            Self::from(panel)
        }
    }
}

impl From<Panel> for SidebarState {
    fn from(panel: Panel) -> Self {
        match panel {
            Panel::History => Self::History,
            Panel::Saved => Self::Saved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelContent {
    Loading,
    Empty { message: String },
    Entries(Vec<ItineraryEntry>),
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateTicket {
    panel: Panel,
    seq: u64,
}

impl PopulateTicket {
    #[must_use]
    pub fn panel(self) -> Panel {
        self.panel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The panel opened and is waiting on this population.
    Opened(PopulateTicket),
    /// The panel was already open, so everything closed.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationOutcome {
    Applied,
    Stale,
}

#[derive(Debug, Default)]
pub struct SidebarManager {
    state: SidebarState,
    content: Option<PanelContent>,
    pending: Option<PopulateTicket>,
    next_seq: u64,
}

impl SidebarManager {
    #[must_use]
    pub fn state(&self) -> SidebarState {
        self.state
    }

    #[must_use]
    pub fn overlay_visible(&self) -> bool {
        self.state != SidebarState::Closed
    }

    /// Content of the open panel; `None` while closed.
    #[must_use]
    pub fn content(&self) -> Option<&PanelContent> {
        self.content.as_ref()
    }

    pub fn open(&mut self, panel: Panel) -> OpenOutcome {
        let next = self.state.toggle(panel);
        if next == SidebarState::Closed {
            self.close_all();
            return OpenOutcome::Closed;
        }

        // Replacing the state closes whichever panel was open before.
        self.state = next;
        self.content = Some(PanelContent::Loading);
        self.next_seq += 1;
        let ticket = PopulateTicket {
            panel,
            seq: self.next_seq,
        };
        self.pending = Some(ticket);
        debug!(%panel, seq = ticket.seq, "sidebar panel opened");
        OpenOutcome::Opened(ticket)
    }

    pub fn close_all(&mut self) {
        if self.state != SidebarState::Closed {
            debug!(state = ?self.state, "sidebar panels closed");
        }
        self.state = SidebarState::Closed;
        self.content = None;
        self.pending = None;
    }

    pub fn apply_population(
        &mut self,
        ticket: PopulateTicket,
        result: Result<Vec<ItineraryEntry>, ControllerError>,
    ) -> PopulationOutcome {
        if self.pending != Some(ticket) || self.state.open_panel() != Some(ticket.panel) {
            debug!(panel = %ticket.panel, seq = ticket.seq, "discarding stale panel population");
            return PopulationOutcome::Stale;
        }
        self.pending = None;
        self.content = Some(match result {
            Ok(entries) if entries.is_empty() => PanelContent::Empty {
                message: ticket.panel.empty_message().to_string(),
            },
            Ok(entries) => PanelContent::Entries(entries),
            Err(error) => PanelContent::Failed {
                message: error.to_string(),
            },
        });
        PopulationOutcome::Applied
    }

    /// Takes the entry at `index` and closes the panels, in that order.
    pub fn select(&mut self, index: usize) -> Result<ItineraryEntry, ValidationError> {
        let entry = match &self.content {
            Some(PanelContent::Entries(entries)) => entries.get(index).cloned(),
            _ => None,
        }
        .ok_or(ValidationError::NoSuchEntry { index })?;
        self.close_all();
        Ok(entry)
    }
}
