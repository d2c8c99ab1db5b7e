//! Input / Loading / Result view machine and the current itinerary id.

use std::fmt;

use tracing::debug;

use crate::error::{ControllerError, ValidationError};
use crate::model::{GenerateRequest, Itinerary, ItineraryEntry, ItineraryId};
use crate::render::{self, RenderedItinerary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    Input,
    Loading,
    Result,
}

impl ViewState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Loading => "loading",
            Self::Result => "result",
        }
    }

    /// Transition table. `None` marks an illegal event for the current state.
    #[must_use]
    pub fn next(self, event: ViewEvent) -> Option<Self> {
        match (self, event) {
            (Self::Input, ViewEvent::SubmitGeneration) => Some(Self::Loading),
            (Self::Loading, ViewEvent::GenerationSucceeded) => Some(Self::Result),
            (Self::Loading, ViewEvent::GenerationFailed) => Some(Self::Input),
            (_, ViewEvent::ReturnToInput) => Some(Self::Input),
            (_, ViewEvent::LoadEntry) => Some(Self::Result),
            _ => None,
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    SubmitGeneration,
    GenerationSucceeded,
    GenerationFailed,
    ReturnToInput,
    LoadEntry,
}

impl ViewEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubmitGeneration => "submit_generation",
            Self::GenerationSucceeded => "generation_succeeded",
            Self::GenerationFailed => "generation_failed",
            Self::ReturnToInput => "return_to_input",
            Self::LoadEntry => "load_entry",
        }
    }
}

impl fmt::Display for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of the input view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripForm {
    pub city: String,
    pub days: u32,
    /// Active preference tags in activation order.
    pub preferences: Vec<String>,
}

impl Default for TripForm {
    fn default() -> Self {
        Self {
            city: String::new(),
            days: 3,
            preferences: Vec::new(),
        }
    }
}

impl TripForm {
    pub fn new(city: impl Into<String>, days: u32) -> Self {
        Self {
            city: city.into(),
            days,
            preferences: Vec::new(),
        }
    }

    /// Flips a preference tag; returns whether it is now active.
    pub fn toggle_tag(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        if let Some(position) = self.preferences.iter().position(|tag| tag == label) {
            self.preferences.remove(position);
            false
        } else {
            self.preferences.push(label.to_string());
            true
        }
    }

    pub fn to_request(&self) -> Result<GenerateRequest, ValidationError> {
        let city = self.city.trim();
        if city.is_empty() {
            return Err(ValidationError::EmptyCity);
        }
        if self.days == 0 {
            return Err(ValidationError::ZeroDays);
        }
        Ok(GenerateRequest {
            city: city.to_string(),
            days: self.days,
            preferences: self.preferences.clone(),
        })
    }
}

/// Identifies one in-flight generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Rendered,
    /// The view moved on before the response arrived.
    Discarded,
}

/// A successful generation: the server-assigned id (absent for guests) and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedItinerary {
    pub id: Option<ItineraryId>,
    pub itinerary: Itinerary,
}

#[derive(Debug, Default)]
pub struct ViewMachine {
    state: ViewState,
    current_itinerary_id: Option<ItineraryId>,
    rendered: Option<RenderedItinerary>,
    pending: Option<GenerationTicket>,
    next_ticket: u64,
}

impl ViewMachine {
    #[must_use]
    pub fn state(&self) -> ViewState {
        self.state
    }

    #[must_use]
    pub fn current_itinerary_id(&self) -> Option<&ItineraryId> {
        self.current_itinerary_id.as_ref()
    }

    /// Display model of the result view, kept across back-to-edit.
    #[must_use]
    pub fn rendered(&self) -> Option<&RenderedItinerary> {
        self.rendered.as_ref()
    }

    #[must_use]
    pub fn pending_generation(&self) -> Option<GenerationTicket> {
        self.pending
    }

    /// Validates the form and moves Input → Loading.
    pub fn begin_generation(
        &mut self,
        form: &TripForm,
    ) -> Result<(GenerationTicket, GenerateRequest), ControllerError> {
        let request = form.to_request()?;
        self.transition(ViewEvent::SubmitGeneration)?;
        self.next_ticket += 1;
        let ticket = GenerationTicket(self.next_ticket);
        self.pending = Some(ticket);
        Ok((ticket, request))
    }

    /// Applies a generation result if `ticket` is still the one the view waits on.
    ///
    /// Failures are returned even when stale so the caller can surface them.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GeneratedItinerary, ControllerError>,
    ) -> Result<GenerationOutcome, ControllerError> {
        if self.pending != Some(ticket) || self.state != ViewState::Loading {
            debug!(
                ticket = ticket.0,
                state = %self.state,
                "discarding generation result for a view that moved on"
            );
            return result.map(|_| GenerationOutcome::Discarded);
        }
        self.pending = None;

        match result {
            Ok(generated) => {
                self.transition(ViewEvent::GenerationSucceeded)?;
                let mut itinerary = generated.itinerary;
                itinerary.id.clone_from(&generated.id);
                self.current_itinerary_id = generated.id;
                self.rendered = Some(render::build(&itinerary));
                Ok(GenerationOutcome::Rendered)
            }
            Err(error) => {
                self.transition(ViewEvent::GenerationFailed)?;
                Err(error)
            }
        }
    }

    pub fn return_to_input(&mut self) {
        self.state = ViewState::Input;
        debug!(state = %self.state, "view returned to input");
    }

    /// Rehydrates the result view from a stored entry without a network call.
    pub fn load_from_entry(&mut self, entry: &ItineraryEntry) {
        self.pending = None;
        self.current_itinerary_id = Some(entry.id.clone());
        self.rendered = Some(render::build(&entry.content));
        self.state = ViewState::Result;
        debug!(itinerary_id = %entry.id, "view loaded stored itinerary");
    }

    pub fn reset(&mut self) {
        *self = Self {
            next_ticket: self.next_ticket,
            ..Self::default()
        };
    }

    fn transition(&mut self, event: ViewEvent) -> Result<(), ControllerError> {
        let Some(next) = self.state.next(event) else {
            return Err(ControllerError::InvalidTransition {
                from: self.state,
                event,
            });
        };
        debug!(from = %self.state, to = %next, %event, "view transition");
        self.state = next;
        Ok(())
    }
}
