//! Client-side interaction core of the TripFlow itinerary planner.
//!
//! Everything here is transport-agnostic: remote calls go through
//! [`TripApiTransport`], and the HTTP implementation lives in
//! `tripflow-api-client`.

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod render;
pub mod sidebar;
pub mod timer;
pub mod transport;
pub mod view;

#[cfg(test)]
mod test_support;

pub use auth::{AuthSurface, Session, SessionGate};
pub use config::ApiSettings;
pub use controller::{ClientState, Notice, NoticeLevel, TripController};
pub use error::{ControllerError, ValidationError};
pub use model::{
    AckResponse, CurrentUserResponse, DayPlan, GenerateRequest, GenerateResponse, Itinerary,
    ItineraryEntry, ItineraryId, LoginRequest, SendCodeRequest, Spot,
};
pub use render::{RenderBody, RenderedDay, RenderedItinerary, RenderedSpot};
pub use sidebar::{OpenOutcome, Panel, PanelContent, PopulationOutcome, SidebarState};
pub use timer::{CodeTrigger, TimerConfig, TimerPhase, VerificationTimer};
pub use transport::TripApiTransport;
pub use view::{GenerationOutcome, TripForm, ViewEvent, ViewState};
