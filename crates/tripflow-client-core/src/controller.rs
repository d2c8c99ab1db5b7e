//! The single owned context behind the page, and the actions that drive it.
//!
//! Each slice of [`ClientState`] has exactly one writer: the view machine owns
//! the view state and current itinerary id, the sidebar manager owns the panel
//! state, the session gate owns the session, and the verification timer owns
//! the send-code trigger. The controller sequences them around remote calls.

use tracing::{debug, info, warn};

use crate::auth::{self, Session, SessionGate};
use crate::error::ControllerError;
use crate::model::{GenerateResponse, ItineraryEntry, ItineraryId};
use crate::render::RenderedItinerary;
use crate::sidebar::{
    OpenOutcome, Panel, PanelContent, PopulateTicket, PopulationOutcome, SidebarManager,
    SidebarState,
};
use crate::timer::{CodeTrigger, TimerConfig, VerificationTimer};
use crate::transport::TripApiTransport;
use crate::view::{GeneratedItinerary, GenerationOutcome, TripForm, ViewMachine, ViewState};

pub const BOOKMARK_SAVED_NOTICE: &str = "Added to your saved itineraries.";
pub const BOOKMARK_FAILED_NOTICE: &str = "Could not save this itinerary. Log in or try again.";
pub const NO_ACTIVE_ITINERARY_NOTICE: &str = "Generate an itinerary first.";
pub const CODE_SENT_NOTICE: &str = "Verification code sent.";
pub const LOGIN_SUCCEEDED_NOTICE: &str = "Logged in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible message, the equivalent of an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ClientState {
    form: TripForm,
    view: ViewMachine,
    sidebar: SidebarManager,
    session: SessionGate,
    code_timer: VerificationTimer,
    notices: Vec<Notice>,
}

impl ClientState {
    #[must_use]
    pub fn with_timer_config(config: TimerConfig) -> Self {
        Self {
            code_timer: VerificationTimer::new(config),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn form(&self) -> &TripForm {
        &self.form
    }

    #[must_use]
    pub fn view_state(&self) -> ViewState {
        self.view.state()
    }

    #[must_use]
    pub fn current_itinerary_id(&self) -> Option<&ItineraryId> {
        self.view.current_itinerary_id()
    }

    #[must_use]
    pub fn rendered(&self) -> Option<&RenderedItinerary> {
        self.view.rendered()
    }

    #[must_use]
    pub fn sidebar_state(&self) -> SidebarState {
        self.sidebar.state()
    }

    #[must_use]
    pub fn overlay_visible(&self) -> bool {
        self.sidebar.overlay_visible()
    }

    #[must_use]
    pub fn panel_content(&self) -> Option<&PanelContent> {
        self.sidebar.content()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.session.session()
    }

    #[must_use]
    pub fn auth_surface(&self) -> auth::AuthSurface {
        self.session.auth_surface()
    }

    #[must_use]
    pub fn code_trigger(&self) -> CodeTrigger {
        self.code_timer.trigger()
    }

    #[must_use]
    pub fn code_timer(&self) -> &VerificationTimer {
        &self.code_timer
    }

    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Back to what a freshly loaded page shows.
    pub fn reset(&mut self) {
        self.form = TripForm::default();
        self.view.reset();
        self.sidebar.close_all();
        self.session.reset();
        self.code_timer.reset();
        self.notices.clear();
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "notice");
        self.notices.push(Notice { level, message });
    }
}

pub struct TripController<T> {
    transport: T,
    state: ClientState,
}

impl<T: TripApiTransport> TripController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_state(transport, ClientState::default())
    }

    pub fn with_state(transport: T, state: ClientState) -> Self {
        Self { transport, state }
    }

    #[must_use]
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.state.notices)
    }

    /// Startup: reflect whatever session the server already holds.
    pub async fn start(&mut self) -> Result<(), ControllerError> {
        self.refresh_session().await
    }

    pub async fn refresh_session(&mut self) -> Result<(), ControllerError> {
        match self.transport.current_user().await {
            Ok(response) => {
                self.state.session.reflect(response);
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "current session query failed");
                let error = ControllerError::remote(error);
                self.state.notify(
                    NoticeLevel::Error,
                    format!("Could not check login status: {error}"),
                );
                Err(error)
            }
        }
    }

    pub fn toggle_tag(&mut self, label: &str) -> bool {
        self.state.form.toggle_tag(label)
    }

    /// Input → Loading → Result on success, back to Input on any failure.
    pub async fn request_generation(
        &mut self,
        form: TripForm,
    ) -> Result<GenerationOutcome, ControllerError> {
        let (ticket, request) = match self.state.view.begin_generation(&form) {
            Ok(begun) => begun,
            Err(error) => return Err(self.generation_failed(error)),
        };
        self.state.form = form;

        let result = match self.transport.generate_itinerary(&request).await {
            Ok(response) => generated_itinerary(response),
            Err(error) => {
                warn!(city = %request.city, error = %error, "itinerary generation call failed");
                Err(ControllerError::remote(error))
            }
        };

        let completed = self.state.view.complete_generation(ticket, result);
        match completed {
            Ok(outcome) => {
                info!(city = %request.city, ?outcome, "itinerary generation finished");
                Ok(outcome)
            }
            Err(error) => Err(self.generation_failed(error)),
        }
    }

    pub fn return_to_input(&mut self) {
        self.state.view.return_to_input();
    }

    pub async fn open_history(&mut self) -> OpenOutcome {
        self.open_panel(Panel::History).await
    }

    pub async fn open_saved(&mut self) -> OpenOutcome {
        self.open_panel(Panel::Saved).await
    }

    /// Toggles `panel` and, when it opened, populates it.
    pub async fn open_panel(&mut self, panel: Panel) -> OpenOutcome {
        let outcome = self.begin_open_panel(panel);
        if let OpenOutcome::Opened(ticket) = outcome {
            let result = self.fetch_panel(panel).await;
            self.apply_panel(ticket, result);
        }
        outcome
    }

    /// First half of [`Self::open_panel`], for drivers that populate concurrently.
    pub fn begin_open_panel(&mut self, panel: Panel) -> OpenOutcome {
        self.state.sidebar.open(panel)
    }

    pub async fn fetch_panel(&self, panel: Panel) -> Result<Vec<ItineraryEntry>, ControllerError> {
        self.transport.list_panel(panel).await.map_err(|error| {
            warn!(%panel, error = %error, "panel population failed");
            ControllerError::remote(error)
        })
    }

    pub fn apply_panel(
        &mut self,
        ticket: PopulateTicket,
        result: Result<Vec<ItineraryEntry>, ControllerError>,
    ) -> PopulationOutcome {
        self.state.sidebar.apply_population(ticket, result)
    }

    pub fn close_sidebars(&mut self) {
        self.state.sidebar.close_all();
    }

    /// Opens an entry of the open panel: panels close first, then the view loads it.
    pub fn select_entry(&mut self, index: usize) -> Result<ItineraryId, ControllerError> {
        let entry = match self.state.sidebar.select(index) {
            Ok(entry) => entry,
            Err(error) => {
                let error = ControllerError::from(error);
                self.state.notify(NoticeLevel::Error, error.to_string());
                return Err(error);
            }
        };
        self.state.view.load_from_entry(&entry);
        Ok(entry.id)
    }

    pub async fn bookmark(&mut self) -> Result<(), ControllerError> {
        let Some(id) = self.state.view.current_itinerary_id().cloned() else {
            self.state
                .notify(NoticeLevel::Error, NO_ACTIVE_ITINERARY_NOTICE);
            return Err(ControllerError::NoActiveItinerary);
        };

        let error = match self.transport.bookmark(&id).await {
            Ok(ack) if ack.success => {
                info!(itinerary_id = %id, "itinerary bookmarked");
                self.state.notify(NoticeLevel::Info, BOOKMARK_SAVED_NOTICE);
                return Ok(());
            }
            Ok(ack) => ControllerError::rejected(ack.message, BOOKMARK_FAILED_NOTICE),
            Err(error) => {
                warn!(itinerary_id = %id, error = %error, "bookmark call failed");
                ControllerError::remote(error)
            }
        };

        let message = match &error {
            ControllerError::BusinessRejection { message } if message != BOOKMARK_FAILED_NOTICE => {
                format!("{BOOKMARK_FAILED_NOTICE} ({message})")
            }
            _ => BOOKMARK_FAILED_NOTICE.to_string(),
        };
        self.state.notify(NoticeLevel::Error, message);
        Err(error)
    }

    pub fn open_auth(&mut self) {
        self.state.session.open_auth();
    }

    pub fn close_auth(&mut self) {
        self.state.session.close_auth();
    }

    /// Starts the optimistic cooldown, then asks the server to send a code.
    pub async fn send_code(&mut self, email: &str) -> Result<(), ControllerError> {
        let request = match auth::send_code_request(email) {
            Ok(request) => request,
            Err(error) => {
                let error = ControllerError::from(error);
                self.state.notify(NoticeLevel::Error, error.to_string());
                return Err(error);
            }
        };
        self.state.session.remember_email(&request.email);
        let epoch = self.state.code_timer.start();

        let error = match self.transport.send_code(&request).await {
            Ok(ack) if ack.success => {
                self.state.notify(NoticeLevel::Info, CODE_SENT_NOTICE);
                return Ok(());
            }
            Ok(ack) => ControllerError::rejected(ack.message, "Could not send verification code."),
            Err(error) => {
                warn!(error = %error, "send code call failed");
                ControllerError::remote(error)
            }
        };

        self.state.code_timer.cancel(epoch);
        self.state.notify(NoticeLevel::Error, error.to_string());
        Err(error)
    }

    pub async fn login(&mut self, email: &str, code: &str) -> Result<(), ControllerError> {
        let request = match auth::login_request(email, code) {
            Ok(request) => request,
            Err(error) => {
                let error = ControllerError::from(error);
                self.state.notify(NoticeLevel::Error, error.to_string());
                return Err(error);
            }
        };
        self.state.session.remember_email(&request.email);

        let error = match self.transport.login(&request).await {
            Ok(ack) if ack.success => {
                info!("login accepted");
                self.state.session.close_auth();
                self.state.notify(NoticeLevel::Info, LOGIN_SUCCEEDED_NOTICE);
                return self.refresh_session().await;
            }
            Ok(ack) => ControllerError::rejected(ack.message, "Invalid or expired verification code."),
            Err(error) => {
                warn!(error = %error, "login call failed");
                ControllerError::remote(error)
            }
        };

        self.state.notify(NoticeLevel::Error, error.to_string());
        Err(error)
    }

    /// Ends the session and resets every slice to its initial value.
    ///
    /// The reset happens even when the logout call fails; the failure is still
    /// reported.
    pub async fn logout(&mut self) -> Result<(), ControllerError> {
        let result = self.transport.logout().await;
        self.state.reset();
        match result {
            Ok(()) => {
                info!("logged out");
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "logout call failed");
                let error = ControllerError::remote(error);
                self.state
                    .notify(NoticeLevel::Error, format!("Logout request failed: {error}"));
                Err(error)
            }
        }
    }

    fn generation_failed(&mut self, error: ControllerError) -> ControllerError {
        self.state
            .notify(NoticeLevel::Error, format!("Generation failed: {error}"));
        error
    }
}

fn generated_itinerary(response: GenerateResponse) -> Result<GeneratedItinerary, ControllerError> {
    if !response.success {
        return Err(ControllerError::rejected(
            response.error,
            "the planner could not build an itinerary",
        ));
    }
    let Some(itinerary) = response.data else {
        return Err(ControllerError::rejected(
            None,
            "the planner returned no itinerary",
        ));
    };
    Ok(GeneratedItinerary {
        id: response.id,
        itinerary,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::{AckResponse, CurrentUserResponse, GenerateResponse};
    use crate::test_support::{Call, Script, ScriptedTransport, day, entry, generated, itinerary};
    use crate::timer::TimerPhase;

    fn controller(script: Script) -> TripController<ScriptedTransport> {
        TripController::new(ScriptedTransport::new(script))
    }

    fn opened(outcome: OpenOutcome) -> PopulateTicket {
        match outcome {
            OpenOutcome::Opened(ticket) => ticket,
            OpenOutcome::Closed => panic!("expected panel to open"),
        }
    }

    fn form(city: &str) -> TripForm {
        TripForm::new(city, 2)
    }

    fn logged_in(name: &str) -> CurrentUserResponse {
        CurrentUserResponse {
            is_logged_in: true,
            username: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn start_reflects_server_session() {
        let mut script = Script::default();
        script.current_user.push_back(Ok(logged_in("mei")));
        let mut controller = controller(script);

        controller.start().await.expect("start");
        assert!(controller.state().session().is_logged_in);
        assert_eq!(controller.state().session().username.as_deref(), Some("mei"));
        assert_eq!(controller.transport().calls(), [Call::CurrentUser]);
    }

    #[tokio::test]
    async fn session_query_failure_is_surfaced() {
        let mut script = Script::default();
        script.current_user.push_back(Err("connection refused".to_string()));
        let mut controller = controller(script);

        let error = controller.start().await.expect_err("failure");
        assert!(matches!(error, ControllerError::RemoteCall { .. }));
        assert_eq!(controller.state().session(), &Session::guest());
        assert_eq!(controller.take_notices()[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn generation_success_renders_result() {
        let mut script = Script::default();
        script.generate.push_back(Ok(generated(
            Some("21"),
            itinerary(
                "Chengdu bites",
                vec![day("D1", &["S1", "S2"]), day("D2", &["S1", "S2"])],
            ),
        )));
        let mut controller = controller(script);

        let mut trip = form("Chengdu");
        trip.toggle_tag("food");
        let outcome = controller
            .request_generation(trip)
            .await
            .expect("generation");

        assert_eq!(outcome, GenerationOutcome::Rendered);
        let state = controller.state();
        assert_eq!(state.view_state(), ViewState::Result);
        assert_eq!(state.current_itinerary_id().map(ItineraryId::as_str), Some("21"));
        let rendered = state.rendered().expect("rendered");
        assert_eq!(rendered.days()[0].title, "D1");
        assert_eq!(rendered.days()[1].spots[1].name, "S2");
        assert_eq!(state.form().preferences, ["food"]);
        assert!(matches!(
            controller.transport().calls().as_slice(),
            [Call::Generate(request)] if request.city == "Chengdu" && request.preferences == ["food"]
        ));
    }

    #[tokio::test]
    async fn generation_failures_return_to_input_never_loading() {
        let mut script = Script::default();
        script.generate.push_back(Ok(GenerateResponse {
            success: false,
            error: Some("model overloaded".to_string()),
            ..GenerateResponse::default()
        }));
        script.generate.push_back(Err("connection reset".to_string()));
        script.generate.push_back(Ok(GenerateResponse {
            success: true,
            ..GenerateResponse::default()
        }));
        let mut controller = controller(script);

        let rejected = controller
            .request_generation(form("Harbin"))
            .await
            .expect_err("rejected");
        assert_eq!(
            rejected,
            ControllerError::BusinessRejection {
                message: "model overloaded".to_string()
            }
        );
        assert_eq!(controller.state().view_state(), ViewState::Input);

        let remote = controller
            .request_generation(form("Harbin"))
            .await
            .expect_err("remote failure");
        assert!(matches!(remote, ControllerError::RemoteCall { .. }));
        assert_eq!(controller.state().view_state(), ViewState::Input);

        let missing = controller
            .request_generation(form("Harbin"))
            .await
            .expect_err("missing data");
        assert!(matches!(missing, ControllerError::BusinessRejection { .. }));
        assert_eq!(controller.state().view_state(), ViewState::Input);

        let notices = controller.take_notices();
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0].message, "Generation failed: model overloaded");
    }

    #[tokio::test]
    async fn generation_failure_keeps_previous_itinerary_id() {
        let mut script = Script::default();
        script.history = Ok(vec![entry("7", "Kunming")]);
        script.generate.push_back(Err("timeout".to_string()));
        let mut controller = controller(script);

        controller.open_history().await;
        controller.select_entry(0).expect("select");
        controller.return_to_input();
        controller
            .request_generation(form("Lijiang"))
            .await
            .expect_err("failure");

        assert_eq!(controller.state().view_state(), ViewState::Input);
        assert_eq!(
            controller.state().current_itinerary_id().map(ItineraryId::as_str),
            Some("7")
        );
    }

    #[tokio::test]
    async fn empty_city_makes_no_call() {
        let mut controller = controller(Script::default());
        controller.toggle_tag("museums");
        let before = controller.state().form().clone();

        let mut rejected = TripForm::new("   ", 5);
        rejected.toggle_tag("nightlife");
        let error = controller
            .request_generation(rejected)
            .await
            .expect_err("validation");
        assert!(error.is_local());
        assert_eq!(controller.state().form(), &before);
        assert_eq!(controller.state().view_state(), ViewState::Input);
        assert!(controller.transport().calls().is_empty());
        assert_eq!(controller.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn bookmark_without_itinerary_fails_fast() {
        let mut controller = controller(Script::default());
        let error = controller.bookmark().await.expect_err("no itinerary");
        assert_eq!(error, ControllerError::NoActiveItinerary);
        assert!(controller.transport().calls().is_empty());
        assert_eq!(
            controller.take_notices()[0].message,
            NO_ACTIVE_ITINERARY_NOTICE
        );
    }

    #[tokio::test]
    async fn bookmark_after_guest_generation_fails_fast() {
        let mut script = Script::default();
        script
            .generate
            .push_back(Ok(generated(None, itinerary("Guest", Vec::new()))));
        let mut controller = controller(script);

        controller
            .request_generation(form("Qingdao"))
            .await
            .expect("generation");
        let error = controller.bookmark().await.expect_err("guest itinerary");
        assert_eq!(error, ControllerError::NoActiveItinerary);
        assert_eq!(controller.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn bookmark_success_and_failure_are_both_visible() {
        let mut script = Script::default();
        script.generate.push_back(Ok(generated(
            Some("12"),
            itinerary("Saved", Vec::new()),
        )));
        let mut controller = controller(script);
        controller
            .request_generation(form("Xiamen"))
            .await
            .expect("generation");

        controller.bookmark().await.expect("bookmark");
        assert_eq!(
            controller.take_notices(),
            [Notice {
                level: NoticeLevel::Info,
                message: BOOKMARK_SAVED_NOTICE.to_string()
            }]
        );

        controller.transport().script().bookmark =
            Ok(AckResponse::rejected("itinerary not found"));
        let error = controller.bookmark().await.expect_err("rejected");
        assert!(matches!(error, ControllerError::BusinessRejection { .. }));
        let notices = controller.take_notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.starts_with(BOOKMARK_FAILED_NOTICE));
        assert!(notices[0].message.contains("itinerary not found"));

        controller.transport().script().bookmark = Err("tripflow_http_401:<empty>".to_string());
        let error = controller.bookmark().await.expect_err("unauthenticated");
        assert!(matches!(error, ControllerError::RemoteCall { .. }));
        assert_eq!(controller.take_notices()[0].message, BOOKMARK_FAILED_NOTICE);

        assert_eq!(
            controller
                .transport()
                .calls()
                .iter()
                .filter(|call| **call == Call::Bookmark("12".to_string()))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn panels_are_mutually_exclusive_and_toggle() {
        let mut script = Script::default();
        script.history = Ok(vec![entry("3", "Nanjing")]);
        let mut controller = controller(script);

        assert!(matches!(
            controller.open_history().await,
            OpenOutcome::Opened(_)
        ));
        assert_eq!(controller.state().sidebar_state(), SidebarState::History);
        assert!(matches!(
            controller.state().panel_content(),
            Some(PanelContent::Entries(entries)) if entries.len() == 1
        ));

        controller.open_saved().await;
        assert_eq!(controller.state().sidebar_state(), SidebarState::Saved);
        assert_eq!(
            controller.state().panel_content(),
            Some(&PanelContent::Empty {
                message: Panel::Saved.empty_message().to_string()
            })
        );

        assert_eq!(controller.open_saved().await, OpenOutcome::Closed);
        assert_eq!(controller.state().sidebar_state(), SidebarState::Closed);
        assert!(!controller.state().overlay_visible());
        assert_eq!(
            controller.transport().calls(),
            [Call::History, Call::Saved]
        );
    }

    #[tokio::test]
    async fn panel_failure_leaves_panel_open_with_message() {
        let mut script = Script::default();
        script.saved = Err("tripflow_http_401:<empty>".to_string());
        let mut controller = controller(script);

        controller.open_saved().await;
        assert_eq!(controller.state().sidebar_state(), SidebarState::Saved);
        assert!(matches!(
            controller.state().panel_content(),
            Some(PanelContent::Failed { message }) if message.contains("401")
        ));
    }

    #[tokio::test]
    async fn stale_population_after_switching_panels_is_discarded() {
        let mut script = Script::default();
        script.history = Ok(vec![entry("1", "Stale")]);
        script.saved = Ok(vec![entry("2", "Fresh")]);
        let mut controller = controller(script);

        let history_ticket = opened(controller.begin_open_panel(Panel::History));
        let history = controller.fetch_panel(Panel::History).await;

        let saved_ticket = opened(controller.begin_open_panel(Panel::Saved));
        assert_eq!(
            controller.apply_panel(history_ticket, history),
            PopulationOutcome::Stale
        );
        assert_eq!(
            controller.state().panel_content(),
            Some(&PanelContent::Loading)
        );

        let saved = controller.fetch_panel(Panel::Saved).await;
        assert_eq!(
            controller.apply_panel(saved_ticket, saved),
            PopulationOutcome::Applied
        );
        assert!(matches!(
            controller.state().panel_content(),
            Some(PanelContent::Entries(entries)) if entries[0].city == "Fresh"
        ));
    }

    #[tokio::test]
    async fn selecting_entry_closes_panels_then_shows_result() {
        let mut script = Script::default();
        script.saved = Ok(vec![entry("5", "Hangzhou"), entry("6", "Suzhou")]);
        let mut controller = controller(script);

        controller.open_saved().await;
        let id = controller.select_entry(1).expect("select");

        assert_eq!(id.as_str(), "6");
        let state = controller.state();
        assert_eq!(state.sidebar_state(), SidebarState::Closed);
        assert!(!state.overlay_visible());
        assert_eq!(state.view_state(), ViewState::Result);
        assert_eq!(state.current_itinerary_id().map(ItineraryId::as_str), Some("6"));
        assert_eq!(state.rendered().map(|r| r.title.as_str()), Some("Suzhou"));
        assert_eq!(controller.transport().calls(), [Call::Saved]);
    }

    #[tokio::test]
    async fn selecting_missing_entry_is_a_validation_error() {
        let mut controller = controller(Script::default());
        controller.open_history().await;
        let error = controller.select_entry(0).expect_err("nothing to select");
        assert!(error.is_local());
        assert_eq!(controller.state().sidebar_state(), SidebarState::History);
        assert_eq!(controller.state().view_state(), ViewState::Input);
    }

    #[tokio::test(start_paused = true)]
    async fn send_code_rejects_invalid_email_without_call_or_cooldown() {
        let mut controller = controller(Script::default());
        let error = controller
            .send_code("user.test.com")
            .await
            .expect_err("invalid email");
        assert!(error.is_local());
        assert_eq!(controller.state().code_trigger(), CodeTrigger::idle());
        assert!(controller.transport().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn send_code_success_keeps_cooldown_until_zero() {
        let mut controller = controller(Script::default());
        controller.send_code("user@test.com").await.expect("sent");

        assert_eq!(controller.state().code_trigger(), CodeTrigger::cooling(60));
        assert_eq!(
            controller.take_notices()[0].message,
            CODE_SENT_NOTICE
        );

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(controller.state().code_trigger(), CodeTrigger::cooling(30));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let trigger = controller.state().code_trigger();
        assert!(trigger.enabled);
        assert_eq!(trigger.phase, TimerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_at_second_ten_cancels_countdown() {
        let mut script = Script::default();
        script.send_code = Ok(AckResponse::rejected("too many requests"));
        script.send_code_delay = Duration::from_millis(10_500);
        let mut controller = controller(script);

        let error = controller
            .send_code("user@test.com")
            .await
            .expect_err("rejected");

        assert_eq!(
            error,
            ControllerError::BusinessRejection {
                message: "too many requests".to_string()
            }
        );
        assert_eq!(controller.state().code_trigger(), CodeTrigger::idle());
        assert_eq!(
            controller.take_notices()[0].message,
            "too many requests"
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.state().code_trigger(), CodeTrigger::idle());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_also_cancels_countdown() {
        let mut script = Script::default();
        script.send_code = Err("dns failure".to_string());
        let mut controller = controller(script);

        let error = controller
            .send_code("user@test.com")
            .await
            .expect_err("transport failure");
        assert!(matches!(error, ControllerError::RemoteCall { .. }));
        assert_eq!(controller.state().code_trigger(), CodeTrigger::idle());
    }

    #[tokio::test]
    async fn login_success_closes_auth_and_refreshes_session() {
        let mut script = Script::default();
        script.current_user.push_back(Ok(logged_in("lin")));
        let mut controller = controller(script);
        controller.open_auth();

        controller
            .login(" Lin@Example.com ", "12 34 56")
            .await
            .expect("login");

        assert_eq!(controller.state().auth_surface(), auth::AuthSurface::Closed);
        assert_eq!(controller.state().session().username.as_deref(), Some("lin"));
        assert_eq!(
            controller.transport().calls(),
            [
                Call::Login {
                    email: "lin@example.com".to_string(),
                    code: "123456".to_string()
                },
                Call::CurrentUser
            ]
        );
    }

    #[tokio::test]
    async fn login_rejection_surfaces_message_and_changes_nothing() {
        let mut script = Script::default();
        script.login = Ok(AckResponse::rejected("code expired"));
        let mut controller = controller(script);
        controller.open_auth();

        let error = controller
            .login("lin@example.com", "000000")
            .await
            .expect_err("rejected");

        assert_eq!(error.to_string(), "code expired");
        assert_eq!(controller.state().auth_surface(), auth::AuthSurface::Open);
        assert_eq!(controller.state().session(), &Session::guest());
        assert_eq!(controller.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn login_requires_email_and_code() {
        let mut controller = controller(Script::default());
        assert!(controller.login("", "1").await.expect_err("email").is_local());
        assert!(controller.login("a@b.c", " ").await.expect_err("code").is_local());
        assert!(controller.transport().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_resets_every_slice() {
        let mut script = Script::default();
        script.current_user.push_back(Ok(logged_in("mei")));
        script.saved = Ok(vec![entry("9", "Lhasa")]);
        let mut controller = controller(script);

        controller.start().await.expect("start");
        controller.open_saved().await;
        controller.select_entry(0).expect("select");
        controller.open_history().await;
        controller.open_auth();
        controller.send_code("mei@example.com").await.expect("code");

        controller.logout().await.expect("logout");

        let state = controller.state();
        assert_eq!(state.session(), &Session::guest());
        assert_eq!(state.view_state(), ViewState::Input);
        assert_eq!(state.sidebar_state(), SidebarState::Closed);
        assert_eq!(state.current_itinerary_id(), None);
        assert!(state.rendered().is_none());
        assert_eq!(state.auth_surface(), auth::AuthSurface::Closed);
        assert_eq!(state.code_trigger(), CodeTrigger::idle());
        assert!(state.notices().is_empty());
    }

    #[tokio::test]
    async fn logout_failure_still_resets_and_reports() {
        let mut script = Script::default();
        script.logout = Err("tripflow_http_401:<empty>".to_string());
        script.history = Ok(vec![entry("2", "Dunhuang")]);
        let mut controller = controller(script);

        controller.open_history().await;
        controller.select_entry(0).expect("select");
        let error = controller.logout().await.expect_err("logout failure");

        assert!(matches!(error, ControllerError::RemoteCall { .. }));
        assert_eq!(controller.state().view_state(), ViewState::Input);
        assert_eq!(controller.state().current_itinerary_id(), None);
        assert_eq!(controller.take_notices().len(), 1);
    }
}
